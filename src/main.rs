use std::process::ExitCode;
use std::time::Duration;

use tracing::error;

use mcprobe::fingerprint::Fingerprinter;
use mcprobe::{Client, DEFAULT_TIMEOUT};

struct Args {
    addr: String,
    timeout: Duration,
    protocol: Option<i32>,
    srv: bool,
    fingerprint: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut addr = None;
    let mut timeout = DEFAULT_TIMEOUT;
    let mut protocol = None;
    let mut srv = true;
    let mut fingerprint = true;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--timeout" => {
                let value = args.next().ok_or("--timeout requires a value")?;
                let secs = value
                    .parse::<u64>()
                    .map_err(|_| format!("invalid timeout: {value}"))?;
                timeout = Duration::from_secs(secs);
            }
            "--protocol" => {
                let value = args.next().ok_or("--protocol requires a value")?;
                protocol = Some(
                    value
                        .parse::<i32>()
                        .map_err(|_| format!("invalid protocol version: {value}"))?,
                );
            }
            "--no-srv" => srv = false,
            "--no-fingerprint" => fingerprint = false,
            "--help" | "-h" => {
                return Err(format!(
                    "usage: mcprobe [--timeout <secs>] [--protocol <n>] \
                     [--no-srv] [--no-fingerprint] <host[:port]>"
                ));
            }
            other if addr.is_none() && !other.starts_with('-') => {
                addr = Some(other.to_string());
            }
            other => return Err(format!("unexpected argument: {other}")),
        }
    }

    Ok(Args {
        addr: addr.ok_or("missing server address")?,
        timeout,
        protocol,
        srv,
        fingerprint,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(&args).await {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = Client::new(&args.addr)?.with_timeout(args.timeout);
    if let Some(protocol) = args.protocol {
        client = client.with_protocol_version(protocol);
    }
    if !args.srv {
        client = client.without_srv();
    }

    let status = client.status_ping().await?;

    println!("version: {}", status.version.name);
    println!("protocol: {}", status.version.protocol);
    println!("motd: {}", status.motd());
    println!("players: {}/{}", status.players.online, status.players.max);
    for player in &status.players.sample {
        println!("  {} ({})", player.name, player.id);
    }
    if let Some(latency) = status.latency {
        println!("latency: {latency}ms");
    }

    if args.fingerprint {
        let mut prober = Fingerprinter::new().with_timeout(args.timeout);
        if !args.srv {
            prober = prober.without_srv();
        }
        match prober
            .fingerprint_with_protocol(&args.addr, status.version.protocol)
            .await
        {
            Ok(software) => println!("software: {software}"),
            Err(e) => println!("software: unknown ({e})"),
        }
    }

    Ok(())
}
