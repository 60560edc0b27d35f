use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use mcprobe::Mirror;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let listen_addr = std::env::var("ADDR").unwrap_or_else(|_| "0.0.0.0:25565".to_string());
    let motd = std::env::var("MOTD").unwrap_or_else(|_| "mcprobe mirror".to_string());

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    let mirror = Arc::new(Mirror::new().with_motd(motd));
    mirror.run(listener).await?;
    Ok(())
}
