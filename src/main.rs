//! TCP Room Relay - Entry Point
//!
//! Loads the configuration, starts the ChatServer actor and accepts connections.

use std::env;
use std::path::PathBuf;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use room_relay::{ChatServer, ServerCommand, ServerConfig, Session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=room_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("room_relay=info")),
        )
        .init();

    // Optional JSON config file as the first argument
    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref())?;

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        "Room relay listening on {} (max clients {}, command prefix {:?})",
        addr, config.max_clients, config.command_prefix
    );

    let (server, cmd_tx) = ChatServer::new(config);
    tokio::spawn(server.run());

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("New connection from {}", peer);

                if cmd_tx
                    .send(ServerCommand::Admit(Session::new(stream)))
                    .await
                    .is_err()
                {
                    error!("ChatServer stopped, no longer accepting connections");
                    return Ok(());
                }
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
