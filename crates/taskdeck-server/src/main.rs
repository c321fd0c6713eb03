use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Local backend speaking the auth and row APIs the taskdeck client uses.
/// Everything lives in memory and is lost on exit.
#[derive(Parser, Debug)]
#[command(name = "taskdeck-server")]
struct Cli {
    /// Address to bind
    #[arg(long, env = "TASKDECK_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, env = "TASKDECK_PORT", default_value_t = 54321)]
    port: u16,

    /// Require this public API key in the `apikey` header
    #[arg(long, env = "TASKDECK_ANON_KEY")]
    anon_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taskdeck_server=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let addr = SocketAddr::new(cli.bind.parse()?, cli.port);

    if cli.anon_key.is_some() {
        tracing::info!("anon key required");
    } else {
        tracing::info!("anon key not configured, accepting all clients");
    }

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("taskdeck-server listening on http://{addr}");

    taskdeck_server::serve(listener, cli.anon_key).await?;
    Ok(())
}
