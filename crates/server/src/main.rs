// crates/server/src/main.rs
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use clawdeck_server::{create_app, Config};

#[derive(Parser, Debug)]
#[command(name = "clawdeck", version, about = "Monitoring dashboard backend for the agent runtime")]
struct Args {
    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Agent installation root (default: ~/.openclaw)
    #[arg(long)]
    agent_root: Option<PathBuf>,

    /// Session transcript directory (default: <root>/agents/main/sessions)
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Runtime log directory (default: $TMPDIR/openclaw)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Command whose output lists sessions; empty string disables it
    #[arg(long)]
    sessions_command: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("clawdeck=info,tower_http=warn")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.agent_root {
        Some(root) => Config::for_root(root),
        None => Config::from_home(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(session_dir) = args.session_dir {
        config.registry_file = session_dir.join("sessions.json");
        config.session_dir = session_dir;
    }
    if let Some(log_dir) = args.log_dir {
        config.log_dir = log_dir;
    }
    if let Some(command) = args.sessions_command {
        config.sessions_command = if command.is_empty() {
            None
        } else {
            Some(command)
        };
    }

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        %addr,
        session_dir = %config.session_dir.display(),
        log_dir = %config.log_dir.display(),
        "starting clawdeck"
    );

    let app = create_app(config);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
