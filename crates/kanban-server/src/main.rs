use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use kanban_core::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "kanban-server")]
#[command(about = "Collaborative kanban board server", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file; the platform config directory is used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "KANBAN_BIND")]
    bind: Option<String>,

    /// JSON file holding all board data
    #[arg(long, env = "KANBAN_DATA_FILE")]
    data_file: Option<PathBuf>,

    /// Directory for attachment contents
    #[arg(long, env = "KANBAN_ATTACHMENTS_DIR")]
    attachments_dir: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from(path)?,
            None => AppConfig::load(),
        };
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(data_file) = self.data_file {
            config.storage.data_file = data_file;
        }
        if let Some(attachments_dir) = self.attachments_dir {
            config.storage.attachments_dir = attachments_dir;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Cli::parse().into_config()?;
    tracing::info!(
        data_file = %config.storage.data_file.display(),
        attachments_dir = %config.storage.attachments_dir.display(),
        "starting kanban server"
    );

    let state = kanban_server::build_state(config).await?;
    kanban_server::serve(state).await
}
