use anyhow::{Context, Result};
use clap::Args;
use gatekeep::logs;
use gatekeep::server::factory::ServerFactory;
use log::error;

use super::ConfigArgs;

/// Start the access-control server. Every request is screened, authorized and
/// written to the audit trail.
#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Override the configured log level (error, warn, info, debug).
    #[arg(short, long)]
    pub level: Option<String>,
}

impl ServeArgs {
    pub async fn run(self) -> Result<()> {
        let cfg = self.config.load_server()?;
        let level = self.level.as_deref().unwrap_or(&cfg.log_level);
        logs::init(level)?;

        let factory = ServerFactory::new(cfg)?;
        let (srv, worker) = factory.build_server()?;

        let writer = worker.start();
        srv.run().await.context("run restful server")?;

        // Every logger handle went away with the server, let the writer drain
        if let Err(e) = writer.await {
            error!("Audit writer ended abnormally: {e}");
        }
        Ok(())
    }
}
