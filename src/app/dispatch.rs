use crate::cli::commands::{Cli, Commands};
use anyhow::Result;
use tracing::info;
use yildiz_gate::Config;

pub async fn dispatch(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }
            info!(
                host = %config.gateway.host,
                port = config.gateway.port,
                database = %config.database.url,
                ttl_job = config.janitor.active,
                "starting yildiz gateway"
            );
            yildiz_gate::gateway::run_gateway(config).await
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
