use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `yildiz-gate` - multi-tenant graph storage gateway.
#[derive(Parser, Debug)]
#[command(name = "yildiz-gate")]
#[command(version)]
#[command(about = "Tenant-prefixed graph storage gateway with per-tenant row expiration.", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.yildiz/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_host_and_port() {
        let cli = Cli::parse_from(["yildiz-gate", "serve", "--host", "0.0.0.0", "-p", "4000"]);
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, Some(4000));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
            }
            Commands::Config => panic!("expected serve"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["yildiz-gate", "config", "--config", "/tmp/y.toml"]);
        assert!(matches!(cli.command, Commands::Config));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/y.toml")));
    }
}
