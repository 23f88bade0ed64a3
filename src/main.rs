mod cli;

use autobill::{api, config::Config, observability};
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    observability::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let mut config =
                Config::load().map_err(|e| format!("Failed to load config: {}", e))?;
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            api::serve(config).await?
        }
    }

    Ok(())
}
