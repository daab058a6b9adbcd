//! meshnode - find-or-create / delete step for mesh virtual nodes

use anyhow::Result;
use clap::Parser;

use meshnode::cli::Cli;
use meshnode::config::Config;
use meshnode::{error, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error::print_error(&e);
            std::process::exit(1);
        }
    };
    logging::init(&config);

    if let Err(e) = cli.run(config).await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
