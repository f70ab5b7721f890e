use anyhow::Result;
use clap::Parser;
use rest_ingester::cli::{run, Cli};
use rest_ingester::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may come from a .env file.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _logging = init_logging(cli.command.log_path())?;
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
