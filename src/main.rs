use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod client;
mod config;
mod error;
mod export;
mod observation;
mod server;
mod table;
mod upstream;

use config::{Cli, Command};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wu_history=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Message of an error followed by its causes, e.g. `Request to .. failed: connection refused`.
fn report(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }
    message
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine, the environment may already be set.
    dotenv::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let result: Result<(), Box<dyn Error>> = match cli.command {
        Command::Serve(config) => server::run(config).await.map_err(Into::into),
        Command::Fetch(args) => client::run(args).await.map_err(Into::into),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", report(err.as_ref()));
            ExitCode::FAILURE
        }
    }
}
