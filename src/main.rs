mod cli;
mod commands;
mod config;
mod context;

use clap::Parser;

use cli::{Cli, Command};
use context::AppContext;

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Attr { action } => {
            let ctx = AppContext::build(config).await?;
            commands::attr::run(&ctx, action).await
        }
        Command::File { action } => {
            let ctx = AppContext::build(config).await?;
            commands::file::run(&ctx, action).await
        }
        Command::PreprocessorFolder { path } => {
            let ctx = AppContext::build(config).await?;
            commands::sync::preprocessor_folder(&ctx, &path).await
        }
        Command::Sync { path } => {
            let ctx = AppContext::build(config).await?;
            commands::sync::sync(&ctx, &path).await
        }
        Command::Webhook => {
            let ctx = AppContext::build(config).await?;
            commands::webhook::run(&ctx).await
        }
        Command::Genkey { cid, attr } => {
            let ctx = AppContext::build(config).await?;
            commands::genkey::run(&ctx, &cid, &attr)
        }
    }
}
