//! Pressroom CLI - render versioned content and publish it on schedule.

use clap::Parser;
use pressroom_cli::commands;
use pressroom_cli::{logging, Cli, Command, Config, Formatter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> pressroom_cli::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    logging::init(&config.log_level);

    let formatter = Formatter::new(cli.format);
    match cli.command {
        Command::Run => commands::execute_run(&config).await?,
        Command::Externalize(args) => commands::execute_externalize(args, &config, &formatter).await?,
        Command::Schedule => commands::execute_schedule(&config, &formatter)?,
        Command::Publish(args) => commands::execute_publish(args, &config, &formatter).await?,
    }

    Ok(())
}
