use clap::Parser;
use log::LevelFilter;
use tinycoin::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("tinycoin", LevelFilter::Info)
        .format_timestamp_millis()
        .parse_default_env()
        .init();

    cli::run(Cli::parse()).await
}
