#[macro_use]
extern crate log;

use clap::Parser;
use dotenv::dotenv;
use eloverblik::Client;

use crate::cli::Cli;
use crate::settings::config_model::SettingsConfig;

mod app;
mod cli;
mod logging;
mod settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    logging::init_logging();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => settings::config::load_settings(path)?,
        None => SettingsConfig::default(),
    };

    let config = app::build_config(&cli, cli.api.kind(), &settings)?;

    info!(
        "Using the {} API at {} with time zone {}",
        config.kind,
        config.base_url(),
        config.timezone.name()
    );

    let client = Client::new(config, cli.token)?;

    app::run(&client, &settings, cli.api.into_command()).await
}
