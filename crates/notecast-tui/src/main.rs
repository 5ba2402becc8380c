mod action;
mod api;
mod app;
mod app_state;
mod component;
mod components;
mod focus;
mod media;
mod mpv;
mod poll;
mod session;
mod theme;
mod transport;
mod view;
mod widgets;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use notecast_proto::config::Config;
use notecast_proto::ApiClient;

/// Terminal client for the notes-to-podcast service.
#[derive(Parser, Debug)]
#[command(name = "notecast")]
#[command(version)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding `[api] base_url`
    #[arg(long, env = "NOTECAST_API_BASE")]
    api_base: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let mut config = match Config::load_from(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("notecast: ignoring config {}: {:#}", config_path.display(), e);
            Config::default()
        }
    };
    if let Some(base) = cli.api_base {
        config.api.base_url = base;
    }

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let data_dir = notecast_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("notecast.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("notecast log: {}", log_path.display());
    tracing::info!(
        "notecast starting… config={} api={}",
        config_path.display(),
        config.api.base_url
    );

    let api = ApiClient::new(&config.api)
        .with_context(|| format!("invalid api base url {:?}", config.api.base_url))?;

    let app = app::App::new(&config, api, log_path);
    app.run().await?;

    Ok(())
}
