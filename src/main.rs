use anyhow::{Context, Result};
use clap::Parser;
use reese_stylist::app::App;
use reese_stylist::models::Config;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "reese-stylist")]
#[command(about = "Serve outfit captions and occasion-based fashion advice")]
struct CliArgs {
    /// Address to bind (overrides HOST).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT).
    #[arg(long, short)]
    port: Option<u16>,

    /// JSON advice rule table (overrides ADVICE_RULES_PATH).
    #[arg(long, value_name = "FILE")]
    rules: Option<PathBuf>,
}

impl CliArgs {
    fn apply(self, mut config: Config) -> Config {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(rules) = self.rules {
            config.advice_rules_path = Some(rules);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reese_stylist=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reese-stylist");

    let args = CliArgs::parse();
    let config = args.apply(Config::from_env().context("Failed to load configuration")?);

    match App::new(config) {
        Ok(app) => match app.serve().await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Server failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    }
}
