mod cli;
mod config;
mod error;
mod handlers;
mod picker;

use std::path::Path;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::config::{Settings, CONFIG_FILE};
use crate::picker::NativeDialog;

pub struct AppState {
    pub settings: Settings,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shortcutshare=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("ShortcutShare v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let settings = match Settings::resolve(&cli, &NativeDialog, Path::new(CONFIG_FILE)) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    if !settings.upload_disabled {
        tracing::info!("Uploading to: {}", settings.directory.display());
    }
    tracing::info!("Listening on port: {}", settings.port);

    let addr = format!("0.0.0.0:{}", settings.port);
    let app = handlers::app(settings);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
