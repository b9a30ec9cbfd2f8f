mod config;
mod converters;
mod error;
mod llm_client;
mod logging;
mod models;
mod pipeline;
mod prompt;
mod render;
mod router;
mod session;
mod upload;

use clap::Parser;
use config::{BackendKind, Config};
use router::{AppState, build_router};
use session::SessionStore;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, info};

#[derive(Parser, Debug)]
#[command(name = "markdown-ocr")]
#[command(about = "Upload an image, get its text back as Markdown from a vision model")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    ip: String,

    #[arg(short, long, default_value = "8501")]
    port: u16,

    /// Path to a YAML config file; built-in defaults are used without one
    #[arg(short, long)]
    config: Option<String>,

    /// Overrides the backend chosen in the config file
    #[arg(short, long, value_enum)]
    backend: Option<BackendKind>,

    /// trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Also write logs to this file (capped at 10 MiB)
    #[arg(long)]
    log_file: Option<String>,

    /// socks and http proxy for backend calls, example: socks5://192.168.0.2:10080
    #[arg(long)]
    proxy: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = Level::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using INFO level.", args.log_level);
        Level::INFO
    });
    logging::init_logging(log_level, args.log_file.as_deref());

    let mut config = match &args.config {
        Some(path) => {
            let config = Config::from_file(path)?;
            info!("Configuration loaded successfully from: {}", path);
            config
        }
        None => {
            info!("No config file given, using built-in defaults");
            Config::default()
        }
    };
    if let Some(kind) = args.backend {
        config = config.with_backend(kind);
    }

    let client_builder = reqwest::Client::builder();
    let client_builder = match &args.proxy {
        Some(proxy) => client_builder.proxy(reqwest::Proxy::all(proxy)?),
        None => client_builder,
    };
    let http_client = Arc::new(client_builder.build()?);

    // One client for the whole process, handed to every request through state
    let llm_client = Arc::new(llm_client::LlmClient::new(http_client, &config)?);
    info!("Using {} backend with model {}", llm_client.backend_label(), llm_client.model());
    debug!("Extraction instruction: {}", llm_client.instruction());

    let app_state = AppState {
        llm_client,
        sessions: Arc::new(SessionStore::new(Duration::from_secs(config.session.idle_timeout_secs))),
    };
    let app = build_router(app_state);

    let bind_address = format!("{}:{}", args.ip, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server started on http://{}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
