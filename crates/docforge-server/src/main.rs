//! docforge binary - HTTP service that turns JSON into .docx documents

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docforge_server::{ServerConfig, config::normalize_route_prefixes, server};

#[derive(Parser, Debug)]
#[command(name = "docforge")]
#[command(about = "Generate .docx documents from templates over HTTP")]
struct Args {
    /// Port to listen on
    #[arg(short = 'P', long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, env = "DOCFORGE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Environment name reported by /health
    #[arg(long, env = "DOCFORGE_ENV", default_value = "development")]
    environment: String,

    /// Directory to search for templates before the built-in locations
    /// (can be specified multiple times)
    #[arg(
        long = "template-dir",
        value_name = "DIR",
        env = "DOCFORGE_TEMPLATE_DIR",
        value_delimiter = ','
    )]
    template_dirs: Vec<PathBuf>,

    /// Additional path to mount the routes under (can be specified multiple times).
    /// Example: --route-prefix /api/generate-resume
    #[arg(long = "route-prefix", value_name = "PATH")]
    route_prefixes: Vec<String>,

    /// Origin allowed by CORS; `*` allows any origin
    #[arg(long, env = "ALLOWED_ORIGIN", default_value = "*")]
    allowed_origin: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "docforge_server=info,docforge_engine=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = ServerConfig {
        port: args.port,
        host: args.host,
        environment: args.environment,
        template_dirs: args.template_dirs,
        route_prefixes: normalize_route_prefixes(&args.route_prefixes),
        allowed_origin: args.allowed_origin,
    };

    info!(environment = %config.environment, "Starting docforge");

    server::run_server(config).await?;

    Ok(())
}
