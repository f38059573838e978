use anyhow::Result;
use clap::{Parser, Subcommand};
use profile_analyzer::core::ConfigManager;
use profile_analyzer::web::ErrorResponse;
use profile_analyzer::{start_web_server, ProfileAnalyzer};
use tracing::{error, info};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "profile-analyzer")]
#[command(about = "Analyze freelancer marketplace profiles with a language model")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server (default)
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Analyze a single profile and print the result as JSON
    Analyze {
        profile_url: String,
        #[arg(long)]
        pretty: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("profile_analyzer=info,rocket::server=off"));

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let mut config = ConfigManager::load()?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            info!(
                "Environment: {}",
                std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string())
            );
            start_web_server(config).await
        }
        Command::Analyze {
            profile_url,
            pretty,
        } => {
            let analyzer = ProfileAnalyzer::from_config(&config)?;
            match analyzer.analyze_profile(&profile_url).await {
                Ok(result) => {
                    let output = if pretty {
                        serde_json::to_string_pretty(&result)?
                    } else {
                        serde_json::to_string(&result)?
                    };
                    println!("{}", output);
                    Ok(())
                }
                Err(e) => {
                    error!(error.kind = e.kind(), "Analysis failed: {}", e);
                    println!(
                        "{}",
                        serde_json::to_string(&ErrorResponse::new(e.public_message()))?
                    );
                    std::process::exit(1);
                }
            }
        }
    }
}
