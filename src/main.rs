//! Docshift server and CLI
//!
//! ```bash
//! docshift serve --port 3008
//! docshift convert report.docx --output out/report.pdf
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use docshift::api::{self, AppState};
use docshift::config::{self, ConverterConfig};
use docshift::pipeline::Converter;

#[derive(Parser)]
#[command(name = "docshift")]
#[command(version = config::APP_VERSION)]
#[command(about = "Word ↔ PDF conversion via CLI or HTTP server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0", env = "DOCSHIFT_HOST")]
        host: IpAddr,

        /// Port to listen on
        #[arg(long, short, default_value_t = 3008, env = "DOCSHIFT_PORT")]
        port: u16,
    },
    /// Convert one document without starting the server
    Convert {
        /// .doc, .docx or .pdf file
        input: PathBuf,

        /// Destination file (defaults to the converted name next to the input)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    docshift::init_tracing();

    let cli = Cli::parse();
    let config = ConverterConfig::from_env();

    let result = match cli.command {
        Commands::Serve { host, port } => {
            info!("{} v{} starting", config::APP_NAME, config::APP_VERSION);
            api::serve(AppState::from_config(config), SocketAddr::new(host, port)).await
        }
        Commands::Convert { input, output } => convert_file(config, input, output).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn convert_file(config: ConverterConfig, input: PathBuf, output: Option<PathBuf>) -> Result<(), String> {
    let source = tokio::fs::read(&input)
        .await
        .map_err(|e| format!("Cannot read {}: {e}", input.display()))?;
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| format!("Invalid input file name: {}", input.display()))?;

    let converter = Arc::new(Converter::new(config));
    let result = tokio::task::spawn_blocking(move || converter.convert(&name, source))
        .await
        .map_err(|e| format!("Conversion task failed: {e}"))?
        .map_err(|e| e.to_string())?;

    let destination = output.unwrap_or_else(|| sibling(&input, &result.file_name));
    tokio::fs::write(&destination, &result.bytes)
        .await
        .map_err(|e| format!("Cannot write {}: {e}", destination.display()))?;

    info!(
        output = %destination.display(),
        strategy = result.strategy,
        degraded = result.degraded,
        "Conversion written"
    );
    println!("{}", destination.display());
    Ok(())
}

fn sibling(input: &Path, file_name: &str) -> PathBuf {
    input
        .parent()
        .map(|dir| dir.join(file_name))
        .unwrap_or_else(|| PathBuf::from(file_name))
}
