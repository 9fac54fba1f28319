//! boardscan CLI
//!
//! Detects chessboard and go-board diagrams in a PDF.
//!
//! # Usage
//!
//! ```bash
//! boardscan detect --file book.pdf --model models/chssnet.onnx --pages 1,3-5 --output json
//! boardscan detect --file book.pdf --model models/chssnet.onnx --overlay-dir out/
//! boardscan timings --file book.pdf --model models/chssnet.onnx
//! boardscan extract --dir library/ --output crops/ --size 224
//! ```

mod cli;
mod config;
mod extract;

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "boardscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find chess and go board diagrams in PDF documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect boards and print the annotations of every page
    Detect {
        #[command(flatten)]
        input: InputArgs,

        /// Output format (json, pretty)
        #[arg(long, default_value = "pretty")]
        output: String,

        /// Directory receiving one PNG per page with the boxes drawn in
        #[arg(long = "overlay-dir")]
        overlay_dir: Option<PathBuf>,
    },
    /// Detect boards and print only the per-page timings
    Timings {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Export every detected rectangle as a padded square PNG
    #[command(group(ArgGroup::new("source").required(true).args(["file", "dir"])))]
    Extract {
        /// PDF document to export
        #[arg(long)]
        file: Option<PathBuf>,

        /// Directory searched recursively for PDF documents
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output directory, one folder per document
        #[arg(short, long, default_value = "./output_images")]
        output: PathBuf,

        /// Edge length of the exported squares
        #[arg(short, long, default_value_t = 224)]
        size: u32,

        /// JSON pipeline configuration
        #[arg(long, env = "BOARDSCAN_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// PDF document to scan
    #[arg(long, env = "BOARDSCAN_FILE")]
    file: PathBuf,

    /// Path to the board classifier model
    #[arg(long, env = "BOARDSCAN_MODEL")]
    model: PathBuf,

    /// Pages to scan, 1-based (e.g. "1,3-5"); all pages when omitted
    #[arg(long)]
    pages: Option<String>,

    /// JSON pipeline configuration
    #[arg(long, env = "BOARDSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Number of classification threads (defaults to number of CPUs)
    #[arg(long, env = "BOARDSCAN_THREADS")]
    threads: Option<usize>,

    /// Number of classifier sessions running concurrently
    #[arg(long, default_value_t = 1, env = "BOARDSCAN_SESSIONS")]
    sessions: usize,

    /// Device to use (cpu, cuda, cuda:0, coreml)
    #[arg(long, default_value = "cpu", env = "BOARDSCAN_DEVICE")]
    device: String,
}

impl InputArgs {
    fn into_config(self) -> config::ScanConfig {
        config::ScanConfig {
            file: self.file,
            model: self.model,
            pages: self.pages,
            pipeline_config: self.config,
            threads: self.threads,
            sessions: self.sessions,
            device: self.device,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    boardscan::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect {
            input,
            output,
            overlay_dir,
        } => {
            let config = input.into_config();
            info!("Scanning {}", config.file.display());
            cli::run_detect(&config, &output, overlay_dir.as_deref()).await?;
        }
        Commands::Timings { input } => {
            let config = input.into_config();
            info!("Timing {}", config.file.display());
            cli::run_timings(&config).await?;
        }
        Commands::Extract {
            file,
            dir,
            output,
            size,
            config: pipeline_config,
        } => {
            let inputs = match (file, dir) {
                (Some(file), _) => vec![file],
                (None, Some(dir)) => extract::find_pdfs(&dir)?,
                (None, None) => Vec::new(),
            };
            let config = extract::ExtractConfig {
                inputs,
                output,
                size,
                pipeline: config::load_pipeline(pipeline_config.as_deref())?,
            };
            info!("Extracting from {} documents", config.inputs.len());
            extract::run_extract(&config)?;
        }
    }

    Ok(())
}
