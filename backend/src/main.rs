//! csvmatrix CLI - serve or apply matrix operations
//!
//! # Commands
//!
//! ```bash
//! csvmatrix serve --port 8080          # Start HTTP server
//! csvmatrix apply sum matrix.csv       # Run one operation on a local file
//! csvmatrix operations                 # Show available operations
//! ```

use clap::{Parser, Subcommand};
use csvmatrix::{
    apply_file, init_logging, operations_description, Operation, ServerConfig,
    DEFAULT_UPLOAD_LIMIT,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "csvmatrix")]
#[command(about = "Echo, flatten, invert, sum and multiply CSV integer matrices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        #[command(flatten)]
        config: ServerConfig,
    },

    /// Apply an operation to a local CSV file and print the result
    Apply {
        /// Operation to run (echo, flatten, invert, sum, multiply)
        operation: Operation,

        /// Input CSV file
        input: PathBuf,

        /// Largest accepted file, in bytes
        #[arg(long, default_value_t = DEFAULT_UPLOAD_LIMIT)]
        max_upload_size: u64,
    },

    /// Show available operations
    Operations,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config } => cmd_serve(config).await,

        Commands::Apply {
            operation,
            input,
            max_upload_size,
        } => cmd_apply(operation, &input, max_upload_size),

        Commands::Operations => cmd_operations(),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn cmd_serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&config.log_level);
    csvmatrix::server::start_server(config).await?;
    Ok(())
}

fn cmd_apply(op: Operation, input: &Path, limit: u64) -> Result<(), Box<dyn std::error::Error>> {
    init_logging("warn");

    match apply_file(op, input, limit) {
        Ok(out) => {
            print!("{}", out);
            Ok(())
        }
        Err(e) => match e.client_message() {
            Some(message) => Err(message.into()),
            None => Err(format!("Error: {}", e).into()),
        },
    }
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", operations_description());
    Ok(())
}
