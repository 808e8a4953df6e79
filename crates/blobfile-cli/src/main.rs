//! blobfile-cli - Command-line interface for blobfile
//!
//! Reads, writes and truncates single objects in S3, GCS, Azure or on the
//! local filesystem, going through the same buffered handle a library user
//! would get.

use anyhow::{Context, Result};
use blobfile::{AccessPolicy, BlobError, OpenOptions};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

/// blobfile - treat a cloud object like a local file
#[derive(Parser)]
#[command(name = "blobfile")]
#[command(author, version, about = "Treat a cloud object like a local file", long_about = None)]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Load open options from a TOML file
    #[arg(long, global = true, value_name = "FILE", env = "BLOBFILE_CONFIG")]
    config: Option<PathBuf>,

    /// Text encoding (overrides the config file)
    #[arg(long, global = true)]
    encoding: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an object to stdout
    Cat {
        /// Object URL (s3://, gs://, az://, file://)
        url: String,

        /// Decode as text and print line by line
        #[arg(long)]
        lines: bool,
    },

    /// Upload stdin or a local file as an object
    Put {
        /// Object URL
        url: String,

        /// Read from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Store the object with a private access policy
        #[arg(long)]
        private: bool,

        /// Add Expires and Cache-Control headers this many days out
        #[arg(long, value_name = "DAYS")]
        expires_days: Option<u32>,

        /// Content type sent with the object
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Cut an object to the given size in bytes
    Truncate {
        /// Object URL
        url: String,

        /// New size; larger than the object leaves it unchanged
        size: u64,
    },

    /// Write a sample options file
    InitConfig {
        /// Where to write the file
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let result = run();

    match result {
        Ok(_) => process::exit(0),
        Err(e) => {
            error!("Error: {:#}", e);
            process::exit(map_error_to_exit_code(&e));
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut options = match &cli.config {
        Some(path) => OpenOptions::load(path)
            .with_context(|| format!("Failed to load options from {:?}", path))?,
        None => OpenOptions::default(),
    };
    if let Some(encoding) = cli.encoding {
        options = options.with_encoding(encoding);
    }

    match cli.command {
        Commands::Cat { url, lines } => commands::cat(&url, options, lines),
        Commands::Put {
            url,
            input,
            private,
            expires_days,
            content_type,
        } => {
            if private {
                options = options.with_access(AccessPolicy::Private);
            }
            if let Some(days) = expires_days {
                options = options.with_expiration_days(days);
            }
            if let Some(content_type) = content_type {
                options = options.with_content_type(content_type);
            }
            commands::put(&url, options, input.as_deref())
        }
        Commands::Truncate { url, size } => commands::truncate(&url, options, size),
        Commands::InitConfig { path, force } => commands::init_config(&path, force),
    }
}

fn map_error_to_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(blob_err) = err.downcast_ref::<BlobError>() {
        match blob_err {
            BlobError::Io(_) | BlobError::NotFound(_) => 2,
            BlobError::InvalidLocation(_)
            | BlobError::InvalidSeek(_)
            | BlobError::Codec(_)
            | BlobError::Unsupported(_) => 3,
            BlobError::ObjectStore(_) | BlobError::Remote(_) => 4,
            BlobError::Config(_) | BlobError::Closed | BlobError::Runtime(_) => 1,
        }
    } else if err.is::<std::io::Error>() {
        2
    } else {
        1
    }
}
