//! Archive Kernel CLI
//!
//! Operator tooling around the fixity engine.
//!
//! ## Usage
//!
//! ```bash
//! # Digest a file with the configured default algorithm
//! archive-kernel digest ./object.bin
//!
//! # Digest with several algorithms in one pass
//! archive-kernel digest ./object.bin --algorithm sha1 --algorithm md5
//!
//! # Verify a file against a recorded digest and size
//! archive-kernel verify ./object.bin --checksum urn:sha1:e070a846... --size 19
//!
//! # Validate the configuration file
//! archive-kernel check-config --config /path/to/config.toml
//! ```

use anyhow::Context;
use archive_kernel::config::default_config_path;
use archive_kernel::{Config, DigestRegistry, DigestUri, FixityOptions, FixityService, ServerManagedPropsMode};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "archive-kernel")]
#[command(about = "Fixity tooling for a versioned object repository")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "ARCHIVE_KERNEL_CONFIG")]
    config: Option<PathBuf>,

    /// Server managed properties mode (strict or relaxed)
    #[arg(long, env = "ARCHIVE_KERNEL_PROPS_MODE")]
    props_mode: Option<ServerManagedPropsMode>,

    /// Read buffer size for fixity checks
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Give up on a fixity check after this many seconds
    #[arg(long, env = "ARCHIVE_KERNEL_FIXITY_TIMEOUT")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print digest URIs for a file
    Digest {
        file: PathBuf,

        /// Algorithm name, repeatable (defaults to the configured default)
        #[arg(short, long)]
        algorithm: Vec<String>,
    },

    /// Verify a file against a recorded digest
    Verify {
        file: PathBuf,

        /// Recorded digest URI, e.g. urn:sha-256:<hex>
        #[arg(long)]
        checksum: DigestUri,

        /// Recorded size in bytes
        #[arg(long)]
        size: Option<u64>,
    },

    /// Load and validate the config file
    CheckConfig,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                Config::load(&path).with_context(|| format!("loading {}", path.display()))?
            } else {
                Config::default()
            }
        }
    };

    // Apply CLI overrides
    if let Some(mode) = args.props_mode {
        config.server_managed_props_mode = mode;
    }
    if let Some(size) = args.buffer_size {
        config.fixity_buffer_size = size;
    }
    if let Some(secs) = args.timeout_secs {
        config.fixity_timeout_secs = Some(secs);
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("archive_kernel=info".parse()?))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let registry = Arc::new(DigestRegistry::standard());
    let default_algorithm = config.validate(&registry)?;

    let mut options = FixityOptions::default();
    if let Some(deadline) = config.fixity_timeout() {
        options = options.with_deadline(deadline);
    }
    let service = Arc::new(
        FixityService::new(registry.clone())
            .with_buffer_size(config.fixity_buffer_size)
            .with_options(options),
    );

    match args.command {
        Command::Digest { file, algorithm } => {
            let algorithms = if algorithm.is_empty() {
                vec![default_algorithm.algorithm().to_string()]
            } else {
                algorithm
            };
            let content = File::open(&file).with_context(|| format!("opening {}", file.display()))?;

            let svc = service.clone();
            let digests = tokio::task::spawn_blocking(move || svc.check_fixity_all(content, &algorithms)).await??;
            for digest in digests {
                println!("{}", digest);
            }
        }

        Command::Verify { file, checksum, size } => {
            let algorithm = checksum.algorithm(&registry);
            if algorithm.is_missing() {
                anyhow::bail!("unsupported digest scheme: {}", checksum.scheme());
            }
            let content = File::open(&file).with_context(|| format!("opening {}", file.display()))?;
            let subject = file.display().to_string();

            let result = service
                .check_fixity_async(subject.clone(), content, algorithm.algorithm().to_string())
                .await?;
            let status = result.status(size, &checksum);

            let names: Vec<String> = status.iter().map(|s| s.to_string()).collect();
            println!("{} {} {}", result.computed_checksum, result.computed_size, names.join(","));

            if !result.matches(size, &checksum) {
                error!(file = %subject, status = ?status, "Fixity check failed");
                std::process::exit(1);
            }
        }

        Command::CheckConfig => {
            info!(
                props_mode = %config.server_managed_props_mode,
                default_digest = %default_algorithm,
                buffer_size = config.fixity_buffer_size,
                "Configuration is valid"
            );
            println!("ok");
        }
    }

    Ok(())
}
