// bacc: command-line front end for blind accumulator logs

use anyhow::{Context, Result};
use blind_accumulator_toolkit::common::{SecurityLevel, ToolkitConfig};
use blind_accumulator_toolkit::{init_logging, load_config};
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use std::path::PathBuf;

mod commands;
mod files;

#[derive(Parser)]
#[command(name = "bacc")]
#[command(about = "Blind accumulator logs: registration, validation and anonymous membership proofs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new accumulator log
    Init {
        log: PathBuf,

        /// Security level (128, 192 or 256)
        #[arg(short, long)]
        level: Option<u16>,

        /// Bind the first element to this name
        #[arg(short, long)]
        name: Option<String>,

        /// Replace an existing log
        #[arg(long)]
        force: bool,
    },

    /// Register a private key and append a signed entry
    Add {
        log: PathBuf,

        /// Accumulator private key (hex)
        #[arg(short, long)]
        key: PathBuf,

        /// Custodian signing key (hex)
        #[arg(short, long)]
        signer: PathBuf,

        /// Custodian certificate (DER)
        #[arg(short, long)]
        cert: PathBuf,
    },

    /// Verify every entry of a log against a trust anchor
    Validate {
        log: PathBuf,

        /// Trust anchor (DER)
        #[arg(short, long)]
        anchor: PathBuf,

        /// Require the first element to be bound to this name
        #[arg(short, long)]
        name: Option<String>,

        /// Worker pool size
        #[arg(short, long)]
        threads: Option<usize>,

        /// Validate on the calling thread only
        #[arg(long)]
        sequential: bool,
    },

    /// Print the level, entry count and latest snapshot of a log
    Extract {
        log: PathBuf,

        /// Also list entry offsets
        #[arg(long)]
        offsets: bool,

        /// Write the latest snapshot to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Derive the membership public key of a registered private key
    Der {
        #[arg(long)]
        acc: PathBuf,

        #[arg(short, long)]
        key: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Prove anonymous membership, optionally signing associated data
    Prvder {
        #[arg(long)]
        acc: PathBuf,

        #[arg(short, long)]
        key: PathBuf,

        #[arg(long)]
        adata: Option<PathBuf>,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Verify an anonymous membership proof
    Vfyder {
        #[arg(long)]
        acc: PathBuf,

        #[arg(long)]
        pubkey: PathBuf,

        #[arg(long)]
        proof: PathBuf,

        #[arg(long)]
        adata: Option<PathBuf>,
    },

    /// Generate an accumulator private key
    Keygen {
        #[arg(short, long)]
        level: Option<u16>,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Create an issuer key and its trust anchor
    Anchor {
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        key_out: PathBuf,

        #[arg(long)]
        anchor_out: PathBuf,
    },

    /// Issue a custodian key and certificate
    Certify {
        /// Issuer signing key (hex)
        #[arg(long)]
        issuer: PathBuf,

        #[arg(long)]
        issuer_name: String,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        key_out: PathBuf,

        #[arg(long)]
        cert_out: PathBuf,
    },
}

fn resolve_level(flag: Option<u16>, config: &ToolkitConfig) -> Result<SecurityLevel> {
    match flag {
        Some(bits) => Ok(SecurityLevel::from_bits(bits)?),
        None => Ok(config.level),
    }
}

fn run(cli: Cli, config: &ToolkitConfig) -> Result<()> {
    let mut rng = OsRng;
    match cli.command {
        Commands::Init {
            log,
            level,
            name,
            force,
        } => {
            let level = resolve_level(level, config)?;
            commands::init(&log, level, name.as_deref(), force, &mut rng)
        }
        Commands::Add {
            log,
            key,
            signer,
            cert,
        } => commands::add(&log, &key, &signer, &cert, &mut rng).map(|_| ()),
        Commands::Validate {
            log,
            anchor,
            name,
            threads,
            sequential,
        } => commands::validate(
            &log,
            &anchor,
            name.as_deref(),
            threads.or(config.threads),
            sequential,
        )
        .map(|_| ()),
        Commands::Extract { log, offsets, out } => {
            commands::extract(&log, offsets, out.as_deref())
        }
        Commands::Der { acc, key, out } => commands::der(&acc, &key, out.as_deref()),
        Commands::Prvder {
            acc,
            key,
            adata,
            out,
        } => commands::prvder(&acc, &key, adata.as_deref(), &out, &mut rng),
        Commands::Vfyder {
            acc,
            pubkey,
            proof,
            adata,
        } => commands::vfyder(&acc, &pubkey, &proof, adata.as_deref()),
        Commands::Keygen { level, out } => {
            let level = resolve_level(level, config)?;
            commands::keygen(level, &out, &mut rng)
        }
        Commands::Anchor {
            name,
            key_out,
            anchor_out,
        } => commands::anchor(&name, &key_out, &anchor_out, &mut rng),
        Commands::Certify {
            issuer,
            issuer_name,
            subject,
            key_out,
            cert_out,
        } => commands::certify(
            &issuer,
            &issuer_name,
            &subject,
            &key_out,
            &cert_out,
            &mut rng,
        ),
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => match load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))
        {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ {:#}", e);
                std::process::exit(2);
            }
        },
        None => ToolkitConfig::default(),
    };
    init_logging(&config, cli.verbose);

    if let Err(e) = run(cli, &config) {
        log::error!("{:#}", e);
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}
