//! wirekit command line
//!
//! Offline helpers over the library: discriminators, program-derived
//! addresses, compact lengths and IDL-driven encoding. Results go to stdout;
//! logs go to stderr through `tracing`.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use solana_sdk::pubkey::Pubkey;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use wirekit::codec::shortvec;
use wirekit::config::Config;
use wirekit::discriminator::{self, DiscriminatorKind};
use wirekit::idl::{value_from_json, Idl, IdlCoder};
use wirekit::metrics::metrics;
use wirekit::pda::SeedValue;
use wirekit::structured_logging::{init_logging, StructuredLogger};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "wirekit", author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "wirekit.toml", env = "WIREKIT_CONFIG", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print collected metrics to stderr before exiting
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the 8-byte discriminator of a named item
    Discriminator {
        #[arg(value_enum)]
        kind: KindArg,
        name: String,
    },

    /// Search for a program-derived address
    Derive {
        /// Program id (base58)
        #[arg(long)]
        program: Pubkey,

        /// Seed as kind:value (str, hex, pubkey, u8, u16le, u32le, u64le,
        /// u16be, u32be, u64be); repeat for multiple seeds
        #[arg(long = "seed")]
        seeds: Vec<SeedValue>,
    },

    /// Print the compact-length encoding of a length
    Shortvec { len: usize },

    /// Encode account or instruction data from JSON using an IDL
    #[command(group(ArgGroup::new("target").required(true).args(["account", "instruction"])))]
    Encode {
        /// IDL JSON file
        #[arg(long)]
        idl: PathBuf,

        /// Account type name
        #[arg(long)]
        account: Option<String>,

        /// Instruction name
        #[arg(long)]
        instruction: Option<String>,

        /// Value as JSON
        #[arg(long)]
        json: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Account,
    Instruction,
    Event,
}

impl From<KindArg> for DiscriminatorKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Account => DiscriminatorKind::Account,
            KindArg::Instruction => DiscriminatorKind::Instruction,
            KindArg::Event => DiscriminatorKind::Event,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_exists = args.config.exists();
    let config = load_config(&args.config)?;

    let level = if args.verbose {
        "wirekit=debug,info".to_string()
    } else {
        config.logging.level.clone()
    };
    init_logging(&level, config.logging.json)?;
    if !config_exists {
        debug!(path = %args.config.display(), "config file not found, using defaults");
    }

    let logger = StructuredLogger::with_random_context();
    let result = run(args.command, &config, &logger);

    if args.metrics {
        eprintln!("{}", metrics().export()?);
    }
    if let Err(e) = &result {
        logger.error(&format!("{:#}", e));
    }
    result
}

fn run(command: Command, config: &Config, logger: &StructuredLogger) -> Result<()> {
    match command {
        Command::Discriminator { kind, name } => {
            let bytes = discriminator::compute(kind.into(), &name);
            println!("{}", hex::encode(bytes));
        }
        Command::Derive { program, seeds } => {
            let deriver = config.cached_deriver();
            let derived = deriver
                .find_address(&seeds, &program)
                .map_err(|e| wirekit::WireError::from(e).recorded())?;
            logger.log_derivation(&program, &derived);
            logger.log_cache_stats(&deriver.stats());
            println!("{} {}", derived.address, derived.bump);
        }
        Command::Shortvec { len } => {
            let bytes = shortvec::encode_len(len)?;
            println!("{}", hex::encode_upper(bytes));
        }
        Command::Encode {
            idl,
            account,
            instruction,
            json,
        } => {
            let data = encode_from_idl(&idl, account.as_deref(), instruction.as_deref(), &json)?;
            println!("{}", hex::encode(data));
        }
    }
    Ok(())
}

fn encode_from_idl(
    path: &Path,
    account: Option<&str>,
    instruction: Option<&str>,
    raw_json: &str,
) -> Result<Vec<u8>> {
    let idl = Idl::from_file(path)?;
    let coder = IdlCoder::new(&idl)?;
    let input: serde_json::Value = serde_json::from_str(raw_json).context("--json is not valid JSON")?;
    info!(
        program = idl.program_name().unwrap_or("unknown"),
        "loaded IDL"
    );

    let data = match (account, instruction) {
        (Some(name), _) => {
            let value = value_from_json(&input, coder.accounts.account_type(name)?, coder.accounts.registry())?;
            coder.accounts.encode(name, &value)?
        }
        (None, Some(name)) => {
            let value = value_from_json(
                &input,
                coder.instructions.args_type(name)?,
                coder.instructions.registry(),
            )?;
            coder.instructions.encode(name, &value)?
        }
        (None, None) => anyhow::bail!("either --account or --instruction is required"),
    };
    Ok(data)
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))
    } else {
        let mut config = Config::default();
        dotenvy::dotenv().ok();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }
}
