//! vrfgen - batch VRF proof generation CLI

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vrfgen_core::{
    Address, KdfCosts, KeyFile, KeyFileDecryptor, KeyMaterial, PasswordKeyDecryptor, H256,
};
use vrfgen_prover::{
    request::{DEFAULT_CALLBACK_GAS_LIMIT, DEFAULT_NONCE_COUNT, DEFAULT_NUM_WORDS},
    BatchRequest, ProofPipeline, ProverConfig, SeedScheme,
};

/// vrfgen - VRF proofs and Solidity verifier witnesses for a batch of requests
#[derive(Parser)]
#[command(name = "vrfgen")]
#[command(about = "Generate VRF proofs with precomputed on-chain verifier witnesses")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to $VRFGEN_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate proofs for nonces 1..=count
    Generate {
        /// Encrypted key file (vrfgen keygen output or a Chainlink node export)
        #[arg(long)]
        key_file: PathBuf,

        /// Key file password
        #[arg(long, env = "VRFGEN_PASSWORD", hide_env_values = true)]
        password: String,

        /// Requesting consumer address
        #[arg(long)]
        sender: Address,

        /// Subscription id
        #[arg(long)]
        subscription_id: u64,

        /// Hash of the block the requests landed in
        #[arg(long)]
        block_hash: H256,

        /// Number of that block
        #[arg(long)]
        block_number: u64,

        /// Callback gas limit
        #[arg(long, default_value_t = DEFAULT_CALLBACK_GAS_LIMIT)]
        callback_gas_limit: u64,

        /// Random words per request
        #[arg(long, default_value_t = DEFAULT_NUM_WORDS)]
        num_words: u64,

        /// Number of nonces
        #[arg(long, default_value_t = DEFAULT_NONCE_COUNT)]
        count: u64,

        /// Worker tasks (defaults to the configured value or available parallelism)
        #[arg(long)]
        workers: Option<usize>,

        /// Final seed derivation scheme
        #[arg(long, value_enum)]
        seed_scheme: Option<SeedScheme>,

        /// Output path (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Omit the header row
        #[arg(long)]
        no_header: bool,
    },

    /// Create a new encrypted key file
    Keygen {
        /// Output path for the key file
        #[arg(long)]
        output: PathBuf,

        /// Password to encrypt the key with
        #[arg(long, env = "VRFGEN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the JSON output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vrfgen=info,vrfgen_prover=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            key_file,
            password,
            sender,
            subscription_id,
            block_hash,
            block_number,
            callback_gas_limit,
            num_words,
            count,
            workers,
            seed_scheme,
            output,
            no_header,
        } => {
            let mut config = ProverConfig::discover(cli.config.as_deref())
                .context("Failed to load configuration")?;
            if let Some(scheme) = seed_scheme {
                config.seed_scheme = scheme;
            }
            if no_header {
                config.include_header = false;
            }

            let export = read_key_file(&key_file)?;
            info!("Loaded {} key file {:?}", export.format_name(), key_file);
            let request = BatchRequest {
                nonce_count: count,
                sender,
                subscription_id,
                block_hash,
                block_number,
                callback_gas_limit,
                num_words,
                workers,
            };

            let pipeline = ProofPipeline::with_config(config)?;
            let table = pipeline
                .generate(&KeyFileDecryptor, &export, &password, &request)
                .await?;
            let json = table.to_json(pipeline.config().include_header)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    info!("Wrote {} records to {:?}", table.len(), path);
                }
                None => println!("{}", json),
            }
        }

        Commands::Keygen { output, password } => {
            if output.exists() {
                anyhow::bail!("{:?} already exists. Refusing to overwrite.", output);
            }

            let mut rng = rand::rngs::OsRng;
            let key = KeyMaterial::generate(&mut rng);
            let export = PasswordKeyDecryptor.encrypt(&key, &password, KdfCosts::default(), &mut rng)?;
            std::fs::write(&output, export.to_json_pretty()?)
                .with_context(|| format!("Failed to write {:?}", output))?;

            info!("Key file written to {:?}", output);
            println!("Public key: {}", export.public_key);
            println!("Key hash:   {}", key.key_hash());
        }
    }

    Ok(())
}

fn read_key_file(path: &Path) -> anyhow::Result<KeyFile> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read key file {:?}", path))?;
    Ok(KeyFile::from_json(&bytes)?)
}
