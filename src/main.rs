//! BCHT command-line front-end
//!
//! Mines, imports and inspects blocks in the local durable store.
//! Logs go to stderr; block data goes to stdout.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bcht_core::chain::{Chain, ChainTips};
use bcht_core::config::{Config, DATA_DIR_ENV};
use bcht_core::consensus::{Block, Entry};
use bcht_core::constants::BLOCK_VERSION;
use bcht_core::crypto::Hash;
use bcht_core::mining::{BlockTemplate, Miner, MiningResult};
use bcht_core::search;
use bcht_core::storage::SledStorage;

#[derive(Parser, Debug)]
#[command(name = "bcht", about = "BCHT chain of domain reputation votes", version)]
struct Cli {
    /// Directory holding the block database
    #[arg(long, short = 'd', env = DATA_DIR_ENV, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create and import a genesis block
    Genesis(GenesisArgs),
    /// Mine a block of votes and import it
    Mine(MineArgs),
    /// Import a raw block from a file
    Import { file: PathBuf },
    /// Print a block as JSON
    Get {
        /// Block hash in hex, optionally 0x-prefixed
        hash: String,
    },
    /// Print the current tip set
    Tips,
    /// Print domain ratings counted from a block back to genesis
    Rating {
        /// Starting block; defaults to the first current tip
        #[arg(long)]
        from: Option<String>,
    },
}

#[derive(Args, Debug)]
struct GenesisArgs {
    /// Creation time in Unix seconds; defaults to now
    #[arg(long)]
    time: Option<u64>,
    /// Votes as domain:attitude
    entries: Vec<Entry>,
}

#[derive(Args, Debug)]
struct MineArgs {
    /// Parent block hash; defaults to the first current tip
    #[arg(long)]
    parent: Option<String>,
    /// Creation time in Unix seconds; defaults to now
    #[arg(long)]
    time: Option<u64>,
    /// Upper bound of the nonce search
    #[arg(long, default_value_t = u32::MAX as u64)]
    max_tries: u64,
    /// Also write the raw block to this file
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
    /// Votes as domain:attitude
    #[arg(required = true)]
    entries: Vec<Entry>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = Config::from_env().context("failed to resolve configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("failed to create data directory {}", config.data_dir.display())
    })?;

    let db_path = config.db_path();
    let storage = SledStorage::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    let chain = Chain::new(storage);

    let result = run(&chain, &config, cli.command);
    chain.close().context("failed to close database")?;
    result
}

fn run(chain: &Chain<SledStorage>, config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Genesis(args) => {
            let time = args.time.map_or_else(now, Ok)?;
            let genesis = Block::new(BLOCK_VERSION, None, time, 0, args.entries);
            chain.import(&genesis)?;
            println!("{}", genesis.hash());
        }
        Commands::Mine(args) => mine(chain, config, args)?,
        Commands::Import { file } => {
            let raw = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let block = Block::from_bytes(&raw)
                .with_context(|| format!("{} does not hold a valid block", file.display()))?;
            let transition = chain.import(&block)?;
            tracing::info!(?transition, "import finished");
            println!("{}", block.hash());
        }
        Commands::Get { hash } => {
            let hash = Hash::parse_user(&hash)?;
            let block = chain.get(&hash)?;
            let view = serde_json::json!({ "hash": hash, "block": block });
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Tips => {
            let tips = chain.tips()?;
            match tips.parent {
                Some(parent) => println!("parent: {parent}"),
                None => println!("parent: none"),
            }
            for tip in &tips.tips {
                println!("tip: {tip}");
            }
        }
        Commands::Rating { from } => {
            let start = match from {
                Some(hash) => Hash::parse_user(&hash)?,
                None => first_tip(&chain.tips()?)?,
            };
            for (domain, rating) in search::website_rating(chain.storage(), start)? {
                println!("{domain}\t{rating}");
            }
        }
    }
    Ok(())
}

fn mine(chain: &Chain<SledStorage>, config: &Config, args: MineArgs) -> Result<()> {
    let parent = match args.parent {
        Some(hash) => Hash::parse_user(&hash)?,
        None => first_tip(&chain.tips()?)?,
    };
    let time = args.time.map_or_else(now, Ok)?;
    let template = BlockTemplate::new(BLOCK_VERSION, Some(parent), time, args.entries);

    let miner = Miner::new(config.mining_threads);
    tracing::info!(threads = miner.threads(), %parent, "mining block");
    let block = match miner.mine(&template, args.max_tries)? {
        MiningResult::Success { block, nonce } => {
            tracing::info!(nonce, hash = %block.hash(), "found block");
            block
        }
        MiningResult::Exhausted | MiningResult::Interrupted => {
            bail!("no solution found within {} tries", args.max_tries)
        }
    };

    if let Some(path) = &args.output {
        std::fs::write(path, block.to_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    chain.import(&block)?;
    println!("{}", block.hash());
    Ok(())
}

fn first_tip(tips: &ChainTips) -> Result<Hash> {
    match tips.tips.first() {
        Some(tip) => Ok(*tip),
        None => bail!("the chain is empty; import a genesis block first"),
    }
}

fn now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the Unix epoch")?
        .as_secs())
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bcht=info,bcht_core=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}
