use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

pub mod format;
pub mod loader;
pub mod rpc;
pub mod serialize;
pub mod serve;
pub mod stats;
pub mod types;

use format::OutputFormat;
use rpc::{BlockId, ExplorerClient};
use serialize::to_wire;

#[derive(Parser)]
#[command(
    name = "blockscope",
    about = "Blockchain explorer SDK with batched block loading and live WebSocket streaming",
    version
)]
struct Cli {
    /// JSON-RPC endpoint URL (required for every chain operation)
    #[arg(short = 'r', long, env = "EXPLORER_RPC_URL")]
    rpc_url: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    format: OutputFormat,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Chain(ChainCommand),

    /// Run the live streaming WebSocket server
    Serve {
        /// Port for the server
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// Bind address
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },
}

#[derive(Subcommand)]
enum ChainCommand {
    /// Fetch a block by number or 'latest'
    Block {
        /// Block number, or 'latest'
        number: String,

        /// Embed full transaction objects instead of hashes
        #[arg(long)]
        full_txs: bool,
    },

    /// Fetch a transaction by hash
    Tx {
        /// Transaction hash (hex, 0x-prefixed)
        hash: String,
    },

    /// Count the transactions in a block
    TxCount {
        /// Block number, or 'latest'
        number: String,
    },

    /// Classify an address and show its balance
    Address {
        /// Address (hex, 0x-prefixed)
        address: String,
    },

    /// Load a descending range of blocks in concurrent batches
    Range {
        /// First (highest) block of the range, or 'latest'
        start: String,

        /// How many blocks to walk down
        count: i64,
    },

    /// Show the most recent blocks with their transaction counts
    Recent {
        /// Number of blocks back from the head
        #[arg(default_value_t = 10)]
        count: u64,
    },

    /// Derive a network statistics snapshot
    Stats,

    /// Show chain id, head block, and fee data
    Info,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    // Set up tracing
    let filter = match cli.verbose {
        0 => "blockscope=info",
        1 => "blockscope=debug",
        _ => "blockscope=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Serve { port, bind } => {
            serve::run(&bind, port).await?;
        }
        Commands::Chain(command) => {
            let rpc_url = cli
                .rpc_url
                .as_deref()
                .ok_or_else(|| eyre::eyre!("missing --rpc-url (or EXPLORER_RPC_URL)"))?;
            dispatch(command, rpc_url, &cli.format).await?;
        }
    }

    Ok(())
}

async fn dispatch(command: ChainCommand, rpc_url: &str, format: &OutputFormat) -> eyre::Result<()> {
    match command {
        ChainCommand::Block { number, full_txs } => {
            let client = ExplorerClient::new(rpc_url)?;
            let id = parse_block_id(&number)?;
            match client.get_block(id, full_txs).await {
                Some(block) => print_value(&to_wire(&block)?, format)?,
                None => not_found("Block"),
            }
        }
        ChainCommand::Tx { hash } => {
            let client = ExplorerClient::new(rpc_url)?;
            match client.get_transaction(&hash).await {
                Some(tx) => print_value(&to_wire(&tx)?, format)?,
                None => not_found("Transaction"),
            }
        }
        ChainCommand::TxCount { number } => {
            let client = ExplorerClient::new(rpc_url)?;
            let id = parse_block_id(&number)?;
            match client.get_block_transaction_count(id).await {
                Some(count) => print_value(&tx_count_payload(&number, count)?, format)?,
                None => not_found("Block"),
            }
        }
        ChainCommand::Address { address } => {
            let client = ExplorerClient::new(rpc_url)?;
            match client.get_address_details(&address).await {
                Some(details) => print_value(&to_wire(&details)?, format)?,
                None => not_found("Address"),
            }
        }
        ChainCommand::Range { start, count } => {
            let client = ExplorerClient::new(rpc_url)?;
            let start = match parse_block_id(&start)? {
                BlockId::Number(n) => n,
                BlockId::Latest => match client.get_block_number().await {
                    Some(head) => head,
                    None => {
                        not_found("Latest block");
                        return Ok(());
                    }
                },
            };
            let blocks = loader::load_range(&client, start, count).await;
            print_value(&to_wire(&blocks)?, format)?;
        }
        ChainCommand::Recent { count } => {
            let client = ExplorerClient::new(rpc_url)?;
            match recent_blocks(&client, count).await {
                Some(blocks) => print_value(&serde_json::Value::Array(blocks), format)?,
                None => not_found("Latest block"),
            }
        }
        ChainCommand::Stats => {
            let client = ExplorerClient::new(rpc_url)?;
            match stats::compute_stats(&client).await {
                Some(snapshot) => print_value(&to_wire(&snapshot)?, format)?,
                None => not_found("Network statistics"),
            }
        }
        ChainCommand::Info => rpc::info(rpc_url).await?,
    }
    Ok(())
}

/// Walk back from the head, merging each block with its transaction count.
/// Stops at the first missing block.
async fn recent_blocks(client: &ExplorerClient, count: u64) -> Option<Vec<serde_json::Value>> {
    let head = client.get_block(BlockId::Latest, false).await?;
    let mut current = head.number()?;

    let mut blocks = Vec::new();
    for _ in 0..count {
        let Some(block) = client.get_block(BlockId::Number(current), false).await else {
            break;
        };
        let tx_count = match client
            .get_block_transaction_count(BlockId::Number(current))
            .await
        {
            Some(c) => c,
            None => block.tx_count() as u64,
        };
        match serve::block_push_payload(&block, tx_count) {
            Ok(payload) => blocks.push(payload),
            Err(_) => break,
        }
        if current == 0 {
            break;
        }
        current -= 1;
    }
    Some(blocks)
}

fn tx_count_payload(number: &str, count: u64) -> eyre::Result<serde_json::Value> {
    to_wire(&serde_json::json!({"block": number, "transactionCount": count}))
}

fn parse_block_id(s: &str) -> eyre::Result<BlockId> {
    if s == "latest" {
        return Ok(BlockId::Latest);
    }
    let number = s
        .parse::<u64>()
        .map_err(|_| eyre::eyre!("invalid block number: {s}"))?;
    Ok(BlockId::Number(number))
}

fn print_value(value: &serde_json::Value, format: &OutputFormat) -> eyre::Result<()> {
    match format {
        OutputFormat::Pretty => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
    }
    Ok(())
}

fn not_found(what: &str) {
    println!("{} {} not found", "✗".red(), what);
}
