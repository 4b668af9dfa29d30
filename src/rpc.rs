//! JSON-RPC client adapter — block, transaction, address, and fee primitives.
//!
//! Provider-level errors are absorbed here: every lookup degrades to `None`
//! (logged at warn) rather than propagating. Callers treat `None` as
//! "unavailable this round". Only constructing the client with a bad
//! endpoint URL is fatal.

use colored::Colorize;
use serde_json::json;
use tracing::warn;

use crate::types::{
    AddressDetails, AddressType, Block, FeeData, JsonRpcRequest, JsonRpcResponse, Transaction,
};

/// A block selector: explicit number or the chain head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
    Number(u64),
    Latest,
}

impl BlockId {
    fn to_param(self) -> serde_json::Value {
        match self {
            BlockId::Number(n) => json!(format!("0x{n:x}")),
            BlockId::Latest => json!("latest"),
        }
    }
}

/// One session's RPC binding. Each CLI invocation and each socket channel
/// owns its own instance; there is no shared module-level client.
pub struct ExplorerClient {
    http: reqwest::Client,
    rpc_url: reqwest::Url,
}

impl ExplorerClient {
    /// Bind to an RPC endpoint. Fails eagerly on an unparsable URL.
    pub fn new(rpc_url: &str) -> eyre::Result<Self> {
        let rpc_url = reqwest::Url::parse(rpc_url)?;
        Ok(Self {
            http: reqwest::Client::new(),
            rpc_url,
        })
    }

    /// Make a JSON-RPC call against the bound endpoint.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> eyre::Result<T> {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        let resp: JsonRpcResponse<T> = self
            .http
            .post(self.rpc_url.clone())
            .json(&req)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = resp.error {
            eyre::bail!("RPC error {}: {}", err.code, err.message);
        }
        resp.result.ok_or_else(|| eyre::eyre!("Empty RPC response"))
    }

    /// Fetch a block by number or the head. With `include_transactions`,
    /// embeds full transaction objects instead of hashes.
    pub async fn get_block(&self, id: BlockId, include_transactions: bool) -> Option<Block> {
        match self
            .call(
                "eth_getBlockByNumber",
                json!([id.to_param(), include_transactions]),
            )
            .await
        {
            Ok(block) => Some(block),
            Err(e) => {
                warn!("Error fetching block {id:?}: {e}");
                None
            }
        }
    }

    /// Fetch a transaction by hash.
    pub async fn get_transaction(&self, tx_hash: &str) -> Option<Transaction> {
        match self
            .call("eth_getTransactionByHash", json!([tx_hash]))
            .await
        {
            Ok(tx) => Some(tx),
            Err(e) => {
                warn!("Error fetching transaction {tx_hash}: {e}");
                None
            }
        }
    }

    /// Count the transactions in a block.
    pub async fn get_block_transaction_count(&self, id: BlockId) -> Option<u64> {
        match self
            .call::<String>("eth_getBlockTransactionCountByNumber", json!([id.to_param()]))
            .await
        {
            Ok(count) => u64::from_str_radix(count.trim_start_matches("0x"), 16).ok(),
            Err(e) => {
                warn!("Error fetching transaction count for {id:?}: {e}");
                None
            }
        }
    }

    /// Classify an address (bytecode probe) and fetch its raw balance.
    pub async fn get_address_details(&self, address: &str) -> Option<AddressDetails> {
        let code: String = match self.call("eth_getCode", json!([address, "latest"])).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Error fetching code for {address}: {e}");
                return None;
            }
        };
        let balance: String = match self.call("eth_getBalance", json!([address, "latest"])).await {
            Ok(b) => b,
            Err(e) => {
                warn!("Error fetching balance for {address}: {e}");
                return None;
            }
        };

        let address_type = if code != "0x" && !code.is_empty() {
            AddressType::Contract
        } else {
            AddressType::Wallet
        };
        let balance = u128::from_str_radix(balance.trim_start_matches("0x"), 16).ok()?;

        Some(AddressDetails {
            address_type,
            balance,
        })
    }

    /// Current network fee snapshot.
    pub async fn get_fee_data(&self) -> Option<FeeData> {
        match self.call::<String>("eth_gasPrice", json!([])).await {
            Ok(price) => u128::from_str_radix(price.trim_start_matches("0x"), 16)
                .ok()
                .map(|gas_price| FeeData { gas_price }),
            Err(e) => {
                warn!("Error fetching fee data: {e}");
                None
            }
        }
    }

    /// Current chain head number.
    pub async fn get_block_number(&self) -> Option<u64> {
        match self.call::<String>("eth_blockNumber", json!([])).await {
            Ok(n) => u64::from_str_radix(n.trim_start_matches("0x"), 16).ok(),
            Err(e) => {
                warn!("Error fetching block number: {e}");
                None
            }
        }
    }
}

/// Display chain info.
pub async fn info(rpc_url: &str) -> eyre::Result<()> {
    let client = ExplorerClient::new(rpc_url)?;

    println!("{}", "Chain Info".bold().cyan());
    println!("{}", "─".repeat(50));

    let chain_id: String = client.call("eth_chainId", json!([])).await?;
    let chain_id_num = u64::from_str_radix(chain_id.trim_start_matches("0x"), 16).unwrap_or(0);
    println!(
        "  {} {} ({})",
        "Chain ID:".bold(),
        chain_id_num.to_string().green(),
        chain_id
    );

    let Some(block) = client.get_block(BlockId::Latest, false).await else {
        eyre::bail!("Latest block not found");
    };

    if let Some(num) = block.number() {
        println!("  {} {}", "Block:".bold(), num.to_string().yellow());
    }

    if let Some(ts) = block.timestamp() {
        let dt = chrono::DateTime::from_timestamp(ts as i64, 0)
            .map(|d| d.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_default();
        println!("  {} {}", "Time:".bold(), dt);
    }

    if let Some(gas) = block.gas_used() {
        println!("  {} {}", "Gas Used:".bold(), format_gas(gas));
    }

    if let Some(miner) = &block.miner {
        println!("  {} {}", "Miner:".bold(), miner.dimmed());
    }

    println!("  {} {}", "Txns:".bold(), block.tx_count());

    if let Some(fee) = client.get_fee_data().await {
        println!(
            "  {} {} Gwei",
            "Gas Price:".bold(),
            crate::stats::format_gwei(fee.gas_price)
        );
    }

    println!("  {} {}", "RPC:".bold(), rpc_url.dimmed());

    Ok(())
}

fn format_gas(gas: u64) -> String {
    if gas >= 1_000_000 {
        format!("{:.2}M", gas as f64 / 1_000_000.0)
    } else if gas >= 1_000 {
        format!("{:.1}K", gas as f64 / 1_000.0)
    } else {
        gas.to_string()
    }
}
