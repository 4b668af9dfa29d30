//! Core types for explorer data.

use serde::{Deserialize, Serialize};

/// A JSON-RPC request envelope.
#[derive(Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'a str,
    pub id: u64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

/// A JSON-RPC response envelope.
#[derive(Deserialize, Debug)]
pub struct JsonRpcResponse<T> {
    pub id: Option<u64>,
    pub result: Option<T>,
    pub error: Option<JsonRpcError>,
}

#[derive(Deserialize, Debug)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

fn parse_hex_u64(s: &str) -> Option<u64> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

fn parse_hex_u128(s: &str) -> Option<u128> {
    u128::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

/// A block as returned by `eth_getBlockByNumber`.
/// Quantity fields stay as hex strings; unmodeled fields land in `extra`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Block {
    /// Block hash (absent for pending blocks)
    pub hash: Option<String>,
    /// Block number (hex)
    pub number: Option<String>,
    /// Timestamp (hex)
    pub timestamp: Option<String>,
    /// Gas used (hex)
    #[serde(rename = "gasUsed")]
    pub gas_used: Option<String>,
    /// Gas limit (hex)
    #[serde(rename = "gasLimit")]
    pub gas_limit: Option<String>,
    /// Miner / validator address
    pub miner: Option<String>,
    /// Transaction list (hashes, or full objects in with-transactions mode)
    pub transactions: Option<serde_json::Value>,

    /// Catch-all for other fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Block {
    /// Parse the block number from hex.
    pub fn number(&self) -> Option<u64> {
        self.number.as_deref().and_then(parse_hex_u64)
    }

    /// Parse the timestamp from hex.
    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp.as_deref().and_then(parse_hex_u64)
    }

    /// Parse gas used from hex.
    pub fn gas_used(&self) -> Option<u64> {
        self.gas_used.as_deref().and_then(parse_hex_u64)
    }

    /// Count embedded transaction entries.
    pub fn tx_count(&self) -> usize {
        match &self.transactions {
            Some(serde_json::Value::Array(txs)) => txs.len(),
            _ => 0,
        }
    }
}

/// A transaction as returned by `eth_getTransactionByHash`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Transaction {
    pub hash: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Value in wei (hex)
    pub value: Option<String>,
    /// Gas limit (hex)
    pub gas: Option<String>,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Transaction {
    /// Parse the value in wei from hex.
    pub fn value_wei(&self) -> Option<u128> {
        self.value.as_deref().and_then(parse_hex_u128)
    }
}

/// Current network fee snapshot.
#[derive(Debug, Clone, Copy)]
pub struct FeeData {
    /// Gas price in wei
    pub gas_price: u128,
}

/// Gas price tiers in gwei.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct GasPriceTiers {
    pub average: f64,
    pub fast: f64,
    pub slow: f64,
}

/// Network health snapshot, derived fresh from fee data on every call.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NetworkStats {
    #[serde(rename = "totalBlocks")]
    pub total_blocks: u64,
    #[serde(rename = "totalAddresses")]
    pub total_addresses: u64,
    #[serde(rename = "totalTransactions")]
    pub total_transactions: u64,
    #[serde(rename = "averageBlockTime")]
    pub average_block_time: u64,
    #[serde(rename = "totalGasUsed")]
    pub total_gas_used: String,
    #[serde(rename = "transactionsToday")]
    pub transactions_today: u64,
    #[serde(rename = "gasUsedToday")]
    pub gas_used_today: String,
    #[serde(rename = "gasPrices")]
    pub gas_prices: GasPriceTiers,
    #[serde(rename = "staticGasPrice")]
    pub static_gas_price: String,
    #[serde(rename = "networkUtilizationPercentage")]
    pub network_utilization_percentage: f64,
}

/// Contract-vs-wallet classification plus raw balance.
#[derive(Serialize, Debug, Clone)]
pub struct AddressDetails {
    #[serde(rename = "addressType")]
    pub address_type: AddressType,
    /// Balance in wei
    #[serde(serialize_with = "crate::serialize::big_uint")]
    pub balance: u128,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Contract,
    Wallet,
}

/// One entry of the daily-transaction series.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DailyTxPoint {
    /// ISO date, YYYY-MM-DD
    pub date: String,
    #[serde(rename = "transactionsCount")]
    pub transactions_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_hex_accessors() {
        let block: Block = serde_json::from_str(
            r#"{
                "number": "0x64",
                "hash": "0xabc",
                "timestamp": "0x6553f100",
                "gasUsed": "0x5208",
                "gasLimit": "0x1c9c380",
                "miner": "0x0000000000000000000000000000000000000001",
                "transactions": ["0x1", "0x2", "0x3"],
                "baseFeePerGas": "0x3b9aca00"
            }"#,
        )
        .unwrap();

        assert_eq!(block.number(), Some(100));
        assert_eq!(block.gas_used(), Some(21_000));
        assert_eq!(block.tx_count(), 3);
        assert!(block.extra.contains_key("baseFeePerGas"));
    }

    #[test]
    fn test_transaction_value() {
        let tx: Transaction = serde_json::from_str(
            r#"{"hash": "0xdead", "from": "0x1", "to": "0x2", "value": "0xde0b6b3a7640000", "gas": "0x5208"}"#,
        )
        .unwrap();
        assert_eq!(tx.value_wei(), Some(1_000_000_000_000_000_000));
    }

    #[test]
    fn test_missing_fields_parse_as_none() {
        let block: Block = serde_json::from_str(r#"{"number": "0x1"}"#).unwrap();
        assert_eq!(block.number(), Some(1));
        assert_eq!(block.gas_used(), None);
        assert_eq!(block.tx_count(), 0);
    }
}
