//! Network statistics derivation.
//!
//! One live input: the current gas price. The remaining figures are
//! placeholder estimates until per-block replay lands; they are named
//! constants here rather than fabricated at random, so repeated snapshots
//! against an unchanged fee quote are identical.

use chrono::{Duration, Utc};
use tracing::warn;

use crate::rpc::ExplorerClient;
use crate::types::{DailyTxPoint, GasPriceTiers, NetworkStats};

// TODO: derive these by replaying the recent block range once the loader
// grows a windowed scan (counts, block time, gas totals).
const ESTIMATED_BLOCKS_TODAY: u64 = 100;
const ESTIMATED_TOTAL_ADDRESSES: u64 = 1_000_000;
const ESTIMATED_TOTAL_TRANSACTIONS: u64 = 100;
const ESTIMATED_AVERAGE_BLOCK_TIME_SECS: u64 = 100;
const ESTIMATED_GAS_USED_TODAY: u64 = 1_000;
const ESTIMATED_TRANSACTIONS_TODAY: u64 = 3_500;

/// Length of the synthetic daily-transaction series.
pub const DAILY_SERIES_DAYS: i64 = 365;

/// Compute a stats snapshot from one live fee-data fetch.
/// Returns `None` (logged) if the fee data is unavailable; no partial
/// snapshot is produced.
pub async fn compute_stats(client: &ExplorerClient) -> Option<NetworkStats> {
    let Some(fee) = client.get_fee_data().await else {
        warn!("Error fetching network stats: fee data unavailable");
        return None;
    };
    Some(stats_from_gas_price(fee.gas_price))
}

/// Pure derivation: gas price in wei in, stats snapshot out.
pub fn stats_from_gas_price(gas_price_wei: u128) -> NetworkStats {
    let average = gas_price_wei as f64 / 1e9;
    let gas_prices = GasPriceTiers {
        average,
        fast: average * 1.2,
        slow: average * 0.8,
    };

    let utilization =
        ESTIMATED_GAS_USED_TODAY as f64 / ESTIMATED_TOTAL_TRANSACTIONS as f64 * 100.0;

    NetworkStats {
        total_blocks: ESTIMATED_BLOCKS_TODAY,
        total_addresses: ESTIMATED_TOTAL_ADDRESSES,
        total_transactions: ESTIMATED_TOTAL_TRANSACTIONS,
        average_block_time: ESTIMATED_AVERAGE_BLOCK_TIME_SECS,
        total_gas_used: ESTIMATED_GAS_USED_TODAY.to_string(),
        transactions_today: ESTIMATED_TRANSACTIONS_TODAY,
        gas_used_today: ESTIMATED_GAS_USED_TODAY.to_string(),
        gas_prices,
        static_gas_price: format_gwei(gas_price_wei),
        network_utilization_percentage: round2(utilization),
    }
}

/// Format a wei quantity as a gwei decimal string, trailing zeros trimmed.
pub fn format_gwei(wei: u128) -> String {
    let whole = wei / 1_000_000_000;
    let frac = wei % 1_000_000_000;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:09}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Build the synthetic one-year daily-transaction series, ending today.
/// Deterministic: the count for a given date never changes between calls.
pub fn daily_tx_series() -> Vec<DailyTxPoint> {
    let today = Utc::now().date_naive();
    (0..DAILY_SERIES_DAYS)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            DailyTxPoint {
                date: date.format("%Y-%m-%d").to_string(),
                transactions_count: synthetic_count(&date),
            }
        })
        .collect()
}

// xorshift over the day ordinal; spreads counts over a plausible band.
fn synthetic_count(date: &chrono::NaiveDate) -> u64 {
    use chrono::Datelike;
    let mut x = date.num_days_from_ce() as u64 ^ 0x9e37_79b9_7f4a_7c15;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    2_000 + x % 6_000
}
