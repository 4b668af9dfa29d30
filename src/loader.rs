//! Batched historical block loading.
//!
//! Walks a descending block range in strides of [`STRIDE`] concurrent
//! fetches. Strides run sequentially, so peak in-flight RPC calls stay
//! bounded at the stride width. Failed or missing blocks are dropped from
//! the result, which may therefore be shorter than the requested count.

use std::future::Future;

use futures_util::future;

use crate::rpc::{BlockId, ExplorerClient};
use crate::types::Block;

/// Concurrent fetches per stride.
pub const STRIDE: u64 = 5;

/// Anything that can resolve a block by number.
pub trait BlockSource {
    fn block(&self, number: u64) -> impl Future<Output = Option<Block>> + Send;
}

impl BlockSource for ExplorerClient {
    async fn block(&self, number: u64) -> Option<Block> {
        self.get_block(BlockId::Number(number), false).await
    }
}

/// Load up to `count` blocks walking down from `start`.
///
/// Returned blocks are a subset of `[start - count + 1, start]` in fetch
/// order (descending). `count <= 0` yields an empty result, as does a range
/// entirely below genesis.
pub async fn load_range<S: BlockSource>(source: &S, start: u64, count: i64) -> Vec<Block> {
    if count <= 0 {
        return Vec::new();
    }

    let start = start as i128;
    let end = start - count as i128 + 1;
    let mut blocks = Vec::new();

    let mut cursor = start;
    while cursor >= end {
        let mut batch = Vec::new();
        for offset in 0..STRIDE as i128 {
            let number = cursor - offset;
            if number < end || number < 0 {
                break;
            }
            batch.push(source.block(number as u64));
        }

        // join_all settles in issue order, keeping the descending sequence.
        let settled = future::join_all(batch).await;
        blocks.extend(settled.into_iter().flatten());

        cursor -= STRIDE as i128;
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Serves blocks from a fixed set of available numbers and records the
    /// order fetches were issued in.
    struct FakeChain {
        available: HashSet<u64>,
        requested: Mutex<Vec<u64>>,
    }

    impl FakeChain {
        fn with_blocks(range: std::ops::RangeInclusive<u64>) -> Self {
            Self {
                available: range.collect(),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn empty() -> Self {
            Self {
                available: HashSet::new(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl BlockSource for FakeChain {
        async fn block(&self, number: u64) -> Option<Block> {
            self.requested.lock().unwrap().push(number);
            if !self.available.contains(&number) {
                return None;
            }
            Some(
                serde_json::from_value(serde_json::json!({
                    "number": format!("0x{number:x}"),
                    "hash": format!("0x{number:064x}"),
                    "transactions": [],
                }))
                .unwrap(),
            )
        }
    }

    fn numbers(blocks: &[Block]) -> Vec<u64> {
        blocks.iter().filter_map(|b| b.number()).collect()
    }

    #[tokio::test]
    async fn test_full_range_descending() {
        let chain = FakeChain::with_blocks(0..=200);
        let blocks = load_range(&chain, 100, 7).await;
        assert_eq!(numbers(&blocks), vec![100, 99, 98, 97, 96, 95, 94]);
    }

    #[tokio::test]
    async fn test_result_is_subset_without_duplicates() {
        let chain = FakeChain::with_blocks(0..=100);
        let blocks = load_range(&chain, 100, 23).await;
        let nums = numbers(&blocks);
        let unique: HashSet<_> = nums.iter().collect();
        assert_eq!(unique.len(), nums.len());
        assert!(nums.iter().all(|&n| (78..=100).contains(&n)));
        assert!(nums.windows(2).all(|w| w[0] > w[1]));
    }

    #[tokio::test]
    async fn test_missing_blocks_omitted() {
        let mut chain = FakeChain::with_blocks(90..=100);
        chain.available.remove(&97);
        chain.available.remove(&93);
        let blocks = load_range(&chain, 100, 10).await;
        assert_eq!(numbers(&blocks), vec![100, 99, 98, 96, 95, 94, 92, 91]);
    }

    #[tokio::test]
    async fn test_nonpositive_count_is_empty() {
        let chain = FakeChain::with_blocks(0..=100);
        assert!(load_range(&chain, 100, 0).await.is_empty());
        assert!(load_range(&chain, 100, -5).await.is_empty());
        assert!(chain.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty() {
        let chain = FakeChain::empty();
        assert!(load_range(&chain, 100, 12).await.is_empty());
    }

    #[tokio::test]
    async fn test_range_clamped_at_genesis() {
        let chain = FakeChain::with_blocks(0..=100);
        let blocks = load_range(&chain, 2, 10).await;
        assert_eq!(numbers(&blocks), vec![2, 1, 0]);
        // nothing below genesis should even be requested
        assert_eq!(*chain.requested.lock().unwrap(), vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn test_strides_issued_in_descending_order() {
        let chain = FakeChain::with_blocks(0..=100);
        load_range(&chain, 100, 12).await;
        let requested = chain.requested.lock().unwrap();
        assert_eq!(
            *requested,
            vec![100, 99, 98, 97, 96, 95, 94, 93, 92, 91, 90, 89]
        );
    }
}
