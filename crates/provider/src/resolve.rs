//! Resolution of user-facing block references against a node.

use crate::{ChainClient, FetchError};
use almanac_types::{BlockRange, BlockRef};
use tracing::debug;

/// Resolves a pair of block references into a concrete range.
///
/// `latest` resolves to the node's tip. A timestamp used as the start of a
/// range resolves to the first block minted at or after it; used as the
/// end, to the last block minted at or before it. A range whose resolved
/// start exceeds its resolved end is rejected.
pub async fn resolve_range<C: ChainClient>(
    client: &C,
    start: BlockRef,
    end: BlockRef,
) -> Result<BlockRange, FetchError> {
    let latest = client.latest_block_number().await?;

    let start_block = match start {
        BlockRef::Number(number) => number,
        BlockRef::Latest => latest,
        BlockRef::Timestamp(seconds) => first_at_or_after(client, seconds, latest)
            .await?
            .ok_or(FetchError::TimestampBeyondHead(seconds))?,
    };
    let end_block = match end {
        BlockRef::Number(number) => number,
        BlockRef::Latest => latest,
        BlockRef::Timestamp(seconds) => last_at_or_before(client, seconds, latest)
            .await?
            .ok_or(FetchError::TimestampBeforeGenesis(seconds))?,
    };

    let range = BlockRange::new(start_block, end_block)?;
    debug!(target: "almanac_provider", %start, %end, %range, "Resolved block range");
    Ok(range)
}

/// The lowest block whose timestamp is at least `seconds`, if one exists.
///
/// Timestamps are nondecreasing in block height, which is what makes the
/// binary search sound.
async fn first_at_or_after<C: ChainClient>(
    client: &C,
    seconds: u64,
    latest: u64,
) -> Result<Option<u64>, FetchError> {
    if expect_timestamp(client, latest).await? < seconds {
        return Ok(None);
    }

    let (mut low, mut high) = (0u64, latest);
    while low < high {
        let mid = low + (high - low) / 2;
        if expect_timestamp(client, mid).await? >= seconds {
            high = mid;
        } else {
            low = mid + 1;
        }
    }
    Ok(Some(low))
}

/// The highest block whose timestamp is at most `seconds`, if one exists.
async fn last_at_or_before<C: ChainClient>(
    client: &C,
    seconds: u64,
    latest: u64,
) -> Result<Option<u64>, FetchError> {
    if expect_timestamp(client, 0).await? > seconds {
        return Ok(None);
    }

    let (mut low, mut high) = (0u64, latest);
    while low < high {
        let mid = low + (high - low).div_ceil(2);
        if expect_timestamp(client, mid).await? <= seconds {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(Some(low))
}

async fn expect_timestamp<C: ChainClient>(client: &C, number: u64) -> Result<u64, FetchError> {
    client.block_timestamp(number).await?.ok_or(FetchError::BlockNotFound(number))
}
