//! Cached block-timestamp lookups.

use crate::{ChainClient, FetchError};
use lru::LruCache;
use std::{num::NonZeroUsize, sync::Arc};

/// How many block timestamps to keep around.
const DEFAULT_CACHE_SIZE: usize = 1_024;

/// Resolves block numbers to timestamps, remembering recent answers.
///
/// Events cluster in blocks, so attaching timestamps to a page of events
/// asks for the same few heights repeatedly. Confirmed block timestamps
/// never change, which makes them safe to cache indefinitely.
#[derive(Debug)]
pub struct BlockTimestamps<C> {
    client: Arc<C>,
    cache: LruCache<u64, u64>,
}

impl<C: ChainClient> BlockTimestamps<C> {
    /// A timestamp cache over `client`.
    pub fn new(client: Arc<C>) -> Self {
        Self { client, cache: LruCache::new(NonZeroUsize::new(DEFAULT_CACHE_SIZE).unwrap()) }
    }

    /// The timestamp of block `number`, from cache if possible.
    pub async fn lookup(&mut self, number: u64) -> Result<u64, FetchError> {
        if let Some(timestamp) = self.cache.get(&number) {
            return Ok(*timestamp);
        }
        let timestamp = self
            .client
            .block_timestamp(number)
            .await?
            .ok_or(FetchError::BlockNotFound(number))?;
        self.cache.put(number, timestamp);
        Ok(timestamp)
    }
}
