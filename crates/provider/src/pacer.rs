//! Request pacing for rate-limited RPC endpoints.

use std::{num::NonZeroU32, time::Duration};
use tokio::{sync::Mutex, time::Instant};

/// Spaces requests evenly to honor a requests-per-second budget.
///
/// Each caller reserves the next free slot and sleeps until it arrives, so
/// concurrent workers share one budget instead of each pacing themselves.
/// A pacer built without a budget admits every request immediately.
#[derive(Debug)]
pub struct RequestPacer {
    interval: Option<Duration>,
    next_slot: Mutex<Instant>,
}

impl RequestPacer {
    /// A pacer admitting `requests_per_second` requests, or everything when
    /// `None`.
    pub fn new(requests_per_second: Option<NonZeroU32>) -> Self {
        let interval = requests_per_second.map(|rps| Duration::from_secs(1) / rps.get());
        Self { interval, next_slot: Mutex::new(Instant::now()) }
    }

    /// A pacer that never delays.
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Waits until the shared budget admits one more request.
    pub async fn pace(&self) {
        let Some(interval) = self.interval else { return };

        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let slot = (*next_slot).max(Instant::now());
            *next_slot = slot + interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}
