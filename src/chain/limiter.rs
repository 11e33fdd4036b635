//! Sliding-window rate limiter for RPC calls
//!
//! Caps the request rate against the provider plan and bounds the number of
//! in-flight calls the monitor can create as the wallet roster grows.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Rate limiter using a sliding one-second window
pub struct RpcRateLimiter {
    /// Maximum requests per window
    max_requests: u32,
    /// Window size
    window: Duration,
    /// Request timestamps within the current window
    requests: Mutex<VecDeque<Instant>>,
}

impl RpcRateLimiter {
    pub fn new(max_requests_per_second: u32) -> Self {
        Self {
            max_requests: max_requests_per_second.max(1),
            window: Duration::from_secs(1),
            requests: Mutex::new(VecDeque::new()),
        }
    }

    /// Acquire permission to make a request, sleeping while at the limit
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let now = Instant::now();
                let mut requests = self.requests.lock().expect("limiter lock poisoned");
                Self::evict_expired(&mut requests, now, self.window);

                if (requests.len() as u32) < self.max_requests {
                    requests.push_back(now);
                    return;
                }

                match requests.front() {
                    Some(&oldest) => (oldest + self.window).saturating_duration_since(now),
                    None => Duration::from_millis(10),
                }
            };

            sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    /// Non-blocking acquire; `false` when the window is full
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.lock().expect("limiter lock poisoned");
        Self::evict_expired(&mut requests, now, self.window);

        if (requests.len() as u32) < self.max_requests {
            requests.push_back(now);
            true
        } else {
            false
        }
    }

    /// Requests observed in the current window
    pub fn current_load(&self) -> usize {
        let now = Instant::now();
        let mut requests = self.requests.lock().expect("limiter lock poisoned");
        Self::evict_expired(&mut requests, now, self.window);
        requests.len()
    }

    fn evict_expired(requests: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&oldest) = requests.front() {
            if now.duration_since(oldest) >= window {
                requests.pop_front();
            } else {
                break;
            }
        }
    }
}
