use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Stand-in for "never" when a delay would overflow the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Enforces a minimum spacing between consecutive calls to a rate-limited service.
///
/// Spacing is measured start-to-start: once `acquire` returns, the next caller
/// cannot get through until `interval` has elapsed. Callers are served one at a
/// time because the lock is held while waiting.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    next_allowed: Mutex<Option<Instant>>,
}

#[derive(Debug, Clone, Copy)]
pub struct PacingPermit {
    pub waited: Duration,
    pub granted_at: Instant,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_allowed: Mutex::new(None),
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn acquire(&self) -> PacingPermit {
        let start = Instant::now();
        let mut next_allowed = self.next_allowed.lock().await;

        if let Some(at) = *next_allowed {
            if at > Instant::now() {
                debug!(
                    "Pacing: waiting {:?} before next call",
                    at.saturating_duration_since(Instant::now())
                );
                sleep_until(at).await;
            }
        }

        let granted_at = Instant::now();
        *next_allowed = Some(deadline_after(granted_at, self.interval));

        PacingPermit {
            waited: granted_at - start,
            granted_at,
        }
    }

    /// Pushes the next permitted call out by at least `delay` from now,
    /// e.g. after the remote side answered 429 with a Retry-After.
    pub async fn defer(&self, delay: Duration) {
        let mut next_allowed = self.next_allowed.lock().await;
        let candidate = deadline_after(Instant::now(), delay);
        match *next_allowed {
            Some(at) if at >= candidate => {}
            _ => *next_allowed = Some(candidate),
        }
    }
}

fn deadline_after(from: Instant, delay: Duration) -> Instant {
    from.checked_add(delay)
        .or_else(|| from.checked_add(FAR_FUTURE))
        .unwrap_or(from)
}
