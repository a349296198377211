//! Per-endpoint-class quota gate.
//!
//! The two upstream services have independent official quotas (pricing near
//! one request every two seconds with no burst tolerance, fees one per
//! second). The gate enforces a minimum interval between grants per class,
//! with an optional burst ceiling inside each interval window. It only ever
//! delays callers; it never rejects.

use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// The two external endpoint classes with independent quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    /// Batch pricing endpoint
    Pricing,
    /// Fee-estimate endpoint
    Fees,
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pricing => write!(f, "pricing"),
            Self::Fees => write!(f, "fees"),
        }
    }
}

/// Quota settings for one endpoint class.
#[derive(Debug, Clone, Copy)]
pub struct EndpointQuota {
    /// Minimum interval between grant windows
    pub min_interval: Duration,
    /// Grants available inside one window; 1 means strict spacing
    pub burst: u32,
}

impl EndpointQuota {
    /// Create quota settings, clamping a zero burst up to 1.
    #[must_use]
    pub fn new(min_interval: Duration, burst: u32) -> Self {
        Self {
            min_interval,
            burst: burst.max(1),
        }
    }
}

#[derive(Debug)]
struct ClassState {
    window_start: Option<Instant>,
    granted_in_window: u32,
}

impl ClassState {
    fn new() -> Self {
        Self {
            window_start: None,
            granted_in_window: 0,
        }
    }
}

/// Token gate enforcing per-class request spacing.
///
/// Each class is guarded by its own async mutex, so concurrent callers for
/// the same class are suspended in FIFO order while one grant is in flight;
/// the two classes never block each other.
#[derive(Debug)]
pub struct QuotaGate {
    pricing_quota: EndpointQuota,
    fees_quota: EndpointQuota,
    pricing: Mutex<ClassState>,
    fees: Mutex<ClassState>,
}

impl QuotaGate {
    /// Create a gate with per-class quota settings.
    #[must_use]
    pub fn new(pricing: EndpointQuota, fees: EndpointQuota) -> Self {
        Self {
            pricing_quota: pricing,
            fees_quota: fees,
            pricing: Mutex::new(ClassState::new()),
            fees: Mutex::new(ClassState::new()),
        }
    }

    /// Quota settings for one class.
    #[must_use]
    pub fn quota(&self, class: EndpointClass) -> EndpointQuota {
        match class {
            EndpointClass::Pricing => self.pricing_quota,
            EndpointClass::Fees => self.fees_quota,
        }
    }

    /// Block until a request for `class` is permitted.
    ///
    /// A request is granted immediately while the current interval window has
    /// burst capacity left; otherwise the caller sleeps until the window
    /// rolls over. The sleep happens while holding the class lock so only one
    /// grant is ever in flight per class.
    pub async fn acquire(&self, class: EndpointClass) {
        let (lock, quota) = match class {
            EndpointClass::Pricing => (&self.pricing, self.pricing_quota),
            EndpointClass::Fees => (&self.fees, self.fees_quota),
        };

        let mut state = lock.lock().await;
        let now = Instant::now();

        match state.window_start {
            Some(start) if now < start + quota.min_interval => {
                if state.granted_in_window < quota.burst {
                    state.granted_in_window += 1;
                } else {
                    let window_end = start + quota.min_interval;
                    tracing::trace!(
                        %class,
                        wait_ms = (window_end - now).as_millis() as u64,
                        "Quota gate suspending caller"
                    );
                    tokio::time::sleep_until(window_end).await;
                    state.window_start = Some(window_end);
                    state.granted_in_window = 1;
                }
            }
            _ => {
                state.window_start = Some(now);
                state.granted_in_window = 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn gate(interval_ms: u64, burst: u32) -> QuotaGate {
        QuotaGate::new(
            EndpointQuota::new(Duration::from_millis(interval_ms), burst),
            EndpointQuota::new(Duration::from_millis(interval_ms), burst),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_grant_spacing_with_unit_burst() {
        let gate = gate(100, 1);
        let mut grants = Vec::new();

        for _ in 0..4 {
            gate.acquire(EndpointClass::Pricing).await;
            grants.push(Instant::now());
        }

        for pair in grants.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(
                gap >= Duration::from_millis(100),
                "grants spaced {gap:?}, expected >= 100ms"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_allows_grants_within_window() {
        let gate = gate(100, 2);
        let started = Instant::now();

        gate.acquire(EndpointClass::Pricing).await;
        gate.acquire(EndpointClass::Pricing).await;
        assert_eq!(Instant::now() - started, Duration::ZERO);

        // Third grant must wait for the window to roll over
        gate.acquire(EndpointClass::Pricing).await;
        assert!(Instant::now() - started >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_classes_do_not_block_each_other() {
        let gate = gate(100, 1);
        let started = Instant::now();

        gate.acquire(EndpointClass::Pricing).await;
        gate.acquire(EndpointClass::Fees).await;

        // Both first grants are immediate despite sharing the gate
        assert_eq!(Instant::now() - started, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_serialized() {
        let gate = Arc::new(gate(50, 1));
        let started = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                gate.acquire(EndpointClass::Fees).await;
                Instant::now()
            }));
        }

        let mut grants = Vec::new();
        for handle in handles {
            grants.push(handle.await.expect("task completes"));
        }
        grants.sort();

        assert!(grants[2] - started >= Duration::from_millis(100));
        for pair in grants.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(50));
        }
    }

    #[test]
    fn test_zero_burst_clamped() {
        let quota = EndpointQuota::new(Duration::from_secs(1), 0);
        assert_eq!(quota.burst, 1);
    }
}
