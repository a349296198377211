//! Retrying caller: the single shield between the engine and the two
//! differently-throttled upstream services.
//!
//! Every external call passes through the quota gate before each attempt;
//! a retry re-acquires, it never bypasses the gate. On a throttling signal
//! the caller sleeps a fixed per-class cooldown (longer than the gate's
//! interval) and retries exactly once; a second failure surfaces to the
//! caller. Non-throttling errors propagate immediately.

use crate::quota::{EndpointClass, QuotaGate};
use flipscope_providers::ProviderError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Wraps external calls with quota gating and bounded retry.
#[derive(Debug, Clone)]
pub struct RetryingCaller {
    gate: Arc<QuotaGate>,
    pricing_cooldown: Duration,
    fees_cooldown: Duration,
}

impl RetryingCaller {
    /// Create a caller over a shared quota gate with per-class cooldowns.
    #[must_use]
    pub fn new(gate: Arc<QuotaGate>, pricing_cooldown: Duration, fees_cooldown: Duration) -> Self {
        Self {
            gate,
            pricing_cooldown,
            fees_cooldown,
        }
    }

    /// The shared quota gate.
    #[must_use]
    pub fn gate(&self) -> &Arc<QuotaGate> {
        &self.gate
    }

    fn cooldown(&self, class: EndpointClass) -> Duration {
        match class {
            EndpointClass::Pricing => self.pricing_cooldown,
            EndpointClass::Fees => self.fees_cooldown,
        }
    }

    /// Run `call` through the quota gate, retrying once on throttling.
    ///
    /// Total attempts are bounded at two, giving a deterministic worst-case
    /// latency per call.
    ///
    /// # Errors
    /// Returns the provider error of the final attempt: the first attempt's
    /// error when it was not a throttling signal, otherwise the retry's.
    pub async fn execute<T, F, Fut>(
        &self,
        class: EndpointClass,
        mut call: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.gate.acquire(class).await;
        match call().await {
            Ok(value) => Ok(value),
            Err(err) if err.is_throttled() => {
                let cooldown = self.cooldown(class);
                tracing::warn!(
                    %class,
                    cooldown_ms = cooldown.as_millis() as u64,
                    "Upstream throttled, cooling down before single retry"
                );
                tokio::time::sleep(cooldown).await;
                self.gate.acquire(class).await;
                call().await
            }
            Err(err) => Err(err),
        }
    }
}
