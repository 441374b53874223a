//! Counter-monotonicity enforcement and the security signal it raises.
//!
//! U2F devices report a non-volatile usage counter with every assertion. A
//! verified response whose counter has not advanced past the stored value is
//! rejected and reported: it could indicate the device has been cloned.

use uuid::Uuid;

/// Enforces the strictly-increasing counter invariant.
pub struct ReplayGuard;

impl ReplayGuard {
    /// Accept a verified response iff its counter is strictly greater than
    /// the last stored counter.
    pub fn accept(received_counter: u32, stored_counter: u32) -> bool {
        received_counter > stored_counter
    }
}

/// Everything an operator needs to investigate a rejected counter.
#[derive(Debug, Clone)]
pub struct CounterRegression {
    /// Storage id of the device that failed the check.
    pub device_id: Uuid,
    /// Key handle of the device.
    pub key_handle: String,
    /// The challenge that was outstanding when the response arrived.
    pub challenge: String,
    /// The raw response token as received from the client.
    pub token: String,
    /// Counter reported by the (possibly cloned) device.
    pub received_counter: u32,
    /// Counter recorded at the last successful authentication.
    pub last_auth_counter: u32,
}

/// Observer for security events raised by the lifecycle engine.
///
/// Replaces a process-wide signal registry with an explicit capability: the
/// sink is handed to [`DeviceLifecycle`](crate::DeviceLifecycle) at
/// construction. Sinks are advisory and must never block the caller.
pub trait SecuritySink: Send + Sync {
    /// A verified response reported a counter at or below the stored value.
    fn counter_regression(&self, event: &CounterRegression);
}

/// Default sink: structured warning through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl SecuritySink for TracingSink {
    fn counter_regression(&self, event: &CounterRegression) {
        tracing::warn!(
            device_id = %event.device_id,
            key_handle = %event.key_handle,
            received_counter = event.received_counter,
            last_auth_counter = event.last_auth_counter,
            "Authentication counter did not advance - device may be cloned"
        );
    }
}
