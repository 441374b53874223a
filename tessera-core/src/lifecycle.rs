//! The device lifecycle state machine.
//!
//! Orchestrates registration and authentication for a single
//! [`DeviceRecord`]: issues challenges through the crypto capability, stores
//! them via the challenge codec, pre-validates untrusted responses, and
//! enforces the monotonic-counter invariant through [`ReplayGuard`].
//!
//! Per-device state shape, shared by both flows:
//!
//! ```text
//! Idle -> ChallengeIssued -> { Completed | FailedStructural | FailedCrypto }
//! ```
//!
//! Failures leave the pending challenge in place so the same challenge can be
//! retried; only an explicit new `start_*` call abandons it.
//!
//! The engine assumes single-writer access to a record between `start_*` and
//! `complete_*`; concurrent completions for the same device must be
//! serialized by the caller. The counter check races that remain are closed
//! by [`DeviceStore::save_if_counter`] at persistence time.

use std::sync::Arc;

use chrono::Utc;

use crate::codec;
use crate::device::DeviceRecord;
use crate::error::{DeviceError, Result};
use crate::provider::U2fCrypto;
use crate::replay::{CounterRegression, ReplayGuard, SecuritySink, TracingSink};
use crate::store::DeviceStore;
use crate::validator::{validate_response, ResponseKind};

/// User-facing prompt returned when a challenge has been issued.
const TOKEN_PROMPT: &str = "Activate your U2F device";

/// Persistence policy for the registration flow.
///
/// Registration records are not necessarily durable yet, so whether a fresh
/// challenge is saved is an explicit caller decision rather than an implicit
/// inconsistency. Authentication has no such knob: its challenges are always
/// persisted synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationPersistence {
    /// Mutate the record only; the caller persists it.
    Deferred,
    /// Save through the device store before returning.
    Immediate,
}

/// Orchestrates the device lifecycle against injected capabilities.
#[derive(Clone)]
pub struct DeviceLifecycle {
    crypto: Arc<dyn U2fCrypto>,
    store: Arc<dyn DeviceStore>,
    sink: Arc<dyn SecuritySink>,
}

impl DeviceLifecycle {
    /// Create a lifecycle engine. Security events go to the default
    /// [`TracingSink`]; use [`with_sink`](Self::with_sink) to subscribe an
    /// explicit observer.
    pub fn new(crypto: Arc<dyn U2fCrypto>, store: Arc<dyn DeviceStore>) -> Self {
        Self {
            crypto,
            store,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the security signal sink.
    pub fn with_sink(mut self, sink: Arc<dyn SecuritySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Issue a registration challenge for a pending enrollment.
    ///
    /// Fails with [`DeviceError::AlreadyRegistered`] once key material is
    /// populated, and [`DeviceError::MissingAppId`] without an app id. A
    /// repeat call on a still-pending enrollment issues a fresh challenge and
    /// abandons the previous one.
    pub async fn start_registration(
        &self,
        device: &mut DeviceRecord,
        persistence: RegistrationPersistence,
    ) -> Result<&'static str> {
        if !device.key_handle.is_empty() || !device.public_key.is_empty() {
            return Err(DeviceError::AlreadyRegistered);
        }
        if device.app_id.is_empty() {
            return Err(DeviceError::MissingAppId);
        }

        let challenge = self.crypto.start_registration(&device.app_id)?;

        let mut updated = device.clone();
        updated.challenge = Some(codec::encode(&challenge)?);
        if persistence == RegistrationPersistence::Immediate {
            self.store.save(&updated).await?;
        }
        *device = updated;

        tracing::info!(device_id = %device.id, "Registration challenge issued");
        Ok(TOKEN_PROMPT)
    }

    /// Complete registration with the device's response token.
    ///
    /// The token is structurally validated before any cryptographic work;
    /// crypto failures propagate as [`DeviceError::InvalidToken`]. On any
    /// failure the pending challenge is left untouched, so the same
    /// challenge can be retried until an explicit restart.
    pub async fn complete_registration(
        &self,
        device: &mut DeviceRecord,
        token: &str,
        persistence: RegistrationPersistence,
    ) -> Result<()> {
        if !device.key_handle.is_empty() || !device.public_key.is_empty() {
            return Err(DeviceError::AlreadyRegistered);
        }
        let raw_challenge = pending_challenge(device)?;

        validate_response(token, ResponseKind::Registration)?;

        let challenge = codec::decode(&raw_challenge)?;
        let parsed = self
            .crypto
            .complete_registration(&challenge, token)
            .map_err(|e| DeviceError::InvalidToken(e.to_string()))?;
        // parsed.attestation_cert is ignored: attestation validation is the
        // caller's policy, not the engine's.

        let mut updated = device.clone();
        updated.key_handle = parsed.key_handle;
        updated.public_key = parsed.public_key;
        updated.app_id = parsed.app_id;
        updated.challenge = None;
        updated.registered_at = Some(Utc::now());
        if persistence == RegistrationPersistence::Immediate {
            self.store.save(&updated).await?;
        }
        *device = updated;

        tracing::info!(device_id = %device.id, "Device registered");
        Ok(())
    }

    /// Issue an authentication challenge for a registered device.
    ///
    /// Unlike registration, the challenge is always persisted synchronously:
    /// the record is already durable and this is the security-critical path.
    pub async fn start_authentication(&self, device: &mut DeviceRecord) -> Result<&'static str> {
        let registration = device.registration()?;
        let challenge = self.crypto.start_authentication(&registration)?;

        let mut updated = device.clone();
        updated.challenge = Some(codec::encode(&challenge)?);
        self.store.save(&updated).await?;
        *device = updated;

        tracing::info!(device_id = %device.id, "Authentication challenge issued");
        Ok(TOKEN_PROMPT)
    }

    /// Verify an assertion token and advance the device counter.
    ///
    /// Precondition and structural faults are raised; cryptographic
    /// verification failure is downgraded to `Ok(false)` so the return shape
    /// is identical for a wrong signature and a replayed counter - callers
    /// distinguish the reasons only through the security sink. On success
    /// the counter, `last_auth_at` and cleared challenge are committed
    /// all-or-nothing through the store's compare-and-swap.
    pub async fn complete_authentication(
        &self,
        device: &mut DeviceRecord,
        token: &str,
    ) -> Result<bool> {
        if !device.is_registered() {
            return Err(DeviceError::NotRegistered);
        }
        let raw_challenge = pending_challenge(device)?;

        validate_response(token, ResponseKind::Authentication)?;

        let challenge = codec::decode(&raw_challenge)?;
        let registration = device.registration()?;
        let assertion =
            match self
                .crypto
                .verify_authentication(&registration, &challenge, token)
            {
                Ok(assertion) => assertion,
                Err(e) => {
                    tracing::debug!(device_id = %device.id, error = %e, "Assertion rejected");
                    return Ok(false);
                }
            };

        if !ReplayGuard::accept(assertion.counter, device.counter) {
            self.sink.counter_regression(&CounterRegression {
                device_id: device.id,
                key_handle: device.key_handle.clone(),
                challenge: raw_challenge,
                token: token.to_string(),
                received_counter: assertion.counter,
                last_auth_counter: device.counter,
            });
            return Ok(false);
        }

        let mut updated = device.clone();
        updated.counter = assertion.counter;
        updated.last_auth_at = Some(Utc::now());
        updated.challenge = None;
        if !self.store.save_if_counter(&updated, device.counter).await? {
            tracing::warn!(
                device_id = %device.id,
                "Counter advanced concurrently - authentication rejected"
            );
            return Ok(false);
        }
        *device = updated;

        tracing::info!(
            device_id = %device.id,
            counter = device.counter,
            user_present = assertion.user_present,
            "Device authenticated"
        );
        Ok(true)
    }
}

fn pending_challenge(device: &DeviceRecord) -> Result<String> {
    device
        .challenge
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .ok_or(DeviceError::MissingChallenge)
}

impl std::fmt::Debug for DeviceLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLifecycle").finish_non_exhaustive()
    }
}
