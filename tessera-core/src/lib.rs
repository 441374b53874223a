//! Tessera Core - U2F device lifecycle engine
//!
//! This crate implements second-factor device enrollment and authentication
//! for a relying party using a challenge-response hardware-token protocol
//! (FIDO U2F style): unpredictable challenges, verification of registration
//! and assertion responses, and the monotonic-counter anti-cloning check.
//!
//! The underlying elliptic-curve cryptography is NOT implemented here; it is
//! consumed through the [`U2fCrypto`] capability, and persistence through
//! [`DeviceStore`]. Both are trait objects so the engine can run against a
//! real U2F library and a database in production, and against
//! [`MockCrypto`] and [`MemoryStore`] in tests.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tessera_core::{
//!     DeviceLifecycle, DeviceRecord, MemoryStore, MockCrypto, RegistrationPersistence,
//! };
//!
//! # async fn example(token: &str) -> tessera_core::Result<()> {
//! let lifecycle = DeviceLifecycle::new(
//!     Arc::new(MockCrypto::default()),
//!     Arc::new(MemoryStore::new()),
//! );
//!
//! // Enroll a new device for the relying party origin.
//! let mut device = DeviceRecord::new_enrollment("https://example.com");
//! let prompt = lifecycle
//!     .start_registration(&mut device, RegistrationPersistence::Immediate)
//!     .await?;
//!
//! // ...relay `device.challenge` to the token, collect its response...
//! lifecycle
//!     .complete_registration(&mut device, token, RegistrationPersistence::Immediate)
//!     .await?;
//! assert!(device.is_registered());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod device;
pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod replay;
pub mod store;
pub mod validator;

// Re-export main types for convenience
pub use device::{derive_app_id, DeviceRecord, RegistrationInfo};
pub use error::{DeviceError, Result};
pub use lifecycle::{DeviceLifecycle, RegistrationPersistence};
pub use provider::{Assertion, Challenge, MockCrypto, ParsedRegistration, U2fCrypto};
pub use replay::{CounterRegression, ReplayGuard, SecuritySink, TracingSink};
pub use store::{DeviceStore, MemoryStore};
pub use validator::{validate_response, ResponseKind};
