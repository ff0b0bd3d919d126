//! Verification module: signup with payment proof and the proof review
//! state machine.
//!
//! ```text
//! pending ──approve──▶ approved   (user verified, reward credited)
//!    │
//!    └─────reject───▶ rejected   (nothing credited)
//! ```
//!
//! Both terminal states are final. Resolving a proof that is no longer
//! pending fails with [`VerificationError::AlreadyResolved`] and writes
//! nothing.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{VerificationError, VerificationResult};
pub use manager::{REWARD_AMOUNT, VerificationManager};
pub use models::{
    PaymentProof, PaymentProofView, ProofId, ProofResolution, ProofStatus, ResolveOutcome,
    SignupReceipt, SignupRequest, VerificationStatus,
};
