//! Blind accumulator cryptography
//!
//! Group arithmetic behind the accumulator log and the certificate-backed
//! signatures that authenticate its growth.
//!
//! ## Components
//! - `GroupMath`: element derivation, addition proofs and membership proofs
//! - `RistrettoGroup`: the Ristretto255 implementation of `GroupMath`
//! - `LogSigner` / `TrustAnchor`: signing and verifying log entries
//! - `name_hash`: level-dependent hash used to bind a log to a name

#[macro_use]
extern crate log;

pub mod accumulator;
pub mod hash;
pub mod keys;
pub mod signature;

pub use accumulator::ristretto::RistrettoGroup;
pub use accumulator::GroupMath;
pub use hash::name_hash;
pub use keys::generate_key;
pub use signature::{Anchor, Certificate, Custodian, Issuer, LogSigner, TrustAnchor};
