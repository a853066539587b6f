//! Group arithmetic contract for the blind accumulator.
//!
//! An accumulator is a flat byte string of `n` fixed-size group elements.
//! Element 1 is the log's base (optionally bound to a name); every later
//! element is derived from one registered private key.

pub mod ristretto;

use common::{Element, Result, SecurityLevel};
use rand_core::{CryptoRng, RngCore};

pub trait GroupMath: Send + Sync {
    /// Encoded size of one group element at `level`.
    fn elem_len(&self, level: SecurityLevel) -> usize;

    /// First accumulator element, deterministically bound to `seed`.
    fn init_bound(&self, level: SecurityLevel, seed: &[u8]) -> Result<Element>;

    /// First accumulator element drawn at random, not bound to anything.
    fn init_unbound<R: RngCore + CryptoRng>(
        &self,
        level: SecurityLevel,
        rng: &mut R,
    ) -> Result<Element>;

    /// New element registering `privkey` into `acc`.
    fn add(&self, level: SecurityLevel, acc: &[u8], privkey: &[u8]) -> Result<Element>;

    /// Proof that `new` extends `old` by exactly one element derived from `privkey`.
    #[allow(clippy::too_many_arguments)]
    fn prv_add<R: RngCore + CryptoRng>(
        &self,
        level: SecurityLevel,
        old: &[u8],
        new: &[u8],
        n_old: usize,
        n_new: usize,
        privkey: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>>;

    fn vfy_add(
        &self,
        level: SecurityLevel,
        proof: &[u8],
        old: &[u8],
        new: &[u8],
        n_old: usize,
        n_new: usize,
    ) -> Result<()>;

    /// Membership public key of a registered `privkey`.
    fn der(&self, level: SecurityLevel, acc: &[u8], privkey: &[u8]) -> Result<Vec<u8>>;

    /// Zero-knowledge proof that the caller holds a registered key deriving
    /// its membership public key, optionally committing to `adata`.
    fn prv_der<R: RngCore + CryptoRng>(
        &self,
        level: SecurityLevel,
        acc: &[u8],
        privkey: &[u8],
        adata: Option<&[u8]>,
        rng: &mut R,
    ) -> Result<Vec<u8>>;

    fn vfy_der(
        &self,
        level: SecurityLevel,
        acc: &[u8],
        pubkey: &[u8],
        adata: Option<&[u8]>,
        proof: &[u8],
    ) -> Result<()>;
}
