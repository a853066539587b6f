//! Hashing helpers: level-selected name hash, hash-to-group and the
//! Fiat-Shamir transcript used by every proof in this crate.

use common::SecurityLevel;
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Hashes a log name with the function selected by the security level.
pub fn name_hash(name: &[u8], level: SecurityLevel) -> Vec<u8> {
    match level {
        SecurityLevel::L128 => Sha256::digest(name).to_vec(),
        SecurityLevel::L192 => Sha384::digest(name).to_vec(),
        SecurityLevel::L256 => Sha512::digest(name).to_vec(),
    }
}

fn wide_digest(hasher: Sha512) -> [u8; 64] {
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&hasher.finalize());
    wide
}

/// Maps arbitrary bytes to a group element with unknown discrete log.
pub fn hash_to_point(domain: &[u8], level: SecurityLevel, data: &[u8]) -> RistrettoPoint {
    let mut transcript = Transcript::new(domain);
    transcript.append_u64(b"level", u64::from(level.bits()));
    transcript.append(b"data", data);
    RistrettoPoint::from_uniform_bytes(&wide_digest(transcript.hasher))
}

/// Length-prefixed SHA-512 transcript.
pub(crate) struct Transcript {
    hasher: Sha512,
}

impl Transcript {
    pub(crate) fn new(domain: &[u8]) -> Self {
        let mut transcript = Self {
            hasher: Sha512::new(),
        };
        transcript.append(b"domain", domain);
        transcript
    }

    pub(crate) fn append(&mut self, label: &[u8], data: &[u8]) {
        self.hasher.update((label.len() as u64).to_le_bytes());
        self.hasher.update(label);
        self.hasher.update((data.len() as u64).to_le_bytes());
        self.hasher.update(data);
    }

    pub(crate) fn append_u64(&mut self, label: &[u8], value: u64) {
        self.append(label, &value.to_le_bytes());
    }

    /// Absent and empty additional data hash differently.
    pub(crate) fn append_optional(&mut self, label: &[u8], data: Option<&[u8]>) {
        match data {
            Some(bytes) => {
                self.append_u64(label, 1);
                self.append(label, bytes);
            }
            None => self.append_u64(label, 0),
        }
    }

    pub(crate) fn challenge(self) -> Scalar {
        Scalar::from_bytes_mod_order_wide(&wide_digest(self.hasher))
    }
}
