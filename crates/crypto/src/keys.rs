use common::{Result, SecurityLevel};
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroizing;

/// Generates a fresh accumulator private key of `l/4` octets.
pub fn generate_key<R: RngCore + CryptoRng>(
    level: SecurityLevel,
    rng: &mut R,
) -> Result<Zeroizing<Vec<u8>>> {
    let mut key = Zeroizing::new(vec![0u8; level.key_len()]);
    rng.try_fill_bytes(&mut key)
        .map_err(|e| common::BaccError::Resource(format!("random generator failed: {}", e)))?;
    Ok(key)
}
