//! Ristretto255 implementation of the blind accumulator.
//!
//! - Element 1 is a base point `B` (hash-to-group of the log name, or random).
//! - Registering a key `u` appends `Y = u·B`.
//! - The addition proof is a Schnorr proof of knowledge of `log_B Y`, bound to
//!   both snapshots and their lengths.
//! - The membership public key of `u` is `P = u·H` with `H` hashed from the
//!   whole accumulator. The membership proof is a 1-out-of-m OR composition of
//!   Chaum-Pedersen proofs showing `log_B Y_j = log_H P` for some member `j`,
//!   so the verifier learns nothing about which member produced it.

use super::GroupMath;
use crate::hash::{hash_to_point, Transcript};
use common::{BaccError, Element, Result, SecurityLevel};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

const ELEM_LEN: usize = 32;
const SCALAR_LEN: usize = 32;
const ADD_PROOF_LEN: usize = 2 * SCALAR_LEN;

const INIT_DOMAIN: &[u8] = b"bacc/init";
const ADD_DOMAIN: &[u8] = b"bacc/add";
const DER_BASE_DOMAIN: &[u8] = b"bacc/der/base";
const DER_PROOF_DOMAIN: &[u8] = b"bacc/der/proof";

/// Blind accumulator over the Ristretto255 group.
///
/// The group is fixed, so every element is 32 octets and the group offers
/// about 126 bits of security whatever level the log declares. At levels 192
/// and 256 the level changes only the private key length (`l/4` octets), the
/// name hash and the transcript binding; it does not strengthen the group.
///
/// Private keys are reduced modulo the group order. Keys of 48 or 64 octets
/// that differ as byte strings can therefore map to the same scalar, and thus
/// to the same accumulator element.
#[derive(Debug, Clone, Copy, Default)]
pub struct RistrettoGroup;

impl RistrettoGroup {
    pub fn new() -> Self {
        RistrettoGroup
    }
}

fn encode_point(point: &RistrettoPoint) -> Element {
    point.compress().to_bytes().to_vec()
}

fn decode_point(bytes: &[u8]) -> Result<RistrettoPoint> {
    let arr: [u8; ELEM_LEN] = bytes
        .try_into()
        .map_err(|_| BaccError::Format(format!("group element must be {} octets", ELEM_LEN)))?;
    CompressedRistretto(arr)
        .decompress()
        .ok_or_else(|| BaccError::Crypto("invalid group element encoding".to_string()))
}

fn decode_scalar(bytes: &[u8]) -> Result<Scalar> {
    let arr: [u8; SCALAR_LEN] = bytes
        .try_into()
        .map_err(|_| BaccError::Crypto(format!("scalar must be {} octets", SCALAR_LEN)))?;
    Option::<Scalar>::from(Scalar::from_canonical_bytes(arr))
        .ok_or_else(|| BaccError::Crypto("non-canonical scalar in proof".to_string()))
}

/// Interprets an `l/4`-octet private key as a scalar.
fn key_scalar(level: SecurityLevel, privkey: &[u8]) -> Result<Scalar> {
    if privkey.len() != level.key_len() {
        return Err(BaccError::Params(format!(
            "private key must be {} octets at level {}, got {}",
            level.key_len(),
            level,
            privkey.len()
        )));
    }
    let mut wide = [0u8; 64];
    wide[..privkey.len()].copy_from_slice(privkey);
    let scalar = Scalar::from_bytes_mod_order_wide(&wide);
    wide.zeroize();
    if scalar == Scalar::ZERO {
        return Err(BaccError::Params("degenerate private key".to_string()));
    }
    Ok(scalar)
}

fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    let scalar = Scalar::from_bytes_mod_order_wide(&wide);
    wide.zeroize();
    scalar
}

/// Number of elements in a flat accumulator.
fn element_count(acc: &[u8]) -> Result<usize> {
    if acc.is_empty() || acc.len() % ELEM_LEN != 0 {
        return Err(BaccError::Format(format!(
            "accumulator length {} is not a positive multiple of {}",
            acc.len(),
            ELEM_LEN
        )));
    }
    Ok(acc.len() / ELEM_LEN)
}

/// Base point and registered members of an accumulator.
fn split_members(acc: &[u8]) -> Result<(RistrettoPoint, Vec<RistrettoPoint>)> {
    if element_count(acc)? < 2 {
        return Err(BaccError::Params(
            "accumulator has no registered keys".to_string(),
        ));
    }
    let base = decode_point(&acc[..ELEM_LEN])?;
    let members = acc[ELEM_LEN..]
        .chunks(ELEM_LEN)
        .map(decode_point)
        .collect::<Result<Vec<_>>>()?;
    Ok((base, members))
}

/// Returns the appended element when `new` is `old` plus one element.
fn appended_element<'a>(
    old: &[u8],
    new: &'a [u8],
    n_old: usize,
    n_new: usize,
) -> std::result::Result<&'a [u8], String> {
    if n_old == 0 || n_new != n_old + 1 {
        return Err(format!("cannot step from {} to {} elements", n_old, n_new));
    }
    if old.len() != n_old * ELEM_LEN || new.len() != n_new * ELEM_LEN {
        return Err("snapshot length does not match its element count".to_string());
    }
    if new[..old.len()] != *old {
        return Err("snapshot does not extend its predecessor".to_string());
    }
    Ok(&new[old.len()..])
}

fn add_challenge(
    level: SecurityLevel,
    old: &[u8],
    new: &[u8],
    n_old: usize,
    n_new: usize,
    commitment: &RistrettoPoint,
) -> Scalar {
    let mut transcript = Transcript::new(ADD_DOMAIN);
    transcript.append_u64(b"level", u64::from(level.bits()));
    transcript.append_u64(b"n_old", n_old as u64);
    transcript.append_u64(b"n_new", n_new as u64);
    transcript.append(b"old", old);
    transcript.append(b"new", new);
    transcript.append(b"commitment", commitment.compress().as_bytes());
    transcript.challenge()
}

fn der_challenge(
    level: SecurityLevel,
    acc: &[u8],
    pubkey: &RistrettoPoint,
    adata: Option<&[u8]>,
    commitments: &[(RistrettoPoint, RistrettoPoint)],
) -> Scalar {
    let mut transcript = Transcript::new(DER_PROOF_DOMAIN);
    transcript.append_u64(b"level", u64::from(level.bits()));
    transcript.append(b"acc", acc);
    transcript.append(b"pubkey", pubkey.compress().as_bytes());
    transcript.append_optional(b"adata", adata);
    for (a, b) in commitments {
        transcript.append(b"a", a.compress().as_bytes());
        transcript.append(b"b", b.compress().as_bytes());
    }
    transcript.challenge()
}

fn membership_base(level: SecurityLevel, acc: &[u8]) -> RistrettoPoint {
    hash_to_point(DER_BASE_DOMAIN, level, acc)
}

impl GroupMath for RistrettoGroup {
    fn elem_len(&self, _level: SecurityLevel) -> usize {
        ELEM_LEN
    }

    fn init_bound(&self, level: SecurityLevel, seed: &[u8]) -> Result<Element> {
        Ok(encode_point(&hash_to_point(INIT_DOMAIN, level, seed)))
    }

    fn init_unbound<R: RngCore + CryptoRng>(
        &self,
        _level: SecurityLevel,
        rng: &mut R,
    ) -> Result<Element> {
        let mut wide = [0u8; 64];
        rng.try_fill_bytes(&mut wide)
            .map_err(|e| BaccError::Resource(format!("random generator failed: {}", e)))?;
        Ok(encode_point(&RistrettoPoint::from_uniform_bytes(&wide)))
    }

    fn add(&self, level: SecurityLevel, acc: &[u8], privkey: &[u8]) -> Result<Element> {
        element_count(acc)?;
        let base = decode_point(&acc[..ELEM_LEN])?;
        let u = key_scalar(level, privkey)?;
        Ok(encode_point(&(base * u)))
    }

    fn prv_add<R: RngCore + CryptoRng>(
        &self,
        level: SecurityLevel,
        old: &[u8],
        new: &[u8],
        n_old: usize,
        n_new: usize,
        privkey: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>> {
        let appended = appended_element(old, new, n_old, n_new).map_err(BaccError::Params)?;
        let base = decode_point(&old[..ELEM_LEN])?;
        let u = key_scalar(level, privkey)?;
        if encode_point(&(base * u)) != appended {
            return Err(BaccError::Params(
                "private key does not match the appended element".to_string(),
            ));
        }

        let r = random_scalar(rng);
        let commitment = base * r;
        let c = add_challenge(level, old, new, n_old, n_new, &commitment);
        let z = r + c * u;

        let mut proof = Vec::with_capacity(ADD_PROOF_LEN);
        proof.extend_from_slice(c.as_bytes());
        proof.extend_from_slice(z.as_bytes());
        Ok(proof)
    }

    fn vfy_add(
        &self,
        level: SecurityLevel,
        proof: &[u8],
        old: &[u8],
        new: &[u8],
        n_old: usize,
        n_new: usize,
    ) -> Result<()> {
        if proof.len() != ADD_PROOF_LEN {
            return Err(BaccError::Crypto(format!(
                "addition proof must be {} octets, got {}",
                ADD_PROOF_LEN,
                proof.len()
            )));
        }
        let appended = appended_element(old, new, n_old, n_new).map_err(BaccError::Crypto)?;
        let base = decode_point(&new[..ELEM_LEN])?;
        let y = decode_point(appended)?;
        if y == RistrettoPoint::identity() {
            return Err(BaccError::Crypto("appended element is the identity".to_string()));
        }

        let c = decode_scalar(&proof[..SCALAR_LEN])?;
        let z = decode_scalar(&proof[SCALAR_LEN..])?;
        let commitment = base * z - y * c;
        if add_challenge(level, old, new, n_old, n_new, &commitment) != c {
            return Err(BaccError::Crypto("addition proof does not verify".to_string()));
        }
        Ok(())
    }

    fn der(&self, level: SecurityLevel, acc: &[u8], privkey: &[u8]) -> Result<Vec<u8>> {
        let (base, members) = split_members(acc)?;
        let u = key_scalar(level, privkey)?;
        let y = base * u;
        if !members.contains(&y) {
            return Err(BaccError::Params(
                "private key is not registered in the accumulator".to_string(),
            ));
        }
        debug!("deriving membership key among {} members", members.len());
        Ok(encode_point(&(membership_base(level, acc) * u)))
    }

    fn prv_der<R: RngCore + CryptoRng>(
        &self,
        level: SecurityLevel,
        acc: &[u8],
        privkey: &[u8],
        adata: Option<&[u8]>,
        rng: &mut R,
    ) -> Result<Vec<u8>> {
        let (base, members) = split_members(acc)?;
        let u = key_scalar(level, privkey)?;
        let y = base * u;
        let k = members.iter().position(|m| m == &y).ok_or_else(|| {
            BaccError::Params("private key is not registered in the accumulator".to_string())
        })?;
        let h = membership_base(level, acc);
        let pubkey = h * u;

        // Simulated branches for every member except k.
        let mut challenges = vec![Scalar::ZERO; members.len()];
        let mut responses = vec![Scalar::ZERO; members.len()];
        let mut commitments = Vec::with_capacity(members.len());
        let r = random_scalar(rng);
        for (j, member) in members.iter().enumerate() {
            if j == k {
                commitments.push((base * r, h * r));
                continue;
            }
            let c = random_scalar(rng);
            let z = random_scalar(rng);
            commitments.push((base * z - member * c, h * z - pubkey * c));
            challenges[j] = c;
            responses[j] = z;
        }

        let c = der_challenge(level, acc, &pubkey, adata, &commitments);
        let simulated = challenges.iter().fold(Scalar::ZERO, |sum, c| sum + c);
        challenges[k] = c - simulated;
        responses[k] = r + challenges[k] * u;

        let mut proof = Vec::with_capacity(members.len() * 2 * SCALAR_LEN);
        for (c, z) in challenges.iter().zip(&responses) {
            proof.extend_from_slice(c.as_bytes());
            proof.extend_from_slice(z.as_bytes());
        }
        Ok(proof)
    }

    fn vfy_der(
        &self,
        level: SecurityLevel,
        acc: &[u8],
        pubkey: &[u8],
        adata: Option<&[u8]>,
        proof: &[u8],
    ) -> Result<()> {
        let (base, members) = split_members(acc)?;
        if proof.len() != members.len() * 2 * SCALAR_LEN {
            return Err(BaccError::Crypto(format!(
                "membership proof has {} octets, expected {}",
                proof.len(),
                members.len() * 2 * SCALAR_LEN
            )));
        }
        let p = decode_point(pubkey)?;
        if p == RistrettoPoint::identity() {
            return Err(BaccError::Crypto("membership key is the identity".to_string()));
        }
        let h = membership_base(level, acc);

        let mut total = Scalar::ZERO;
        let mut commitments = Vec::with_capacity(members.len());
        for (member, pair) in members.iter().zip(proof.chunks(2 * SCALAR_LEN)) {
            let c = decode_scalar(&pair[..SCALAR_LEN])?;
            let z = decode_scalar(&pair[SCALAR_LEN..])?;
            commitments.push((base * z - member * c, h * z - p * c));
            total += c;
        }

        if der_challenge(level, acc, &p, adata, &commitments) != total {
            return Err(BaccError::Crypto("membership proof does not verify".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const LEVEL: SecurityLevel = SecurityLevel::L128;

    fn key(byte: u8) -> Vec<u8> {
        vec![byte; LEVEL.key_len()]
    }

    /// Builds an accumulator holding `keys`, checking every addition proof.
    fn build(keys: &[Vec<u8>], rng: &mut ChaCha20Rng) -> Vec<u8> {
        let group = RistrettoGroup::new();
        let mut acc = group.init_bound(LEVEL, b"test-log").unwrap();
        for (i, k) in keys.iter().enumerate() {
            let n_old = i + 1;
            let mut next = acc.clone();
            next.extend(group.add(LEVEL, &acc, k).unwrap());
            let proof = group
                .prv_add(LEVEL, &acc, &next, n_old, n_old + 1, k, rng)
                .unwrap();
            group
                .vfy_add(LEVEL, &proof, &acc, &next, n_old, n_old + 1)
                .unwrap();
            acc = next;
        }
        acc
    }

    #[test]
    fn test_bound_init_is_deterministic() {
        let group = RistrettoGroup::new();
        let a = group.init_bound(LEVEL, b"Alice").unwrap();
        assert_eq!(a, group.init_bound(LEVEL, b"Alice").unwrap());
        assert_ne!(a, group.init_bound(LEVEL, b"Bob").unwrap());
        assert_eq!(a.len(), group.elem_len(LEVEL));

        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let b = group.init_unbound(LEVEL, &mut rng).unwrap();
        assert_ne!(b, group.init_unbound(LEVEL, &mut rng).unwrap());
    }

    #[test]
    fn test_element_size_fixed_across_levels() {
        let group = RistrettoGroup::new();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        for level in SecurityLevel::ALL {
            assert_eq!(group.elem_len(level), 32);
            let acc = group.init_unbound(level, &mut rng).unwrap();
            assert_eq!(acc.len(), 32);
            let y = group.add(level, &acc, &vec![3u8; level.key_len()]).unwrap();
            assert_eq!(y.len(), 32);
        }
    }

    #[test]
    fn test_long_keys_reduce_modulo_group_order() {
        let group = RistrettoGroup::new();
        let level = SecurityLevel::L256;
        let acc = group.init_bound(level, b"registry").unwrap();

        // 1 and 1 + group order, little-endian in 64 octets
        let mut one = vec![0u8; 64];
        one[0] = 1;
        let mut wrapped = vec![0u8; 64];
        wrapped[..16].copy_from_slice(&[
            0xee, 0xd3, 0xf5, 0x5c, 0x1a, 0x63, 0x12, 0x58, 0xd6, 0x9c, 0xf7, 0xa2, 0xde, 0xf9,
            0xde, 0x14,
        ]);
        wrapped[31] = 0x10;

        assert_ne!(one, wrapped);
        assert_eq!(
            group.add(level, &acc, &one).unwrap(),
            group.add(level, &acc, &wrapped).unwrap()
        );
    }

    #[test]
    fn test_add_rejects_wrong_key_length() {
        let group = RistrettoGroup::new();
        let acc = group.init_bound(LEVEL, b"x").unwrap();
        let err = group.add(LEVEL, &acc, &[1u8; 31]).unwrap_err();
        assert!(matches!(err, BaccError::Params(_)));
        // 48-octet keys are valid at level 192 only
        assert!(group.add(SecurityLevel::L192, &acc, &[1u8; 48]).is_ok());
        assert!(group.add(LEVEL, &acc, &[0u8; 32]).is_err());
    }

    #[test]
    fn test_addition_proof_binds_context() {
        let group = RistrettoGroup::new();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let acc = group.init_bound(LEVEL, b"ctx").unwrap();
        let mut next = acc.clone();
        next.extend(group.add(LEVEL, &acc, &key(7)).unwrap());
        let proof = group.prv_add(LEVEL, &acc, &next, 1, 2, &key(7), &mut rng).unwrap();

        assert!(group.vfy_add(LEVEL, &proof, &acc, &next, 1, 2).is_ok());
        assert!(group.vfy_add(SecurityLevel::L192, &proof, &acc, &next, 1, 2).is_err());

        let mut tampered = proof.clone();
        tampered[40] ^= 1;
        assert!(matches!(
            group.vfy_add(LEVEL, &tampered, &acc, &next, 1, 2),
            Err(BaccError::Crypto(_))
        ));

        let other = group.init_bound(LEVEL, b"other").unwrap();
        assert!(group.vfy_add(LEVEL, &proof, &other, &next, 1, 2).is_err());
    }

    #[test]
    fn test_prv_add_requires_matching_key() {
        let group = RistrettoGroup::new();
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let acc = group.init_bound(LEVEL, b"k").unwrap();
        let mut next = acc.clone();
        next.extend(group.add(LEVEL, &acc, &key(1)).unwrap());
        let err = group
            .prv_add(LEVEL, &acc, &next, 1, 2, &key(2), &mut rng)
            .unwrap_err();
        assert!(matches!(err, BaccError::Params(_)));
    }

    #[test]
    fn test_membership_completeness_at_every_position() {
        let group = RistrettoGroup::new();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let keys: Vec<_> = (1..=4).map(key).collect();
        let acc = build(&keys, &mut rng);

        for k in &keys {
            let pubkey = group.der(LEVEL, &acc, k).unwrap();
            let proof = group.prv_der(LEVEL, &acc, k, None, &mut rng).unwrap();
            group.vfy_der(LEVEL, &acc, &pubkey, None, &proof).unwrap();
        }
    }

    #[test]
    fn test_membership_soundness() {
        let group = RistrettoGroup::new();
        let mut rng = ChaCha20Rng::seed_from_u64(12);
        let acc = build(&[key(1), key(2)], &mut rng);

        // unregistered key
        let stranger = key(9);
        assert!(matches!(
            group.der(LEVEL, &acc, &stranger),
            Err(BaccError::Params(_))
        ));
        assert!(group.prv_der(LEVEL, &acc, &stranger, None, &mut rng).is_err());

        // a member's proof does not transfer to another member's pubkey
        let pub_b = group.der(LEVEL, &acc, &key(2)).unwrap();
        let proof_a = group.prv_der(LEVEL, &acc, &key(1), None, &mut rng).unwrap();
        assert!(group.vfy_der(LEVEL, &acc, &pub_b, None, &proof_a).is_err());
    }

    #[test]
    fn test_membership_adata_binding() {
        let group = RistrettoGroup::new();
        let mut rng = ChaCha20Rng::seed_from_u64(13);
        let acc = build(&[key(1), key(2), key(3)], &mut rng);
        let pubkey = group.der(LEVEL, &acc, &key(3)).unwrap();
        let proof = group
            .prv_der(LEVEL, &acc, &key(3), Some(b"message A"), &mut rng)
            .unwrap();

        assert!(group.vfy_der(LEVEL, &acc, &pubkey, Some(b"message A"), &proof).is_ok());
        assert!(matches!(
            group.vfy_der(LEVEL, &acc, &pubkey, Some(b"message B"), &proof),
            Err(BaccError::Crypto(_))
        ));
        assert!(group.vfy_der(LEVEL, &acc, &pubkey, None, &proof).is_err());
    }

    #[test]
    fn test_membership_key_depends_on_snapshot() {
        let group = RistrettoGroup::new();
        let mut rng = ChaCha20Rng::seed_from_u64(14);
        let small = build(&[key(1)], &mut rng);
        let large = build(&[key(1), key(2)], &mut rng);
        assert_ne!(
            group.der(LEVEL, &small, &key(1)).unwrap(),
            group.der(LEVEL, &large, &key(1)).unwrap()
        );
        assert!(group.der(LEVEL, &small[..ELEM_LEN], &key(1)).is_err());
    }
}
