//! Certificate-backed signatures over log entries.
//!
//! An `Issuer` holds the anchor's Ed25519 key and certifies custodians. A
//! `Custodian` signs entries and ships its certificate inside every signature,
//! so a verifier needs nothing but the `Anchor`.

use common::der::{self, DerReader, TAG_OCTET_STRING, TAG_SEQUENCE};
use common::{BaccError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand_core::{CryptoRng, RngCore};

const CERT_DOMAIN: &[u8] = b"bacc/cert/v1";

/// Signs serialized log entries.
pub trait LogSigner {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>>;
}

/// Verifies signatures produced by a `LogSigner` against a trusted root.
pub trait TrustAnchor: Send + Sync {
    fn verify(&self, msg: &[u8], sig: &[u8]) -> Result<()>;
}

fn parse_verifying_key(bytes: &[u8]) -> Result<VerifyingKey> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| BaccError::Format("public key must be 32 octets".to_string()))?;
    VerifyingKey::from_bytes(&arr)
        .map_err(|e| BaccError::Format(format!("invalid public key: {}", e)))
}

fn parse_signature(bytes: &[u8]) -> Result<Signature> {
    let arr: [u8; 64] = bytes
        .try_into()
        .map_err(|_| BaccError::Format("signature must be 64 octets".to_string()))?;
    Ok(Signature::from_bytes(&arr))
}

fn parse_name(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| BaccError::Format("name is not UTF-8".to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub subject: String,
    pub key: VerifyingKey,
    issuer_sig: Signature,
}

impl Certificate {
    /// Bytes covered by the issuer signature.
    fn tbs(subject: &str, key: &VerifyingKey) -> Vec<u8> {
        let mut content = Vec::new();
        der::write_tlv(TAG_OCTET_STRING, CERT_DOMAIN, &mut content);
        der::write_tlv(TAG_OCTET_STRING, subject.as_bytes(), &mut content);
        der::write_tlv(TAG_OCTET_STRING, key.as_bytes(), &mut content);
        der::tlv(TAG_SEQUENCE, &content)
    }

    pub fn to_der(&self) -> Vec<u8> {
        let mut content = Vec::new();
        der::write_tlv(TAG_OCTET_STRING, self.subject.as_bytes(), &mut content);
        der::write_tlv(TAG_OCTET_STRING, self.key.as_bytes(), &mut content);
        der::write_tlv(TAG_OCTET_STRING, &self.issuer_sig.to_bytes(), &mut content);
        der::tlv(TAG_SEQUENCE, &content)
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let mut outer = DerReader::new(bytes);
        let content = outer.read(TAG_SEQUENCE)?;
        outer.finish()?;
        Self::from_content(content)
    }

    fn from_content(content: &[u8]) -> Result<Self> {
        let mut fields = DerReader::new(content);
        let subject = parse_name(fields.read(TAG_OCTET_STRING)?)?;
        let key = parse_verifying_key(fields.read(TAG_OCTET_STRING)?)?;
        let issuer_sig = parse_signature(fields.read(TAG_OCTET_STRING)?)?;
        fields.finish()?;
        Ok(Self {
            subject,
            key,
            issuer_sig,
        })
    }
}

/// Trust anchor: the issuer's name and public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub name: String,
    pub key: VerifyingKey,
}

impl Anchor {
    pub fn to_der(&self) -> Vec<u8> {
        let mut content = Vec::new();
        der::write_tlv(TAG_OCTET_STRING, self.name.as_bytes(), &mut content);
        der::write_tlv(TAG_OCTET_STRING, self.key.as_bytes(), &mut content);
        der::tlv(TAG_SEQUENCE, &content)
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let mut outer = DerReader::new(bytes);
        let mut fields = DerReader::new(outer.read(TAG_SEQUENCE)?);
        outer.finish()?;
        let name = parse_name(fields.read(TAG_OCTET_STRING)?)?;
        let key = parse_verifying_key(fields.read(TAG_OCTET_STRING)?)?;
        fields.finish()?;
        Ok(Self { name, key })
    }

    /// Checks that `cert` was issued by this anchor.
    pub fn check_certificate(&self, cert: &Certificate) -> Result<()> {
        self.key
            .verify_strict(&Certificate::tbs(&cert.subject, &cert.key), &cert.issuer_sig)
            .map_err(|_| {
                BaccError::CertChain(format!(
                    "certificate for '{}' was not issued by '{}'",
                    cert.subject, self.name
                ))
            })
    }
}

impl TrustAnchor for Anchor {
    fn verify(&self, msg: &[u8], sig: &[u8]) -> Result<()> {
        let mut outer = DerReader::new(sig);
        let mut fields = DerReader::new(outer.read(TAG_SEQUENCE)?);
        outer.finish()?;
        let cert = Certificate::from_content(fields.read(TAG_SEQUENCE)?)?;
        let signature = parse_signature(fields.read(TAG_OCTET_STRING)?)?;
        fields.finish()?;

        self.check_certificate(&cert)?;
        cert.key.verify_strict(msg, &signature).map_err(|_| {
            BaccError::Signature(format!("signature by '{}' does not verify", cert.subject))
        })
    }
}

/// Holder of the anchor's private key.
pub struct Issuer {
    name: String,
    signing_key: SigningKey,
}

impl Issuer {
    pub fn generate<R: RngCore + CryptoRng>(name: &str, rng: &mut R) -> Self {
        Self {
            name: name.to_string(),
            signing_key: SigningKey::generate(rng),
        }
    }

    pub fn from_secret(name: &str, secret: &[u8]) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            signing_key: signing_key_from(secret)?,
        })
    }

    pub fn secret(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn anchor(&self) -> Anchor {
        Anchor {
            name: self.name.clone(),
            key: self.signing_key.verifying_key(),
        }
    }

    pub fn certify(&self, subject: &str, key: &VerifyingKey) -> Certificate {
        let issuer_sig = self.signing_key.sign(&Certificate::tbs(subject, key));
        Certificate {
            subject: subject.to_string(),
            key: *key,
            issuer_sig,
        }
    }
}

fn signing_key_from(secret: &[u8]) -> Result<SigningKey> {
    let arr: [u8; 32] = secret
        .try_into()
        .map_err(|_| BaccError::Params("signing key must be 32 octets".to_string()))?;
    Ok(SigningKey::from_bytes(&arr))
}

/// A certified signer that appends entries to a log.
#[derive(Debug)]
pub struct Custodian {
    signing_key: SigningKey,
    cert: Certificate,
}

impl Custodian {
    pub fn new(secret: &[u8], cert: Certificate) -> Result<Self> {
        let signing_key = signing_key_from(secret)?;
        if signing_key.verifying_key() != cert.key {
            return Err(BaccError::Params(
                "signing key does not match the certificate".to_string(),
            ));
        }
        Ok(Self { signing_key, cert })
    }

    /// Generates a key pair and has `issuer` certify it.
    pub fn enroll<R: RngCore + CryptoRng>(issuer: &Issuer, subject: &str, rng: &mut R) -> Self {
        let signing_key = SigningKey::generate(rng);
        let cert = issuer.certify(subject, &signing_key.verifying_key());
        Self { signing_key, cert }
    }

    pub fn secret(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }
}

impl LogSigner for Custodian {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let signature = self.signing_key.sign(msg);
        let mut content = self.cert.to_der();
        der::write_tlv(TAG_OCTET_STRING, &signature.to_bytes(), &mut content);
        Ok(der::tlv(TAG_SEQUENCE, &content))
    }
}
