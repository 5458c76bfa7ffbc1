use std::fmt;
use std::str::FromStr as _;

use alloy::signers::SignerSync as _;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use k256::elliptic_curve::sec1::ToEncodedPoint as _;
use secrecy::{ExposeSecret as _, SecretString};
use sha2::{Digest as _, Sha256};

use super::packer::RawSignature;
use crate::Result;
use crate::error::Error;
use crate::types::{Address, B256};

/// Produces a raw secp256k1 signature over an already-framed 32-byte digest.
///
/// Local keys implement this directly; hardware wallets and remote signers
/// plug in behind the same seam.
#[async_trait]
pub trait DigestSigner: Send + Sync + fmt::Debug {
    async fn sign_digest(&self, digest: B256) -> Result<RawSignature>;
}

/// An in-process secp256k1 key.
#[derive(Clone)]
pub struct LocalKey {
    signer: PrivateKeySigner,
}

impl LocalKey {
    /// Fresh key from the OS random source.
    #[must_use]
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    pub fn from_secret(secret: &SecretString) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(secret.expose_secret())
            .map_err(|e| Error::validation(format!("invalid private key: {e}")))?;
        Ok(Self { signer })
    }

    pub fn from_bytes(bytes: &B256) -> Result<Self> {
        let signer = PrivateKeySigner::from_bytes(bytes)
            .map_err(|e| Error::validation(format!("invalid private key: {e}")))?;
        Ok(Self { signer })
    }

    /// `sha256` of the 64-byte uncompressed public key.
    #[must_use]
    pub fn fuel_address(&self) -> B256 {
        let point = self
            .signer
            .credential()
            .verifying_key()
            .as_affine()
            .to_encoded_point(false);
        let digest = Sha256::digest(&point.as_bytes()[1..]);
        B256::from(<[u8; 32]>::from(digest))
    }

    #[must_use]
    pub fn evm_address(&self) -> Address {
        self.signer.address()
    }

    pub fn sign_digest_sync(&self, digest: &B256) -> Result<RawSignature> {
        let signature = self.signer.sign_hash_sync(digest)?;
        Ok(RawSignature::new(
            signature.r().to_be_bytes::<32>(),
            signature.s().to_be_bytes::<32>(),
            u8::from(signature.v()),
        ))
    }
}

impl fmt::Debug for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKey")
            .field("evm_address", &self.evm_address())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DigestSigner for LocalKey {
    async fn sign_digest(&self, digest: B256) -> Result<RawSignature> {
        self.sign_digest_sync(&digest)
    }
}
