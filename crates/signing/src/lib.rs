// SPDX-License-Identifier: Apache-2.0

//! Authenticated target admission: signs and verifies [`ComponentDescriptor`]s so the
//! coordinator only ever dereferences endpoints that came from its own topology source.
//!
//! A [`SignedComponentDescriptor`] binds all descriptor fields under a server-held
//! HMAC-SHA256 key. The server only dereferences descriptors whose signature verifies under
//! its current key.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use profcoord_types::{ComponentDescriptor, SignedComponentDescriptor};
use sha2::Sha256;

/// Error module for the signing crate.
pub mod error;

pub use error::Error;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies component descriptors.
///
/// Implemented by [`HmacSigner`] for production use; tests may substitute any implementation
/// that satisfies the `Sign`/`Verify` contract.
pub trait DescriptorSigner: Send + Sync {
    /// Signs `descriptor`, returning it paired with a fresh signature.
    fn sign(&self, descriptor: ComponentDescriptor) -> SignedComponentDescriptor;

    /// Verifies that `signed` was produced by [`DescriptorSigner::sign`] under this signer's
    /// key and that its fields have not been tampered with since.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSignature`] if the signature does not verify.
    fn verify(&self, signed: &SignedComponentDescriptor) -> Result<(), Error>;
}

/// An HMAC-SHA256 descriptor signer, keyed on a server-held secret.
#[derive(Clone)]
pub struct HmacSigner {
    key: Vec<u8>,
}

impl HmacSigner {
    /// Builds a signer from a raw key. The key is typically loaded from configuration at
    /// startup and never rotated while the process is running.
    #[must_use]
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    fn mac(&self) -> HmacSha256 {
        // A key of any length is valid for HMAC; construction only fails for lengths the
        // underlying digest can't accept a key of, which never happens for `Hmac`.
        #[allow(clippy::unwrap_used)]
        HmacSha256::new_from_slice(&self.key).unwrap()
    }
}

impl DescriptorSigner for HmacSigner {
    fn sign(&self, descriptor: ComponentDescriptor) -> SignedComponentDescriptor {
        let mut mac = self.mac();
        mac.update(&descriptor.canonical_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());
        SignedComponentDescriptor {
            descriptor,
            signature,
        }
    }

    fn verify(&self, signed: &SignedComponentDescriptor) -> Result<(), Error> {
        let expected = BASE64
            .decode(&signed.signature)
            .map_err(|_| Error::InvalidSignature {
                target: signed.descriptor.label(),
            })?;
        let mut mac = self.mac();
        mac.update(&signed.descriptor.canonical_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| Error::InvalidSignature {
                target: signed.descriptor.label(),
            })
    }
}

/// Verifies every descriptor in `targets` against `signer`.
///
/// On the first failure, returns an error whose message contains the literal text
/// `"targets are not valid"`, matching the admission contract: the whole request is rejected,
/// not just the offending target.
///
/// # Errors
/// Returns [`Error::TargetsNotValid`] if any descriptor fails verification.
pub fn verify_targets(
    signer: &dyn DescriptorSigner,
    targets: &[SignedComponentDescriptor],
) -> Result<(), Error> {
    for target in targets {
        if let Err(source) = signer.verify(target) {
            return Err(Error::TargetsNotValid {
                target: target.descriptor.label(),
                source: Box::new(source),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use profcoord_types::ComponentKind;

    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor {
            ip: "10.0.0.1".to_string(),
            port: 4000,
            status_port: 10080,
            kind: ComponentKind::Tidb,
        }
    }

    #[test]
    fn verify_accepts_its_own_signature() {
        let signer = HmacSigner::new(b"test-key".to_vec());
        let signed = signer.sign(descriptor());
        assert!(signer.verify(&signed).is_ok());
    }

    #[test]
    fn verify_rejects_mutated_descriptor() {
        let signer = HmacSigner::new(b"test-key".to_vec());
        let mut signed = signer.sign(descriptor());
        signed.descriptor.port += 1;
        assert!(signer.verify(&signed).is_err());
    }

    #[test]
    fn verify_rejects_literal_invalid_signature() {
        let signer = HmacSigner::new(b"test-key".to_vec());
        let mut signed = signer.sign(descriptor());
        signed.signature = "invalid signature".to_string();
        assert!(signer.verify(&signed).is_err());
    }

    #[test]
    fn verify_rejects_signature_from_a_different_key() {
        let signer = HmacSigner::new(b"key-a".to_vec());
        let other = HmacSigner::new(b"key-b".to_vec());
        let signed = signer.sign(descriptor());
        assert!(other.verify(&signed).is_err());
    }

    #[test]
    fn verify_targets_reports_the_canonical_message() {
        let signer = HmacSigner::new(b"test-key".to_vec());
        let mut signed = signer.sign(descriptor());
        signed.signature = "invalid signature".to_string();
        let err = verify_targets(&signer, &[signed]).unwrap_err();
        assert!(err.to_string().contains("targets are not valid"));
    }

    #[test]
    fn verify_targets_accepts_an_all_valid_batch() {
        let signer = HmacSigner::new(b"test-key".to_vec());
        let a = signer.sign(descriptor());
        let mut b_desc = descriptor();
        b_desc.ip = "10.0.0.2".to_string();
        let b = signer.sign(b_desc);
        assert!(verify_targets(&signer, &[a, b]).is_ok());
    }
}
