#![forbid(unsafe_code)]

//! RSA PKCS#1 v1.5 signing over a precomputed SHA-1 digest.

use firmador_core::{Result, SigningError};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::Sha1;

/// Sign a SHA-1 digest with RSA PKCS#1 v1.5.
///
/// `sha1_digest` must be the raw 20-byte SHA-1 of the canonicalized
/// `SignedInfo`; the DigestInfo wrapping happens inside the padding scheme.
pub fn rsa_sha1_sign(key: &RsaPrivateKey, sha1_digest: &[u8]) -> Result<Vec<u8>> {
    key.sign(Pkcs1v15Sign::new::<Sha1>(), sha1_digest)
        .map_err(|e| SigningError::Rsa(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest;
    use rand::SeedableRng;

    #[test]
    fn test_sign_roundtrips_against_verify() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let key = RsaPrivateKey::new(&mut rng, 1024).expect("key generation");
        let public = key.to_public_key();

        let md = digest::sha1(b"<ds:SignedInfo>payload</ds:SignedInfo>");
        let sig = rsa_sha1_sign(&key, &md).expect("signing");
        assert_eq!(sig.len(), 128);

        public
            .verify(Pkcs1v15Sign::new::<Sha1>(), &md, &sig)
            .expect("signature must verify");
    }

    #[test]
    fn test_sign_rejects_wrong_digest_length() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let key = RsaPrivateKey::new(&mut rng, 1024).expect("key generation");

        let err = rsa_sha1_sign(&key, b"short").unwrap_err();
        assert!(matches!(
            err,
            firmador_core::Error::Signing(SigningError::Rsa(_))
        ));
    }
}
