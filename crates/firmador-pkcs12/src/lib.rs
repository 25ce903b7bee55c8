#![forbid(unsafe_code)]

//! PKCS#12 (.p12/.pfx) credential container parsing (RFC 7292).
//!
//! This is the raw primitive underneath credential extraction: it decrypts
//! the container and hands back the PKCS#8 private-key and X.509 certificate
//! DER blobs. Interpreting those blobs (RSA key, issuer, serial) happens in
//! `firmador-keys`.
//!
//! Failure mapping: structural BER/ASN.1 problems surface as
//! [`CredentialError::Malformed`]; a MAC mismatch or a padding failure during
//! decryption surfaces as [`CredentialError::WrongPassword`].
//!
//! [`CredentialError::Malformed`]: firmador_core::CredentialError::Malformed
//! [`CredentialError::WrongPassword`]: firmador_core::CredentialError::WrongPassword

mod kdf;
mod parse;

/// DER blobs extracted from a PKCS#12 container.
#[derive(Debug)]
pub struct Pkcs12Contents {
    /// PKCS#8 DER-encoded private keys, in container order.
    pub private_keys: Vec<Vec<u8>>,
    /// DER-encoded X.509 certificates, in container order.
    pub certificates: Vec<Vec<u8>>,
}

/// Parse a PKCS#12 container, decrypting with the given password.
///
/// The password may be empty when the container is unencrypted.
pub fn parse_pkcs12(
    data: &[u8],
    password: &str,
) -> Result<Pkcs12Contents, firmador_core::Error> {
    parse::parse_pfx(data, password)
}
