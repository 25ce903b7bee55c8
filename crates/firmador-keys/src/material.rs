#![forbid(unsafe_code)]

//! Extraction of signing material from a PKCS#12 credential bundle.

use base64::Engine;
use der::Decode;
use firmador_core::{CredentialError, Error, Result};
use firmador_crypto::digest;
use num_bigint_dig::BigUint;
use pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use x509_cert::Certificate;

/// Everything the signature templates need from one credential bundle.
///
/// Owned by a single pipeline run and never mutated after extraction.
pub struct SigningMaterial {
    /// RSA private key from the shrouded key bag.
    pub private_key: RsaPrivateKey,
    /// Base64 of the certificate DER, 76-column wrapped (the PEM body that
    /// goes inside `<ds:X509Certificate>`).
    pub certificate_b64: String,
    /// RSA modulus as wrapped Base64 of its big-endian bytes.
    pub modulus_b64: String,
    /// RSA public exponent, same encoding as the modulus.
    pub exponent_b64: String,
    /// Issuer distinguished name, RFC 4514 form.
    pub issuer_name: String,
    /// Certificate serial number.
    pub issuer_serial: BigUint,
    /// Signing time, ISO-8601 with a `Z` suffix.
    pub signing_time: String,
    /// Base64 SHA-1 of the certificate DER, for the XAdES CertDigest.
    pub certificate_digest_b64: String,
}

impl std::fmt::Debug for SigningMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The private key never appears in diagnostics.
        f.debug_struct("SigningMaterial")
            .field("private_key", &"RSA private key (redacted)")
            .field("issuer_name", &self.issuer_name)
            .field("issuer_serial", &self.issuer_serial)
            .field("signing_time", &self.signing_time)
            .finish_non_exhaustive()
    }
}

/// Knobs for credential extraction.
#[derive(Debug, Default, Clone)]
pub struct ExtractOptions {
    /// Override the signing time (ISO-8601). Used to make pipeline output
    /// reproducible in tests; `None` takes the current system time.
    pub signing_time: Option<String>,
}

/// Extract signing material from raw PKCS#12 bytes.
///
/// Fails with [`CredentialError::Malformed`] when the container or the blobs
/// inside it do not parse, [`CredentialError::WrongPassword`] when decryption
/// fails, and [`CredentialError::MissingKeyOrCert`] when a required bag is
/// absent. The password is neither logged nor retained.
pub fn extract(p12: &[u8], password: &str, opts: &ExtractOptions) -> Result<SigningMaterial> {
    let contents = firmador_pkcs12::parse_pkcs12(p12, password)?;

    let key_der = contents
        .private_keys
        .first()
        .ok_or(CredentialError::MissingKeyOrCert("private key bag"))?;
    let cert_der = contents
        .certificates
        .first()
        .ok_or(CredentialError::MissingKeyOrCert("certificate bag"))?;

    let private_key = RsaPrivateKey::from_pkcs8_der(key_der)
        .map_err(|e| CredentialError::Malformed(format!("PKCS#8 private key: {e}")))?;
    let certificate = Certificate::from_der(cert_der)
        .map_err(|e| CredentialError::Malformed(format!("X.509 certificate: {e}")))?;

    let issuer_name = certificate.tbs_certificate.issuer.to_string();
    let issuer_serial =
        BigUint::from_bytes_be(certificate.tbs_certificate.serial_number.as_bytes());

    let engine = base64::engine::general_purpose::STANDARD;
    let certificate_b64 = digest::wrap76(&engine.encode(cert_der));
    let certificate_digest_b64 = digest::sha1_base64(cert_der);

    let modulus_b64 = digest::bigint_to_base64(private_key.n());
    let exponent_b64 = digest::bigint_to_base64(private_key.e());

    let signing_time = match &opts.signing_time {
        Some(t) => t.clone(),
        None => current_time_iso8601()?,
    };

    Ok(SigningMaterial {
        private_key,
        certificate_b64,
        modulus_b64,
        exponent_b64,
        issuer_name,
        issuer_serial,
        signing_time,
        certificate_digest_b64,
    })
}

/// Current system time as `YYYY-MM-DDTHH:MM:SSZ`.
fn current_time_iso8601() -> Result<String> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| Error::Io(std::io::Error::other(format!("system time error: {e}"))))?;
    let dt = der::DateTime::from_unix_duration(now)
        .map_err(|e| Error::Io(std::io::Error::other(format!("time conversion error: {e}"))))?;
    Ok(dt.to_string())
}
