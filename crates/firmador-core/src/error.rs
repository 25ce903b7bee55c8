#![forbid(unsafe_code)]

//! Errors produced by the Firmador signing pipeline.
//!
//! Each failing stage has its own enum so callers can tell a bad credential
//! apart from a template mismatch or a missing input. The top-level [`Error`]
//! wraps them all and is what the public API returns.

/// Failures while decoding the PKCS#12 credential bundle.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("not a valid PKCS#12 container: {0}")]
    Malformed(String),

    #[error("PKCS#12 decryption failed (wrong password?)")]
    WrongPassword,

    #[error("PKCS#12 container has no {0}")]
    MissingKeyOrCert(&'static str),
}

/// Failures in the caller-supplied inputs, detected before any work starts.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("either an XML path or an XML string must be provided")]
    MissingDocument,
}

/// Failures while normalizing or namespace-tagging an XML fragment.
///
/// A missing tag means the fragment and the template shape disagree, which is
/// a bug in the caller rather than bad user input.
#[derive(Debug, thiserror::Error)]
pub enum CanonicalizationError {
    #[error("tag not found in fragment: {0}")]
    TagNotFound(String),
}

/// Failures in the underlying RSA sign operation.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("RSA signing failed: {0}")]
    Rsa(String),
}

/// Top-level error for the Firmador signing pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("input error: {0}")]
    Input(#[from] InputError),

    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
