#![forbid(unsafe_code)]

//! Firmador — XAdES-BES enveloped XML signatures from a PKCS#12 credential.
//!
//! The facade crate: re-exports the workspace members and the top-level
//! signing entry points. Most callers only need [`sign`] with a
//! [`SignParams`] describing the credential and the document.

pub use firmador_core as core;
pub use firmador_crypto as crypto;
pub use firmador_keys as keys;
pub use firmador_pkcs12 as pkcs12;
pub use firmador_xades as xades;

pub use firmador_core::{Error, Result};
pub use firmador_xades::{sign, sign_document, sign_with_options, SignOptions, SignParams};
