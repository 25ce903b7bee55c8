#![forbid(unsafe_code)]

//! XAdES-BES enveloped signature construction.
//!
//! The pipeline takes a PKCS#12 credential and an XML document, computes the
//! three reference digests in dependency order, signs the canonicalized
//! `SignedInfo` with RSA-SHA1, and inserts the assembled `<ds:Signature>`
//! element immediately before the closing tag of the designated root element.

pub mod c14n;
pub mod pipeline;
pub mod templates;

pub use pipeline::{sign, sign_document, sign_with_options, SignOptions, SignParams};
