#![forbid(unsafe_code)]

//! Digest and signing primitives for the Firmador XAdES-BES signer.
//!
//! The target format fixes SHA-1 and RSA PKCS#1 v1.5 throughout, so unlike a
//! general XML Security library there is no algorithm registry here: just the
//! SHA-1/Base64 transcoders the signature templates need and the one RSA
//! signing operation.

pub mod digest;
pub mod sign;
