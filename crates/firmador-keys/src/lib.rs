#![forbid(unsafe_code)]

//! Credential extraction for the Firmador XAdES-BES signer.
//!
//! Turns the raw DER blobs from `firmador-pkcs12` into the [`SigningMaterial`]
//! record the signature templates consume, and generates the batch of random
//! XML identifiers that distinguish the elements of one signature block.

pub mod ids;
pub mod material;

pub use ids::{IdentifierBatch, DEFAULT_ID_RANGE};
pub use material::{extract, ExtractOptions, SigningMaterial};
