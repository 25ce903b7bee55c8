#![forbid(unsafe_code)]

//! Core types for the Firmador XAdES-BES signer: the error taxonomy and the
//! algorithm URI / namespace constants shared by every crate in the workspace.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{
    CanonicalizationError, CredentialError, Error, InputError, Result, SigningError,
};
