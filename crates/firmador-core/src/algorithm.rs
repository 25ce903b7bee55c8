#![forbid(unsafe_code)]

//! Algorithm URI constants pinned by the target signature format.
//!
//! The receiving side recomputes digests against these exact strings, so none
//! of them is negotiable. Note that the canonicalization URI below is the
//! spelling the format mandates, which is not byte-identical to the W3C REC
//! URI (`REC-xml-c14n-20010315`).

/// Canonicalization method, as spelled by the target format.
pub const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n20010315";

/// RSA with SHA-1, PKCS#1 v1.5.
pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";

/// SHA-1 digest method.
pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";

/// Enveloped signature transform.
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// XAdES object-reference type for the SignedProperties reference.
pub const SIGNED_PROPERTIES_TYPE: &str = "http://uri.etsi.org/01903#SignedProperties";
