#![forbid(unsafe_code)]

//! XML namespace constants for the signature block.

/// XML Digital Signature namespace.
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// ETSI XAdES qualifying-properties namespace.
pub const ETSI: &str = "http://uri.etsi.org/01903/v1.3.2#";

/// The namespace declarations carried by the `<ds:Signature>` root and
/// injected into each fragment before digesting, so that the digested bytes
/// see the same declarations a verifier would resolve.
pub const SIGNATURE_NS_DECLS: &str = "xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\" \
                                      xmlns:etsi=\"http://uri.etsi.org/01903/v1.3.2#\"";

/// Opening-tag prefixes targeted by namespace injection.
pub mod tag {
    pub const SIGNED_PROPERTIES: &str = "<etsi:SignedProperties";
    pub const KEY_INFO: &str = "<ds:KeyInfo";
    pub const SIGNED_INFO: &str = "<ds:SignedInfo";
}
