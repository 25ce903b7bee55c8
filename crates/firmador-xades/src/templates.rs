#![forbid(unsafe_code)]

//! Template functions for the signature-block fragments.
//!
//! Each function renders one XML fragment from a fully-populated parameter
//! struct: deterministic output, no I/O, no failure modes. Supplying the
//! parameters is the pipeline's job; a missing field is a compile error, not
//! a runtime one.
//!
//! The fragment bytes are load-bearing: `SignedProperties`, `KeyInfo` and
//! `SignedInfo` are digested exactly as rendered (after namespace injection),
//! so even whitespace changes here invalidate signatures.

use firmador_core::{algorithm, ns};

/// URI of the document-body reference. The target format requires the
/// document root to carry `id="comprobante"`.
pub const DOCUMENT_REFERENCE_URI: &str = "#comprobante";

/// Fixed description carried by the DataObjectFormat node.
pub const DATA_OBJECT_DESCRIPTION: &str = "contenido comprobante";

pub struct SignedPropertiesParams<'a> {
    pub signature: u32,
    pub signed_properties: u32,
    pub reference_id: u32,
    pub signing_time: &'a str,
    pub certificate_digest_b64: &'a str,
    pub issuer_name: &'a str,
    pub issuer_serial: &'a str,
}

/// Render the XAdES `SignedProperties` fragment: signing time, certificate
/// digest, issuer name/serial and the fixed DataObjectFormat description.
pub fn signed_properties(p: &SignedPropertiesParams<'_>) -> String {
    format!(
        "<etsi:SignedProperties Id=\"Signature{sig}-SignedProperties{sp}\">\
         <etsi:SignedSignatureProperties>\
         <etsi:SigningTime>{time}</etsi:SigningTime>\
         <etsi:SigningCertificate>\
         <etsi:Cert>\
         <etsi:CertDigest>\
         <ds:DigestMethod Algorithm=\"{sha1}\"></ds:DigestMethod>\
         <ds:DigestValue>{cert_digest}</ds:DigestValue>\
         </etsi:CertDigest>\
         <etsi:IssuerSerial>\
         <ds:X509IssuerName>{issuer}</ds:X509IssuerName>\
         <ds:X509SerialNumber>{serial}</ds:X509SerialNumber>\
         </etsi:IssuerSerial>\
         </etsi:Cert>\
         </etsi:SigningCertificate>\
         </etsi:SignedSignatureProperties>\
         <etsi:SignedDataObjectProperties>\
         <etsi:DataObjectFormat ObjectReference=\"#Reference-ID-{refid}\">\
         <etsi:Description>{description}</etsi:Description>\
         <etsi:MimeType>text/xml</etsi:MimeType>\
         </etsi:DataObjectFormat>\
         </etsi:SignedDataObjectProperties>\
         </etsi:SignedProperties>",
        sig = p.signature,
        sp = p.signed_properties,
        time = p.signing_time,
        sha1 = algorithm::SHA1,
        cert_digest = p.certificate_digest_b64,
        issuer = escape_text(p.issuer_name),
        serial = p.issuer_serial,
        refid = p.reference_id,
        description = DATA_OBJECT_DESCRIPTION,
    )
}

pub struct KeyInfoParams<'a> {
    pub certificate: u32,
    pub certificate_b64: &'a str,
    pub modulus_b64: &'a str,
    pub exponent_b64: &'a str,
}

/// Render the `KeyInfo` fragment: certificate plus RSA modulus/exponent.
pub fn key_info(p: &KeyInfoParams<'_>) -> String {
    format!(
        "<ds:KeyInfo Id=\"Certificate{cert}\">\n\
         <ds:X509Data>\n\
         <ds:X509Certificate>\n{certificate}\n</ds:X509Certificate>\n\
         </ds:X509Data>\n\
         <ds:KeyValue>\n\
         <ds:RSAKeyValue>\n\
         <ds:Modulus>\n{modulus}\n</ds:Modulus>\n\
         <ds:Exponent>\n{exponent}</ds:Exponent>\n\
         </ds:RSAKeyValue>\n\
         </ds:KeyValue>\n\
         </ds:KeyInfo>",
        cert = p.certificate,
        certificate = p.certificate_b64,
        modulus = p.modulus_b64,
        exponent = p.exponent_b64,
    )
}

pub struct SignedInfoParams<'a> {
    pub signed_info: u32,
    pub signed_properties_id: u32,
    pub signature: u32,
    pub signed_properties: u32,
    pub certificate: u32,
    pub reference_id: u32,
    pub signed_properties_digest_b64: &'a str,
    pub key_info_digest_b64: &'a str,
    pub document_digest_b64: &'a str,
}

/// Render the `SignedInfo` fragment.
///
/// The three `Reference` entries appear in a fixed order (SignedProperties,
/// KeyInfo, document body) and a consumer recomputes digests against them
/// positionally, so the order must never change.
pub fn signed_info(p: &SignedInfoParams<'_>) -> String {
    format!(
        "<ds:SignedInfo Id=\"Signature-SignedInfo{si}\">\n\
         <ds:CanonicalizationMethod Algorithm=\"{c14n}\"></ds:CanonicalizationMethod>\n\
         <ds:SignatureMethod Algorithm=\"{rsa_sha1}\"></ds:SignatureMethod>\n\
         <ds:Reference Id=\"SignedPropertiesID{spid}\" Type=\"{sp_type}\" \
         URI=\"#Signature{sig}-SignedProperties{sp}\">\n\
         <ds:DigestMethod Algorithm=\"{sha1}\"></ds:DigestMethod>\n\
         <ds:DigestValue>{sp_digest}</ds:DigestValue>\n\
         </ds:Reference>\n\
         <ds:Reference URI=\"#Certificate{cert}\">\n\
         <ds:DigestMethod Algorithm=\"{sha1}\"></ds:DigestMethod>\n\
         <ds:DigestValue>{ki_digest}</ds:DigestValue>\n\
         </ds:Reference>\n\
         <ds:Reference Id=\"Reference-ID-{refid}\" URI=\"{doc_uri}\">\n\
         <ds:Transforms>\n\
         <ds:Transform Algorithm=\"{enveloped}\"></ds:Transform>\n\
         </ds:Transforms>\n\
         <ds:DigestMethod Algorithm=\"{sha1}\"></ds:DigestMethod>\n\
         <ds:DigestValue>{doc_digest}</ds:DigestValue>\n\
         </ds:Reference>\n\
         </ds:SignedInfo>",
        si = p.signed_info,
        c14n = algorithm::C14N,
        rsa_sha1 = algorithm::RSA_SHA1,
        spid = p.signed_properties_id,
        sp_type = algorithm::SIGNED_PROPERTIES_TYPE,
        sig = p.signature,
        sp = p.signed_properties,
        sha1 = algorithm::SHA1,
        sp_digest = p.signed_properties_digest_b64,
        cert = p.certificate,
        ki_digest = p.key_info_digest_b64,
        refid = p.reference_id,
        doc_uri = DOCUMENT_REFERENCE_URI,
        doc_digest = p.document_digest_b64,
        enveloped = algorithm::ENVELOPED_SIGNATURE,
    )
}

pub struct SignatureValueParams<'a> {
    pub signature_value: u32,
    /// Base64 RSA signature, already wrapped at 76 columns.
    pub value_b64: &'a str,
}

/// Render the `SignatureValue` node.
pub fn signature_value(p: &SignatureValueParams<'_>) -> String {
    format!(
        "<ds:SignatureValue Id=\"SignatureValue{id}\">\n{value}\n</ds:SignatureValue>",
        id = p.signature_value,
        value = p.value_b64,
    )
}

pub struct ObjectParams<'a> {
    pub signature: u32,
    pub object: u32,
    /// The SignedProperties fragment, as rendered (without injected
    /// namespaces; the declarations live on the `ds:Signature` root).
    pub signed_properties: &'a str,
}

/// Render the `ds:Object` wrapping the qualifying properties.
pub fn object_node(p: &ObjectParams<'_>) -> String {
    format!(
        "<ds:Object Id=\"Signature{sig}-Object{obj}\">\
         <etsi:QualifyingProperties Target=\"#Signature{sig}\">\
         {signed_properties}\
         </etsi:QualifyingProperties></ds:Object>",
        sig = p.signature,
        obj = p.object,
        signed_properties = p.signed_properties,
    )
}

pub struct SignatureParams<'a> {
    pub signature: u32,
    pub signed_info: &'a str,
    pub signature_value: &'a str,
    pub key_info: &'a str,
    pub object: &'a str,
}

/// Assemble the final `ds:Signature` element. The `ds` and `etsi` namespace
/// declarations appear exactly once, on this root.
pub fn signature(p: &SignatureParams<'_>) -> String {
    format!(
        "<ds:Signature {ns_decls} Id=\"Signature{sig}\">\n\
         {signed_info}\n\
         {signature_value}\n\
         {key_info}\n\
         {object}</ds:Signature>",
        ns_decls = ns::SIGNATURE_NS_DECLS,
        sig = p.signature,
        signed_info = p.signed_info,
        signature_value = p.signature_value,
        key_info = p.key_info,
        object = p.object,
    )
}

/// Escape the characters that would break out of XML text content.
/// Issuer names routinely contain `&` in organization names.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
