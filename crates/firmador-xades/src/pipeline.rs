#![forbid(unsafe_code)]

//! The signing pipeline.
//!
//! Stages run in dependency order because each digest feeds the next
//! artifact: normalize the document, digest `SignedProperties`, digest
//! `KeyInfo`, digest the document body, render `SignedInfo` over the three
//! digests, RSA-SHA1 sign its canonicalized bytes, assemble the
//! `<ds:Signature>` element and splice it in before the closing root tag.
//!
//! Fragments are digested WITH the `ds`/`etsi` namespace declarations
//! injected, but embedded in the output WITHOUT them; the declarations
//! appear once, on the `ds:Signature` root, which is where a consumer
//! resolves them from.

use base64::Engine;
use firmador_core::{ns, CanonicalizationError, InputError, Result};
use firmador_crypto::{digest, sign};
use firmador_keys::{ExtractOptions, IdentifierBatch, SigningMaterial, DEFAULT_ID_RANGE};
use std::ops::RangeInclusive;
use std::path::Path;

use crate::c14n;
use crate::templates;

/// Inputs for one signing run.
///
/// `xml_path` wins over `xml_string` when both are set; at least one must
/// be, and that is checked before anything is read from disk.
#[derive(Debug)]
pub struct SignParams<'a> {
    /// Path to the PKCS#12 credential bundle.
    pub p12_path: &'a Path,
    /// Import password for the bundle. Never logged, never stored.
    pub password: &'a str,
    /// Local name of the document root element the signature is inserted
    /// into (no angle brackets, no prefix), e.g. `factura`.
    pub root_tag: &'a str,
    /// Document to sign, as a file path. Takes precedence over `xml_string`.
    pub xml_path: Option<&'a Path>,
    /// Document to sign, inline.
    pub xml_string: Option<&'a str>,
}

/// Knobs that make a run reproducible. Defaults give production behavior:
/// OS entropy for identifiers, system clock for the signing time.
#[derive(Debug, Clone)]
pub struct SignOptions {
    /// Seed for the identifier generator. `None` draws from OS entropy.
    pub id_seed: Option<u64>,
    /// Range the eight identifiers are drawn from.
    pub id_range: RangeInclusive<u32>,
    /// Override the signing time (ISO-8601 `Z` form).
    pub signing_time: Option<String>,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            id_seed: None,
            id_range: DEFAULT_ID_RANGE,
            signing_time: None,
        }
    }
}

/// Sign with default options.
pub fn sign(params: &SignParams<'_>) -> Result<String> {
    sign_with_options(params, &SignOptions::default())
}

/// Load the credential and the document, then run [`sign_document`].
pub fn sign_with_options(params: &SignParams<'_>, opts: &SignOptions) -> Result<String> {
    // Input validation happens before any file is touched.
    let xml = match (params.xml_path, params.xml_string) {
        (Some(path), _) => std::fs::read_to_string(path)?,
        (None, Some(s)) => s.to_owned(),
        (None, None) => return Err(InputError::MissingDocument.into()),
    };

    let p12 = std::fs::read(params.p12_path)?;
    let extract_opts = ExtractOptions {
        signing_time: opts.signing_time.clone(),
    };
    let material = firmador_keys::extract(&p12, params.password, &extract_opts)?;

    let ids = match opts.id_seed {
        Some(seed) => IdentifierBatch::from_seed(seed, opts.id_range.clone()),
        None => IdentifierBatch::from_entropy(opts.id_range.clone()),
    };

    sign_document(&material, &ids, &xml, params.root_tag)
}

/// Build the enveloped signature for `xml` and return the signed document.
///
/// Pure except for the RSA operation: same material, identifiers and
/// document always produce the same output, which is what the seed and
/// signing-time overrides exist for.
pub fn sign_document(
    material: &SigningMaterial,
    ids: &IdentifierBatch,
    xml: &str,
    root_tag: &str,
) -> Result<String> {
    let normalized = c14n::normalize_whitespace(xml);
    // The third reference digests the body without the declaration; the
    // output keeps it.
    let body = c14n::strip_xml_declaration(&normalized);

    let closing_tag = format!("</{root_tag}>");
    if !body.contains(&closing_tag) {
        return Err(CanonicalizationError::TagNotFound(closing_tag).into());
    }

    let issuer_serial = material.issuer_serial.to_string();
    let signed_props = templates::signed_properties(&templates::SignedPropertiesParams {
        signature: ids.signature,
        signed_properties: ids.signed_properties,
        reference_id: ids.reference_id,
        signing_time: &material.signing_time,
        certificate_digest_b64: &material.certificate_digest_b64,
        issuer_name: &material.issuer_name,
        issuer_serial: &issuer_serial,
    });
    let signed_props_tagged = c14n::inject_namespace(
        &signed_props,
        ns::tag::SIGNED_PROPERTIES,
        ns::SIGNATURE_NS_DECLS,
    )?;
    let signed_props_digest = digest::sha1_base64(signed_props_tagged.as_bytes());

    let key_info = templates::key_info(&templates::KeyInfoParams {
        certificate: ids.certificate,
        certificate_b64: &material.certificate_b64,
        modulus_b64: &material.modulus_b64,
        exponent_b64: &material.exponent_b64,
    });
    let key_info_tagged =
        c14n::inject_namespace(&key_info, ns::tag::KEY_INFO, ns::SIGNATURE_NS_DECLS)?;
    let key_info_digest = digest::sha1_base64(key_info_tagged.as_bytes());

    let document_digest = digest::sha1_base64(body.as_bytes());

    let signed_info = templates::signed_info(&templates::SignedInfoParams {
        signed_info: ids.signed_info,
        signed_properties_id: ids.signed_properties_id,
        signature: ids.signature,
        signed_properties: ids.signed_properties,
        certificate: ids.certificate,
        reference_id: ids.reference_id,
        signed_properties_digest_b64: &signed_props_digest,
        key_info_digest_b64: &key_info_digest,
        document_digest_b64: &document_digest,
    });
    let signed_info_tagged =
        c14n::inject_namespace(&signed_info, ns::tag::SIGNED_INFO, ns::SIGNATURE_NS_DECLS)?;

    let signed_info_hash = digest::sha1(signed_info_tagged.as_bytes());
    let raw_signature = sign::rsa_sha1_sign(&material.private_key, &signed_info_hash)?;
    let engine = base64::engine::general_purpose::STANDARD;
    let signature_b64 = digest::wrap76(&engine.encode(&raw_signature));

    let signature_value = templates::signature_value(&templates::SignatureValueParams {
        signature_value: ids.signature_value,
        value_b64: &signature_b64,
    });
    let object = templates::object_node(&templates::ObjectParams {
        signature: ids.signature,
        object: ids.object,
        signed_properties: &signed_props,
    });
    let signature = templates::signature(&templates::SignatureParams {
        signature: ids.signature,
        signed_info: &signed_info,
        signature_value: &signature_value,
        key_info: &key_info,
        object: &object,
    });

    Ok(normalized.replacen(&closing_tag, &format!("{signature}{closing_tag}"), 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use firmador_core::Error;
    use num_bigint_dig::BigUint;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rsa::{Pkcs1v15Sign, RsaPrivateKey};
    use rsa::traits::PublicKeyParts;
    use sha1::Sha1;

    const SAMPLE_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <factura id=\"comprobante\" version=\"1.0.0\">\n\
          <infoTributaria>\n    <razonSocial>PRUEBAS   S.A.</razonSocial>\n\
          </infoTributaria>\n</factura>\n";

    fn test_material() -> SigningMaterial {
        let mut rng = StdRng::seed_from_u64(42);
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let engine = base64::engine::general_purpose::STANDARD;

        let fake_cert_der = b"not a real certificate, but stable bytes";
        SigningMaterial {
            certificate_b64: digest::wrap76(&engine.encode(fake_cert_der)),
            certificate_digest_b64: digest::sha1_base64(fake_cert_der),
            modulus_b64: digest::bigint_to_base64(private_key.n()),
            exponent_b64: digest::bigint_to_base64(private_key.e()),
            issuer_name: "CN=Test CA,O=Pruebas & Cia".to_owned(),
            issuer_serial: BigUint::from(987654321u64),
            signing_time: "2024-05-01T12:00:00Z".to_owned(),
            private_key,
        }
    }

    fn test_ids() -> IdentifierBatch {
        IdentifierBatch::from_seed(7, DEFAULT_ID_RANGE)
    }

    fn extract_between<'a>(haystack: &'a str, open: &str, close: &str) -> &'a str {
        let start = haystack.find(open).expect("open tag present");
        let end = haystack.find(close).expect("close tag present") + close.len();
        &haystack[start..end]
    }

    #[test]
    fn test_signed_document_is_well_formed() {
        let signed = sign_document(&test_material(), &test_ids(), SAMPLE_XML, "factura").unwrap();

        assert_eq!(signed.matches("<ds:Signature ").count(), 1);
        assert!(signed.ends_with("</ds:Signature></factura>"));

        let doc = roxmltree::Document::parse(&signed).expect("signed document must parse");
        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "factura");

        let signature = root
            .children()
            .filter(|n| n.is_element())
            .last()
            .expect("root has children");
        assert_eq!(signature.tag_name().name(), "Signature");
        assert_eq!(
            signature.tag_name().namespace(),
            Some("http://www.w3.org/2000/09/xmldsig#")
        );

        let parts: Vec<&str> = signature
            .children()
            .filter(|n| n.is_element())
            .map(|n| n.tag_name().name())
            .collect();
        assert_eq!(parts, ["SignedInfo", "SignatureValue", "KeyInfo", "Object"]);
    }

    #[test]
    fn test_signature_verifies_over_canonical_signed_info() {
        let material = test_material();
        let signed = sign_document(&material, &test_ids(), SAMPLE_XML, "factura").unwrap();

        let signed_info = extract_between(&signed, "<ds:SignedInfo", "</ds:SignedInfo>");
        let tagged =
            c14n::inject_namespace(signed_info, ns::tag::SIGNED_INFO, ns::SIGNATURE_NS_DECLS)
                .unwrap();
        let hash = digest::sha1(tagged.as_bytes());

        let value_node = extract_between(&signed, "<ds:SignatureValue", "</ds:SignatureValue>");
        let value_b64: String = value_node
            [value_node.find('>').unwrap() + 1..value_node.find("</").unwrap()]
            .split_whitespace()
            .collect();
        let engine = base64::engine::general_purpose::STANDARD;
        let raw = engine.decode(value_b64.as_bytes()).unwrap();

        material
            .private_key
            .to_public_key()
            .verify(Pkcs1v15Sign::new::<Sha1>(), &hash, &raw)
            .expect("signature must verify");
    }

    #[test]
    fn test_reference_digests_recompute() {
        let material = test_material();
        let ids = test_ids();
        let signed = sign_document(&material, &ids, SAMPLE_XML, "factura").unwrap();

        // first reference: SignedProperties, with namespaces injected
        let props = extract_between(&signed, "<etsi:SignedProperties", "</etsi:SignedProperties>");
        let tagged =
            c14n::inject_namespace(props, ns::tag::SIGNED_PROPERTIES, ns::SIGNATURE_NS_DECLS)
                .unwrap();
        assert!(signed.contains(&format!(
            "<ds:DigestValue>{}</ds:DigestValue>",
            digest::sha1_base64(tagged.as_bytes())
        )));

        // third reference: the digested body is the output minus the
        // signature element and minus the XML declaration
        let signature = extract_between(&signed, "<ds:Signature ", "</ds:Signature>");
        let without_signature = signed.replacen(signature, "", 1);
        let body = c14n::strip_xml_declaration(&without_signature);
        assert!(signed.contains(&format!(
            "<ds:DigestValue>{}</ds:DigestValue>",
            digest::sha1_base64(body.as_bytes())
        )));
    }

    #[test]
    fn test_output_is_deterministic() {
        let material = test_material();
        let ids = test_ids();
        let a = sign_document(&material, &ids, SAMPLE_XML, "factura").unwrap();
        let b = sign_document(&material, &ids, SAMPLE_XML, "factura").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_body_text_is_normalized_but_preserved() {
        let signed = sign_document(&test_material(), &test_ids(), SAMPLE_XML, "factura").unwrap();
        assert!(signed.contains("<factura id=\"comprobante\""));
        // inner run without a newline collapses to one space
        assert!(signed.contains("<razonSocial>PRUEBAS S.A.</razonSocial>"));
    }

    #[test]
    fn test_output_keeps_xml_declaration() {
        let signed = sign_document(&test_material(), &test_ids(), SAMPLE_XML, "factura").unwrap();
        assert!(
            signed.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"),
            "declaration missing from output: {}",
            &signed[..40.min(signed.len())]
        );
        assert_eq!(signed.matches("<?xml").count(), 1);

        // a document without a declaration gains none
        let bare = sign_document(
            &test_material(),
            &test_ids(),
            "<factura id=\"comprobante\"><x>1</x></factura>",
            "factura",
        )
        .unwrap();
        assert!(bare.starts_with("<factura"));
    }

    #[test]
    fn test_missing_document_rejected_before_any_read() {
        // The credential path does not exist; an I/O error instead of
        // InputError would mean something was read first.
        let params = SignParams {
            p12_path: Path::new("/nonexistent/credential.p12"),
            password: "pw",
            root_tag: "factura",
            xml_path: None,
            xml_string: None,
        };
        let err = sign(&params).unwrap_err();
        assert!(matches!(err, Error::Input(InputError::MissingDocument)));
    }

    #[test]
    fn test_xml_path_takes_precedence_over_xml_string() {
        // With both inputs set the path is read; a missing file must surface
        // as an I/O error rather than being papered over by the inline text.
        let params = SignParams {
            p12_path: Path::new("/nonexistent/credential.p12"),
            password: "pw",
            root_tag: "factura",
            xml_path: Some(Path::new("/nonexistent/document.xml")),
            xml_string: Some(SAMPLE_XML),
        };
        let err = sign(&params).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "got: {err}");
    }

    #[test]
    fn test_sign_with_credential_fixture() {
        let p12_path = Path::new("../../test-data/rsa-2048.p12");
        if !p12_path.exists() {
            eprintln!("skipping test: {p12_path:?} not found");
            return;
        }
        let params = SignParams {
            p12_path,
            password: "secret123",
            root_tag: "factura",
            xml_path: None,
            xml_string: Some(SAMPLE_XML),
        };
        let opts = SignOptions {
            id_seed: Some(7),
            signing_time: Some("2024-05-01T12:00:00Z".to_owned()),
            ..SignOptions::default()
        };

        let signed = sign_with_options(&params, &opts).expect("signing should succeed");
        assert_eq!(signed.matches("<ds:Signature ").count(), 1);
        roxmltree::Document::parse(&signed).expect("signed document must parse");

        // seeded run is fully reproducible
        let again = sign_with_options(&params, &opts).unwrap();
        assert_eq!(signed, again);
    }

    #[test]
    fn test_unknown_root_tag_reported() {
        let err =
            sign_document(&test_material(), &test_ids(), SAMPLE_XML, "notaCredito").unwrap_err();
        match err {
            Error::Canonicalization(CanonicalizationError::TagNotFound(tag)) => {
                assert_eq!(tag, "</notaCredito>");
            }
            other => panic!("expected TagNotFound, got: {other}"),
        }
    }
}
