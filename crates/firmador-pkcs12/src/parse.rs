#![forbid(unsafe_code)]

//! BER parsing of the PKCS#12 PFX structure (RFC 7292).
//!
//! Uses `yasna::parse_ber` because real-world .p12 files are BER, not strict
//! DER. The walk is: PFX → authSafe ContentInfo → SEQUENCE OF ContentInfo
//! (plain or encrypted) → SafeBags, collecting pkcs8ShroudedKeyBag and
//! certBag payloads. The optional MacData is verified first so a wrong
//! password is reported before any bag is touched.

use firmador_core::{CredentialError, Error};
use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, Tag};

use crate::kdf::{self, MacHash, Prf};
use crate::Pkcs12Contents;

// Content types (PKCS#7)
const OID_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
const OID_ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];

// Bag types (PKCS#12)
const OID_PKCS8_SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
const OID_CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];
const OID_X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];

// Encryption schemes
const OID_PBE_SHA1_3DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 3];
const OID_PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
const OID_PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];
const OID_AES_256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];

// Hash / HMAC
const OID_SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
const OID_SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
const OID_HMAC_SHA1: &[u64] = &[1, 2, 840, 113549, 2, 7];
const OID_HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];

fn oid(components: &[u64]) -> ObjectIdentifier {
    ObjectIdentifier::from_slice(components)
}

fn malformed(what: &str, e: impl std::fmt::Display) -> Error {
    CredentialError::Malformed(format!("{what}: {e}")).into()
}

/// Encryption parameters found on a shrouded key bag or an encryptedData
/// content info.
#[derive(Debug)]
enum PbeScheme {
    Sha1And3Des {
        salt: Vec<u8>,
        iterations: u32,
    },
    Pbes2Aes256 {
        salt: Vec<u8>,
        iterations: u32,
        prf: Prf,
        iv: Vec<u8>,
    },
}

struct MacData {
    hash: MacHash,
    digest: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
}

enum SafeBag {
    ShroudedKey { scheme: PbeScheme, ciphertext: Vec<u8> },
    Certificate { der: Vec<u8> },
    Other,
}

enum ContentInfo {
    Plain(Vec<u8>),
    Encrypted { scheme: PbeScheme, ciphertext: Vec<u8> },
}

/// Parse and decrypt a PFX, collecting private-key and certificate DER.
pub fn parse_pfx(data: &[u8], password: &str) -> Result<Pkcs12Contents, Error> {
    let (auth_safe, mac_data) = yasna::parse_ber(data, |r| {
        r.read_sequence(|r| {
            let version = r.next().read_u32()?;
            if version != 3 {
                return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
            }
            let auth_safe = read_data_content_info(r.next())?;
            let mac_data = r.read_optional(read_mac_data)?;
            Ok((auth_safe, mac_data))
        })
    })
    .map_err(|e| malformed("PFX structure", e))?;

    if let Some(mac) = &mac_data {
        let bmp = kdf::password_to_bmp(password);
        let computed = kdf::container_mac(mac.hash, &bmp, &mac.salt, mac.iterations, &auth_safe);
        if computed != mac.digest {
            return Err(CredentialError::WrongPassword.into());
        }
    }

    let content_infos = yasna::parse_ber(&auth_safe, |r| r.collect_sequence_of(read_content_info))
        .map_err(|e| malformed("authSafe contents", e))?;

    let bmp = kdf::password_to_bmp(password);
    let mut contents = Pkcs12Contents {
        private_keys: Vec::new(),
        certificates: Vec::new(),
    };

    for ci in content_infos {
        let bags_der = match ci {
            ContentInfo::Plain(data) => data,
            ContentInfo::Encrypted { scheme, ciphertext } => {
                decrypt(&scheme, &ciphertext, password, &bmp)?
            }
        };

        let bags = yasna::parse_ber(&bags_der, |r| r.collect_sequence_of(read_safe_bag))
            .map_err(|e| malformed("SafeContents", e))?;

        for bag in bags {
            match bag {
                SafeBag::ShroudedKey { scheme, ciphertext } => {
                    let pkcs8 = decrypt(&scheme, &ciphertext, password, &bmp)?;
                    contents.private_keys.push(pkcs8);
                }
                SafeBag::Certificate { der } => contents.certificates.push(der),
                SafeBag::Other => {}
            }
        }
    }

    Ok(contents)
}

fn decrypt(
    scheme: &PbeScheme,
    ciphertext: &[u8],
    password: &str,
    bmp_password: &[u8],
) -> Result<Vec<u8>, Error> {
    match scheme {
        PbeScheme::Sha1And3Des { salt, iterations } => {
            kdf::decrypt_pbe_3des(ciphertext, bmp_password, salt, *iterations)
        }
        PbeScheme::Pbes2Aes256 {
            salt,
            iterations,
            prf,
            iv,
        } => kdf::decrypt_pbes2_aes256(ciphertext, password, salt, *iterations, iv, *prf),
    }
}

// ── BER readers ────────────────────────────────────────────────────────────

/// ContentInfo whose type must be `data`; returns the OCTET STRING payload.
fn read_data_content_info(r: BERReader) -> Result<Vec<u8>, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        if content_type != oid(OID_DATA) {
            return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
        }
        r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
    })
}

/// A ContentInfo inside the authSafe: either plain `data` or `encryptedData`.
fn read_content_info(r: BERReader) -> Result<ContentInfo, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;

        if content_type == oid(OID_DATA) {
            let data = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
            return Ok(ContentInfo::Plain(data));
        }
        if content_type != oid(OID_ENCRYPTED_DATA) {
            return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
        }

        // [0] EXPLICIT EncryptedData
        r.next().read_tagged(Tag::context(0), |r| {
            r.read_sequence(|r| {
                let _version = r.next().read_u32()?;
                // EncryptedContentInfo
                r.next().read_sequence(|r| {
                    let _inner_type = r.next().read_oid()?;
                    let scheme = read_pbe_scheme(r.next())?;
                    let ciphertext = r
                        .next()
                        .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                    Ok(ContentInfo::Encrypted { scheme, ciphertext })
                })
            })
        })
    })
}

fn read_safe_bag(r: BERReader) -> Result<SafeBag, ASN1Error> {
    r.read_sequence(|r| {
        let bag_type = r.next().read_oid()?;

        let bag = if bag_type == oid(OID_PKCS8_SHROUDED_KEY_BAG) {
            // [0] EXPLICIT EncryptedPrivateKeyInfo
            let (scheme, ciphertext) = r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let scheme = read_pbe_scheme(r.next())?;
                    let ciphertext = r.next().read_bytes()?;
                    Ok((scheme, ciphertext))
                })
            })?;
            SafeBag::ShroudedKey { scheme, ciphertext }
        } else if bag_type == oid(OID_CERT_BAG) {
            // [0] EXPLICIT CertBag, whose payload must be an X.509 cert
            let der = r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let cert_type = r.next().read_oid()?;
                    if cert_type != oid(OID_X509_CERTIFICATE) {
                        return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
                    }
                    r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
                })
            })?;
            SafeBag::Certificate { der }
        } else {
            let _value = r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            SafeBag::Other
        };

        skip_bag_attributes(r)?;
        Ok(bag)
    })
}

/// Read and discard the optional SET of bag attributes (friendlyName,
/// localKeyId and friends).
fn skip_bag_attributes(r: &mut yasna::BERReaderSeq) -> Result<(), ASN1Error> {
    let _attrs = r.read_optional(|r| {
        r.read_set_of(|r| {
            r.read_sequence(|r| {
                let _oid = r.next().read_oid()?;
                r.next().read_set_of(|r| {
                    let _ = r.read_der()?;
                    Ok(())
                })
            })
        })
    })?;
    Ok(())
}

/// AlgorithmIdentifier limited to the two supported encryption schemes.
fn read_pbe_scheme(r: BERReader) -> Result<PbeScheme, ASN1Error> {
    r.read_sequence(|r| {
        let alg = r.next().read_oid()?;

        if alg == oid(OID_PBE_SHA1_3DES) {
            // pkcs-12PbeParams: SEQUENCE { salt OCTET STRING, iterations INTEGER }
            return r.next().read_sequence(|r| {
                let salt = r.next().read_bytes()?;
                let iterations = r.next().read_u32()?;
                Ok(PbeScheme::Sha1And3Des { salt, iterations })
            });
        }
        if alg != oid(OID_PBES2) {
            return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
        }

        // PBES2-params: SEQUENCE { keyDerivationFunc, encryptionScheme }
        r.next().read_sequence(|r| {
            let (salt, iterations, prf) = r.next().read_sequence(|r| {
                let kdf_oid = r.next().read_oid()?;
                if kdf_oid != oid(OID_PBKDF2) {
                    return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
                }
                // PBKDF2-params: SEQUENCE { salt, iterationCount, keyLength?, prf? }
                r.next().read_sequence(|r| {
                    let salt = r.next().read_bytes()?;
                    let iterations = r.next().read_u32()?;
                    let prf = read_optional_prf(r)?;
                    Ok((salt, iterations, prf))
                })
            })?;

            let iv = r.next().read_sequence(|r| {
                let enc_oid = r.next().read_oid()?;
                if enc_oid != oid(OID_AES_256_CBC) {
                    return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
                }
                r.next().read_bytes()
            })?;

            Ok(PbeScheme::Pbes2Aes256 {
                salt,
                iterations,
                prf,
                iv,
            })
        })
    })
}

/// Read the trailing optional fields of PBKDF2-params.
///
/// What remains is either nothing, a keyLength INTEGER, a PRF
/// AlgorithmIdentifier, or keyLength followed by the PRF. The PRF defaults
/// to HMAC-SHA1 per RFC 8018.
fn read_optional_prf(r: &mut yasna::BERReaderSeq) -> Result<Prf, ASN1Error> {
    let mut prf = Prf::HmacSha1;

    if let Some(der) = r.read_optional(|r| r.read_der())? {
        if der.first() == Some(&0x30) {
            prf = parse_prf(&der)?;
        } else if let Some(prf_der) = r.read_optional(|r| r.read_der())? {
            // the first field was keyLength; this one is the PRF
            prf = parse_prf(&prf_der)?;
        }
    }

    Ok(prf)
}

fn parse_prf(der: &[u8]) -> Result<Prf, ASN1Error> {
    yasna::parse_der(der, |r| {
        r.read_sequence(|r| {
            let prf_oid = r.next().read_oid()?;
            let _null = r.read_optional(|r| r.read_null())?;
            if prf_oid == oid(OID_HMAC_SHA256) {
                Ok(Prf::HmacSha256)
            } else if prf_oid == oid(OID_HMAC_SHA1) {
                Ok(Prf::HmacSha1)
            } else {
                Err(ASN1Error::new(ASN1ErrorKind::Invalid))
            }
        })
    })
}

fn read_mac_data(r: BERReader) -> Result<MacData, ASN1Error> {
    r.read_sequence(|r| {
        // DigestInfo: SEQUENCE { digestAlgorithm, digest }
        let (hash, digest) = r.next().read_sequence(|r| {
            let hash = r.next().read_sequence(|r| {
                let hash_oid = r.next().read_oid()?;
                let _null = r.read_optional(|r| r.read_null())?;
                if hash_oid == oid(OID_SHA256) {
                    Ok(MacHash::Sha256)
                } else if hash_oid == oid(OID_SHA1) {
                    Ok(MacHash::Sha1)
                } else {
                    Err(ASN1Error::new(ASN1ErrorKind::Invalid))
                }
            })?;
            let digest = r.next().read_bytes()?;
            Ok((hash, digest))
        })?;

        let salt = r.next().read_bytes()?;
        let iterations = r.read_optional(|r| r.read_u32())?.unwrap_or(1);

        Ok(MacData {
            hash,
            digest,
            salt,
            iterations,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_is_malformed() {
        let err = parse_pfx(&[], "pw").unwrap_err();
        assert!(matches!(
            err,
            Error::Credential(CredentialError::Malformed(_))
        ));
    }

    #[test]
    fn test_truncated_buffer_is_malformed() {
        // A SEQUENCE header promising more bytes than are present
        let err = parse_pfx(&[0x30, 0x82, 0x0F, 0xFF, 0x02, 0x01], "pw").unwrap_err();
        assert!(matches!(
            err,
            Error::Credential(CredentialError::Malformed(_))
        ));
    }

    #[test]
    fn test_wrong_version_is_malformed() {
        // SEQUENCE { INTEGER 2 }: valid BER, wrong PFX version
        let err = parse_pfx(&[0x30, 0x03, 0x02, 0x01, 0x02], "pw").unwrap_err();
        assert!(matches!(
            err,
            Error::Credential(CredentialError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rsa_p12_fixture() {
        let p12_path = std::path::Path::new("../../test-data/rsa-2048.p12");
        if !p12_path.exists() {
            eprintln!("skipping test: {p12_path:?} not found");
            return;
        }
        let data = std::fs::read(p12_path).unwrap();
        let contents = parse_pfx(&data, "secret123").expect("parse_pfx should succeed");

        assert_eq!(contents.private_keys.len(), 1);
        assert!(!contents.certificates.is_empty());
        // PKCS#8 DER starts with a SEQUENCE tag
        assert_eq!(contents.private_keys[0][0], 0x30);
    }

    #[test]
    fn test_parse_legacy_3des_fixture() {
        let p12_path = std::path::Path::new("../../test-data/rsa-2048-3des.p12");
        if !p12_path.exists() {
            eprintln!("skipping test: {p12_path:?} not found");
            return;
        }
        let data = std::fs::read(p12_path).unwrap();
        let contents = parse_pfx(&data, "secret123").expect("parse_pfx should succeed");

        assert_eq!(contents.private_keys.len(), 1);
        assert!(!contents.certificates.is_empty());
    }

    #[test]
    fn test_wrong_password_fails_mac() {
        let p12_path = std::path::Path::new("../../test-data/rsa-2048.p12");
        if !p12_path.exists() {
            return;
        }
        let data = std::fs::read(p12_path).unwrap();
        let err = parse_pfx(&data, "not-the-password").unwrap_err();
        assert!(matches!(
            err,
            Error::Credential(CredentialError::WrongPassword)
        ));
    }
}
