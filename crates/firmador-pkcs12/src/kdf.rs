#![forbid(unsafe_code)]

//! Key derivation and decryption for PKCS#12 payloads.
//!
//! Two encryption schemes cover the containers seen in practice:
//! the legacy pbeWithSHAAnd3-KeyTripleDES-CBC scheme keyed by the PKCS#12
//! KDF (RFC 7292 Appendix B), and PBES2 with PBKDF2 + AES-256-CBC as emitted
//! by OpenSSL 3.x. Both treat an unpadding failure as a wrong password, since
//! a bad password derives a garbage key and garbage plaintext.

use cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use firmador_core::{CredentialError, Error};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Des3CbcDec = cbc::Decryptor<des::TdesEde3>;

/// PKCS#12 KDF purpose IDs (RFC 7292 Appendix B.3).
#[derive(Debug, Clone, Copy)]
pub enum KdfPurpose {
    Key = 1,
    Iv = 2,
    Mac = 3,
}

/// PRF choice inside PBKDF2 parameters.
#[derive(Debug, Clone, Copy)]
pub enum Prf {
    HmacSha1,
    HmacSha256,
}

/// Hash used for the container MAC.
#[derive(Debug, Clone, Copy)]
pub enum MacHash {
    Sha1,
    Sha256,
}

/// Encode a password as a BMP string (UTF-16BE plus two trailing zero
/// bytes), per RFC 7292. The empty password encodes to nothing.
pub fn password_to_bmp(password: &str) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let mut bmp = Vec::with_capacity(password.len() * 2 + 2);
    for unit in password.encode_utf16() {
        bmp.extend_from_slice(&unit.to_be_bytes());
    }
    bmp.extend_from_slice(&[0, 0]);
    bmp
}

/// PKCS#12 KDF (RFC 7292 Appendix B) with SHA-1 (u = 20, v = 64).
pub fn pkcs12_kdf_sha1(
    purpose: KdfPurpose,
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Vec<u8> {
    pkcs12_kdf::<Sha1>(purpose, bmp_password, salt, iterations, output_len, 20)
}

/// PKCS#12 KDF with SHA-256 (u = 32, v = 64).
pub fn pkcs12_kdf_sha256(
    purpose: KdfPurpose,
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Vec<u8> {
    pkcs12_kdf::<Sha256>(purpose, bmp_password, salt, iterations, output_len, 32)
}

fn pkcs12_kdf<D>(
    purpose: KdfPurpose,
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
    u: usize,
) -> Vec<u8>
where
    D: Digest + sha2::digest::FixedOutputReset,
{
    // Both SHA-1 and SHA-256 have a 64-byte block, so v is fixed.
    const V: usize = 64;

    let d_block = vec![purpose as u8; V];
    let s = repeat_to_multiple(salt, V);
    let p = repeat_to_multiple(bmp_password, V);

    // I = S || P
    let mut i_block = s;
    i_block.extend_from_slice(&p);

    let num_blocks = output_len.div_ceil(u);
    let mut derived = Vec::with_capacity(num_blocks * u);

    for block_idx in 0..num_blocks {
        // A = H^iterations(D || I)
        let mut hasher = D::new();
        Digest::update(&mut hasher, &d_block);
        Digest::update(&mut hasher, &i_block);
        let mut a = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &a);
            a = hasher.finalize_reset();
        }
        derived.extend_from_slice(&a);

        if block_idx + 1 < num_blocks {
            // I_j = (I_j + B + 1) mod 2^(v*8), with B = A repeated to v bytes
            let b = repeat_to_multiple(&a, V);
            for j in 0..(i_block.len() / V) {
                add_with_carry(&mut i_block[j * V..(j + 1) * V], &b);
            }
        }
    }

    derived.truncate(output_len);
    derived
}

/// Repeat `data` until the result length is the next multiple of `v`.
/// Empty input stays empty.
fn repeat_to_multiple(data: &[u8], v: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let len = data.len().div_ceil(v) * v;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let take = (len - out.len()).min(data.len());
        out.extend_from_slice(&data[..take]);
    }
    out
}

/// In-place `block = (block + b + 1) mod 2^(len*8)`, big-endian.
fn add_with_carry(block: &mut [u8], b: &[u8]) {
    let mut carry: u16 = 1;
    for k in (0..block.len()).rev() {
        let sum = block[k] as u16 + b[k] as u16 + carry;
        block[k] = sum as u8;
        carry = sum >> 8;
    }
}

/// Compute the container MAC over `data` with the password-derived key.
pub fn container_mac(
    hash: MacHash,
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
    data: &[u8],
) -> Vec<u8> {
    match hash {
        MacHash::Sha1 => {
            let key = pkcs12_kdf_sha1(KdfPurpose::Mac, bmp_password, salt, iterations, 20);
            let mut mac = Hmac::<Sha1>::new_from_slice(&key).expect("HMAC accepts any key size");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        MacHash::Sha256 => {
            let key = pkcs12_kdf_sha256(KdfPurpose::Mac, bmp_password, salt, iterations, 32);
            let mut mac = Hmac::<Sha256>::new_from_slice(&key).expect("HMAC accepts any key size");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// Decrypt a legacy PBE payload: SHA-1 PKCS#12 KDF + 3DES-CBC.
pub fn decrypt_pbe_3des(
    ciphertext: &[u8],
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Vec<u8>, Error> {
    let key = pkcs12_kdf_sha1(KdfPurpose::Key, bmp_password, salt, iterations, 24);
    let iv = pkcs12_kdf_sha1(KdfPurpose::Iv, bmp_password, salt, iterations, 8);

    let decryptor = Des3CbcDec::new_from_slices(&key, &iv)
        .map_err(|e| CredentialError::Malformed(format!("3DES-CBC parameters: {e}")))?;

    let mut buf = ciphertext.to_vec();
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| CredentialError::WrongPassword)?;
    Ok(plaintext.to_vec())
}

/// Decrypt a PBES2 payload: PBKDF2 (with the given PRF) + AES-256-CBC.
pub fn decrypt_pbes2_aes256(
    ciphertext: &[u8],
    password: &str,
    salt: &[u8],
    iterations: u32,
    iv: &[u8],
    prf: Prf,
) -> Result<Vec<u8>, Error> {
    let mut key = [0u8; 32];
    match prf {
        Prf::HmacSha1 => {
            pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, iterations, &mut key)
        }
        Prf::HmacSha256 => {
            pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key)
        }
    }

    let decryptor = Aes256CbcDec::new_from_slices(&key, iv)
        .map_err(|e| CredentialError::Malformed(format!("AES-256-CBC parameters: {e}")))?;

    let mut buf = ciphertext.to_vec();
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| CredentialError::WrongPassword)?;
    Ok(plaintext.to_vec())
}
