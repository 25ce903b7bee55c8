#![forbid(unsafe_code)]

//! SHA-1 digests and the Base64 transcoders used by the signature templates.
//!
//! Digest values in the signature block are the Base64 encoding of the raw
//! 20-byte SHA-1 output, never of its hex spelling. Big integers (RSA modulus
//! and exponent) are encoded as Base64 of their big-endian bytes, zero-padded
//! to a whole number of bytes, and line-wrapped at 76 characters per PEM
//! convention.

use base64::Engine;
use firmador_core::{Error, Result};
use num_bigint_dig::BigUint;
use sha1::{Digest, Sha1};

/// Width of a PEM-convention Base64 line.
pub const PEM_LINE_WIDTH: usize = 76;

/// Raw SHA-1 of `data`.
pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

/// Base64 of the raw SHA-1 of `data`.
pub fn sha1_base64(data: &[u8]) -> String {
    let engine = base64::engine::general_purpose::STANDARD;
    engine.encode(sha1(data))
}

/// Transcode a hex string to Base64 of the bytes it spells.
///
/// Odd-length input is zero-padded on the left first, so `"F"` encodes the
/// single byte `0x0F`. Non-hex input is rejected.
pub fn hex_to_base64(hex: &str) -> Result<String> {
    let padded;
    let hex = if hex.len() % 2 != 0 {
        padded = format!("0{hex}");
        &padded
    } else {
        hex
    };

    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let hi = hex_digit(chunk[0])?;
        let lo = hex_digit(chunk[1])?;
        bytes.push(hi << 4 | lo);
    }

    let engine = base64::engine::general_purpose::STANDARD;
    Ok(engine.encode(bytes))
}

fn hex_digit(b: u8) -> Result<u8> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(Error::Encoding(format!(
            "invalid hex digit: {:?}",
            char::from(b)
        ))),
    }
}

/// Encode a big integer as line-wrapped Base64 of its big-endian bytes.
///
/// The big-endian byte encoding is exactly the even-digit hex spelling of the
/// value, so no separate zero-padding step is needed.
pub fn bigint_to_base64(value: &BigUint) -> String {
    let engine = base64::engine::general_purpose::STANDARD;
    wrap76(&engine.encode(value.to_bytes_be()))
}

/// Wrap `s` into lines of exactly [`PEM_LINE_WIDTH`] characters, the last
/// line carrying the remainder.
pub fn wrap76(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / PEM_LINE_WIDTH + 1);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && i % PEM_LINE_WIDTH == 0 {
            out.push('\n');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha1_known_value() {
        let result = sha1(b"hello");
        let hex: String = result.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(hex, "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    }

    #[test]
    fn test_sha1_base64_deterministic_and_distinct() {
        let a = sha1_base64(b"<a>x</a>");
        let b = sha1_base64(b"<a>x</a>");
        let c = sha1_base64(b"<a>y</a>");
        assert_eq!(a, b);
        assert_ne!(a, c);
        // 20 digest bytes encode to 28 Base64 characters
        assert_eq!(a.len(), 28);
    }

    #[test]
    fn test_hex_to_base64_zero_pads_odd_input() {
        // "F" must become 0x0F before encoding
        assert_eq!(hex_to_base64("F").unwrap(), "Dw==");
        assert_eq!(hex_to_base64("0F").unwrap(), "Dw==");
    }

    #[test]
    fn test_hex_to_base64_rejects_non_hex() {
        let err = hex_to_base64("zz").unwrap_err();
        assert!(matches!(err, Error::Encoding(_)), "got: {err}");
    }

    #[test]
    fn test_bigint_to_base64_small_value() {
        assert_eq!(bigint_to_base64(&BigUint::from(15u8)), "Dw==");
        assert_eq!(bigint_to_base64(&BigUint::from(0u8)), "AA==");
    }

    #[test]
    fn test_bigint_to_base64_wraps_long_values() {
        // 100 bytes encode to 136 Base64 characters: one full 76-char line
        // plus a 60-char remainder
        let value = BigUint::from_bytes_be(&[0xAB; 100]);
        let encoded = bigint_to_base64(&value);
        let lines: Vec<&str> = encoded.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 60);
    }

    #[test]
    fn test_wrap76_exact_multiple() {
        let s = "A".repeat(152);
        let wrapped = wrap76(&s);
        let lines: Vec<&str> = wrapped.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.len() == 76));
    }

    #[test]
    fn test_wrap76_short_input_unchanged() {
        assert_eq!(wrap76("abc"), "abc");
        assert_eq!(wrap76(""), "");
    }
}
