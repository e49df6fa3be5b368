//! The bcrypt text format: `$<prefix>$<cost>$<salt><digest>`, with salt and
//! digest in bcrypt's own base64 alphabet.

use std::fmt;
use std::str::FromStr;

use crate::error::{BcryptError, BcryptResult};
use crate::types::{Cost, Digest, Prefix, Salt, DIGEST_LEN, SALT_LEN};

// BCrypt's custom base64 alphabet
const BCRYPT_BASE64: &[u8; 64] = b"./ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

const INVALID: u8 = 0xff;

const DECODE_TABLE: [u8; 256] = {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < 64 {
        table[BCRYPT_BASE64[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Encoded length of the 16-byte salt.
pub const ENCODED_SALT_LEN: usize = 22;

/// Encoded length of the 23-byte digest.
pub const ENCODED_DIGEST_LEN: usize = 31;

/// Number of characters needed for `n` bytes, without padding.
pub const fn encoded_len(n: usize) -> usize {
    (n * 4 + 2) / 3
}

pub fn encode_base64(input: &[u8]) -> String {
    let mut output = String::with_capacity(encoded_len(input.len()));

    for chunk in input.chunks(3) {
        let b1 = chunk[0] as u32;
        let b2 = chunk.get(1).map(|&b| b as u32).unwrap_or(0);
        let b3 = chunk.get(2).map(|&b| b as u32).unwrap_or(0);

        let triple = (b1 << 16) | (b2 << 8) | b3;

        output.push(BCRYPT_BASE64[(triple >> 18) as usize] as char);
        output.push(BCRYPT_BASE64[(triple >> 12 & 0x3f) as usize] as char);
        if chunk.len() > 1 {
            output.push(BCRYPT_BASE64[(triple >> 6 & 0x3f) as usize] as char);
        }
        if chunk.len() > 2 {
            output.push(BCRYPT_BASE64[(triple & 0x3f) as usize] as char);
        }
    }

    output
}

/// Decodes exactly `output.len()` bytes from `input`.
///
/// Rejects wrong lengths, characters outside the alphabet, and a final
/// character carrying set bits that no byte uses. Each byte string thus has
/// exactly one accepted encoding.
pub fn decode_base64(input: &[u8], output: &mut [u8]) -> BcryptResult<()> {
    if input.len() != encoded_len(output.len()) {
        return Err(BcryptError::MalformedHash(format!(
            "expected {} base64 characters, found {}",
            encoded_len(output.len()),
            input.len()
        )));
    }

    let mut acc = 0u32;
    let mut bits = 0u32;
    let mut written = 0;

    for &c in input {
        let value = DECODE_TABLE[usize::from(c)];
        if value == INVALID {
            return Err(BcryptError::MalformedHash(format!(
                "invalid base64 byte 0x{:02x}",
                c
            )));
        }

        acc = (acc << 6) | u32::from(value);
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            output[written] = (acc >> bits) as u8;
            written += 1;
            acc &= (1 << bits) - 1;
        }
    }

    if acc != 0 {
        return Err(BcryptError::MalformedHash(
            "non-canonical trailing base64 bits".to_string(),
        ));
    }

    Ok(())
}

fn malformed(msg: &str) -> BcryptError {
    BcryptError::MalformedHash(msg.to_string())
}

/// Splits `$<prefix>$<cost>$<payload>` and validates the header.
fn split_header(s: &str) -> BcryptResult<(Prefix, Cost, &[u8])> {
    let rest = s
        .strip_prefix('$')
        .ok_or_else(|| malformed("missing leading '$'"))?;

    let mut fields = rest.splitn(3, '$');
    let prefix_field = fields.next().unwrap_or_default();
    let cost_field = fields.next().ok_or_else(|| malformed("missing cost field"))?;
    let payload = fields.next().ok_or_else(|| malformed("missing salt field"))?;

    let prefix = prefix_field
        .parse::<Prefix>()
        .map_err(|_| BcryptError::MalformedHash(format!("unrecognized prefix {:?}", prefix_field)))?;

    let cost_bytes = cost_field.as_bytes();
    if cost_bytes.len() != 2 || !cost_bytes.iter().all(u8::is_ascii_digit) {
        return Err(BcryptError::MalformedHash(format!(
            "cost {:?} is not two decimal digits",
            cost_field
        )));
    }
    let cost = u32::from(cost_bytes[0] - b'0') * 10 + u32::from(cost_bytes[1] - b'0');
    let cost = Cost::new(cost).map_err(|e| BcryptError::MalformedHash(e.to_string()))?;

    Ok((prefix, cost, payload.as_bytes()))
}

fn decode_salt(encoded: &[u8]) -> BcryptResult<Salt> {
    let mut bytes = [0u8; SALT_LEN];
    decode_base64(encoded, &mut bytes)?;
    Ok(Salt::from_bytes(bytes))
}

/// A hash setting: everything but the digest, as produced by [`crate::gen_salt`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Setting {
    pub prefix: Prefix,
    pub cost: Cost,
    pub salt: Salt,
}

impl Setting {
    /// Parses either a bare setting (`$2b$12$` + 22 salt characters) or a
    /// complete encoded hash, whose digest is then validated and dropped.
    pub fn decode(s: &str) -> BcryptResult<Self> {
        let (prefix, cost, payload) = split_header(s)?;
        match payload.len() {
            ENCODED_SALT_LEN => Ok(Setting {
                prefix,
                cost,
                salt: decode_salt(payload)?,
            }),
            n if n == ENCODED_SALT_LEN + ENCODED_DIGEST_LEN => HashParts::decode(s).map(|parts| Setting {
                prefix: parts.prefix,
                cost: parts.cost,
                salt: parts.salt,
            }),
            n => Err(BcryptError::MalformedHash(format!(
                "expected {} salt characters or {} characters of salt and digest, found {}",
                ENCODED_SALT_LEN,
                ENCODED_SALT_LEN + ENCODED_DIGEST_LEN,
                n
            ))),
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "${}${}${}",
            self.prefix,
            self.cost,
            encode_base64(self.salt.as_bytes())
        )
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// A fully parsed bcrypt hash.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HashParts {
    pub prefix: Prefix,
    pub cost: Cost,
    pub salt: Salt,
    pub digest: Digest,
}

impl HashParts {
    pub fn encode(&self) -> String {
        let mut output = String::with_capacity(7 + ENCODED_SALT_LEN + ENCODED_DIGEST_LEN);
        output.push('$');
        output.push_str(self.prefix.as_str());
        output.push('$');
        output.push_str(&self.cost.to_string());
        output.push('$');
        output.push_str(&encode_base64(self.salt.as_bytes()));
        output.push_str(&encode_base64(self.digest.as_bytes()));
        output
    }

    pub fn decode(s: &str) -> BcryptResult<Self> {
        let (prefix, cost, payload) = split_header(s)?;
        if payload.len() != ENCODED_SALT_LEN + ENCODED_DIGEST_LEN {
            return Err(BcryptError::MalformedHash(format!(
                "expected {} characters of salt and digest, found {}",
                ENCODED_SALT_LEN + ENCODED_DIGEST_LEN,
                payload.len()
            )));
        }

        let salt = decode_salt(&payload[..ENCODED_SALT_LEN])?;
        let mut digest = [0u8; DIGEST_LEN];
        decode_base64(&payload[ENCODED_SALT_LEN..], &mut digest)?;

        Ok(HashParts {
            prefix,
            cost,
            salt,
            digest: Digest::from_bytes(digest),
        })
    }
}

impl fmt::Display for HashParts {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for HashParts {
    type Err = BcryptError;

    fn from_str(s: &str) -> BcryptResult<Self> {
        HashParts::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "$2a$06$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s.";

    fn assert_malformed(s: &str) {
        match HashParts::decode(s) {
            Err(BcryptError::MalformedHash(_)) => {}
            other => panic!("{:?} should be malformed, got {:?}", s, other),
        }
    }

    #[test]
    fn test_encode_salt() {
        let salt: Vec<u8> = (0u8..16).collect();
        assert_eq!(encode_base64(&salt), "..CA.uOD/eaGAOmJB.yMBu");
        assert_eq!(encode_base64(&[0u8; 23]), ".".repeat(31));
    }

    #[test]
    fn test_decode_salt() -> BcryptResult<()> {
        let mut out = [0u8; 16];
        decode_base64(b"..CA.uOD/eaGAOmJB.yMBu", &mut out)?;
        assert_eq!(out.to_vec(), (0u8..16).collect::<Vec<u8>>());
        Ok(())
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let mut out = [0u8; 16];
        assert!(decode_base64(b"..CA.uOD/eaGAOmJB.yMB", &mut out).is_err());
        assert!(decode_base64(b"..CA.uOD/eaGAOmJB.yMB+", &mut out).is_err());
        assert!(decode_base64(b"..CA.uOD/eaGAOmJB.yMB=", &mut out).is_err());
        // 'v' differs from 'u' only in bits that fall off the end.
        assert!(decode_base64(b"..CA.uOD/eaGAOmJB.yMBv", &mut out).is_err());
    }

    #[test]
    fn test_parse_and_format() -> BcryptResult<()> {
        let parts: HashParts = SAMPLE.parse()?;
        assert_eq!(parts.prefix, Prefix::V2a);
        assert_eq!(parts.cost.get(), 6);
        assert_eq!(parts.to_string(), SAMPLE);
        Ok(())
    }

    #[test]
    fn test_original_prefix_is_shorter() -> BcryptResult<()> {
        let s = "$2$04$..CA.uOD/eaGAOmJB.yMBuLLvAFpOevS3PJDHkYnjWVxMfw9u.DFS";
        let parts = HashParts::decode(s)?;
        assert_eq!(parts.prefix, Prefix::V2);
        assert_eq!(parts.encode(), s);
        assert_eq!(s.len(), 59);
        Ok(())
    }

    #[test]
    fn test_strict_decoding() {
        assert_malformed("");
        assert_malformed("2a$06$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s.");
        assert_malformed("$2c$06$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s.");
        assert_malformed("$2a$6$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s.");
        assert_malformed("$2a$3$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s.");
        assert_malformed("$2a$03$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s.");
        assert_malformed("$2a$32$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s.");
        assert_malformed("$2a$+6$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s.");
        assert_malformed("$2a$06$DCq7YPn5Rq63x1Lad4cll.");
        assert_malformed("$2a$06$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s");
        assert_malformed("$2a$06$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s.=");
        assert_malformed("$2a$06$DCq7YPn5Rq63x1Lad4cll+TV4S6ytwfsfvkgY8jIucDrjc8deX1s.");
        assert_malformed("$2a$06$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1sé");
        assert_malformed("$2a$06");
        assert_malformed("$2a");
    }

    #[test]
    fn test_setting_accepts_salt_or_full_hash() -> BcryptResult<()> {
        let setting = Setting::decode("$2a$06$DCq7YPn5Rq63x1Lad4cll.")?;
        assert_eq!(setting, Setting::decode(SAMPLE)?);
        assert_eq!(setting.encode(), "$2a$06$DCq7YPn5Rq63x1Lad4cll.");
        assert!(Setting::decode("$2a$06$DCq7YPn5Rq63x1Lad4cll").is_err());
        Ok(())
    }

    #[test]
    fn test_setting_length_error_names_both_forms() {
        match Setting::decode("$2b$04$\u{e9}") {
            Err(BcryptError::MalformedHash(msg)) => {
                assert!(msg.contains("22 salt characters"), "{}", msg);
                assert!(msg.contains("53 characters of salt and digest"), "{}", msg);
                assert!(msg.contains("found 2"), "{}", msg);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_byte_reported_in_hex() {
        let mut out = [0u8; 1];
        match decode_base64("\u{e9}".as_bytes(), &mut out) {
            Err(BcryptError::MalformedHash(msg)) => assert_eq!(msg, "invalid base64 byte 0xc3"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
