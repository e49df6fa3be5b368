//! Value objects shared by the schedule, the encoder and the public API.
//! Each one is validated when it is built, so the rest of the crate can
//! take them at face value.

use std::fmt;
use std::str::FromStr;

use rand::{CryptoRng, RngCore};
use subtle::{Choice, ConstantTimeEq};

use crate::blowfish::KeyVariant;
use crate::error::{BcryptError, BcryptResult};

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;
pub const DEFAULT_COST: u32 = 12;

/// The number of raw salt bytes.
pub const SALT_LEN: usize = 16;

/// The number of digest bytes kept from the 24-byte ciphertext.
pub const DIGEST_LEN: usize = 23;

/// The maximum number of key bytes bcrypt mixes into its state.
pub const MAX_KEY_LEN: usize = 72;

/// A bcrypt work factor: the base-2 logarithm of the schedule rounds.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Cost(u32);

impl Cost {
    pub fn new(cost: u32) -> BcryptResult<Self> {
        if cost < MIN_COST || cost > MAX_COST {
            return Err(BcryptError::InvalidCost(format!(
                "{} is outside {}..={}",
                cost, MIN_COST, MAX_COST
            )));
        }
        Ok(Cost(cost))
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// `2^cost`, the number of expensive key schedule iterations.
    pub fn rounds(self) -> u64 {
        1u64 << self.0
    }
}

impl Default for Cost {
    fn default() -> Self {
        Cost(DEFAULT_COST)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl TryFrom<u32> for Cost {
    type Error = BcryptError;

    fn try_from(cost: u32) -> BcryptResult<Self> {
        Cost::new(cost)
    }
}

/// The version tag between the first two `$` of an encoded hash.
///
/// * `2`: the original OpenBSD format; the key carries no trailing NUL.
/// * `2a`, `2b`, `2y`: current variants, all computed the same way.
/// * `2x`: hashes produced by crypt_blowfish before its sign-extension fix.
///   Only useful to verify such legacy hashes.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Prefix {
    V2,
    V2a,
    #[default]
    V2b,
    V2x,
    V2y,
}

impl Prefix {
    pub fn as_str(self) -> &'static str {
        match self {
            Prefix::V2 => "2",
            Prefix::V2a => "2a",
            Prefix::V2b => "2b",
            Prefix::V2x => "2x",
            Prefix::V2y => "2y",
        }
    }

    /// How the password is packed into key words for this variant.
    pub fn key_variant(self) -> KeyVariant {
        match self {
            Prefix::V2x => KeyVariant::SignExtended,
            _ => KeyVariant::Standard,
        }
    }

    /// Whether the password key ends with a NUL byte. False only for `$2$`.
    pub fn appends_nul(self) -> bool {
        self != Prefix::V2
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prefix {
    type Err = BcryptError;

    fn from_str(s: &str) -> BcryptResult<Self> {
        match s {
            "2" => Ok(Prefix::V2),
            "2a" => Ok(Prefix::V2a),
            "2b" => Ok(Prefix::V2b),
            "2x" => Ok(Prefix::V2x),
            "2y" => Ok(Prefix::V2y),
            other => Err(BcryptError::UnsupportedPrefix(other.to_string())),
        }
    }
}

/// 16 bytes of salt. A fresh one is drawn for every hash.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Salt(bytes)
    }

    /// Draws a salt from `rng`. A failing source is reported, never replaced.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> BcryptResult<Self> {
        let mut bytes = [0u8; SALT_LEN];
        rng.try_fill_bytes(&mut bytes)?;
        Ok(Salt(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

/// The 23 bytes kept from the final ciphertext.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Digest(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl ConstantTimeEq for Digest {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0[..].ct_eq(&other.0[..])
    }
}
