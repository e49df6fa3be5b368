use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;

use crate::encoding::{HashParts, Setting};
use crate::error::{BcryptError, BcryptResult};
use crate::schedule::{eks_setup, prepare_key};
use crate::types::{Cost, Digest, Prefix, Salt, DIGEST_LEN};

// "OrpheanBeholderScryDoubt" as big-endian words
const MAGIC: [u32; 6] = [
    0x4f727068, 0x65616e42, 0x65686f6c, 0x64657253, 0x63727944, 0x6f756274,
];

const MAGIC_ROUNDS: usize = 64;

/// A validated cost/prefix pair for producing new hashes.
///
/// Verification never consults this: [`verify`] always uses the cost and
/// prefix stored in the hash being checked.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BCrypt {
    cost: Cost,
    prefix: Prefix,
}

impl BCrypt {
    pub fn new(cost: u32, prefix: Prefix) -> BcryptResult<Self> {
        Ok(BCrypt {
            cost: Cost::new(cost)?,
            prefix,
        })
    }

    pub fn cost(&self) -> Cost {
        self.cost
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    pub fn hash(&self, password: &[u8]) -> BcryptResult<String> {
        self.hash_with_rng(password, &mut OsRng)
    }

    pub fn hash_with_rng<R: RngCore + CryptoRng>(
        &self,
        password: &[u8],
        rng: &mut R,
    ) -> BcryptResult<String> {
        let salt = Salt::generate(rng)?;
        Ok(hash_with_salt(password, self.cost, self.prefix, salt)?.encode())
    }
}

/// The raw bcrypt function: 23 digest bytes for a password, salt and cost.
pub fn raw_bcrypt(password: &[u8], salt: &Salt, cost: Cost, prefix: Prefix) -> BcryptResult<Digest> {
    let key = prepare_key(password, prefix);
    let state = eks_setup(&key, salt, cost, prefix)?;

    let mut ctext = MAGIC;
    for _ in 0..MAGIC_ROUNDS {
        for i in (0..ctext.len()).step_by(2) {
            let (l, r) = state.encrypt_block(ctext[i], ctext[i + 1]);
            ctext[i] = l;
            ctext[i + 1] = r;
        }
    }

    let mut full = [0u8; 24];
    for (chunk, word) in full.chunks_exact_mut(4).zip(ctext.iter()) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&full[..DIGEST_LEN]);

    Ok(Digest::from_bytes(digest))
}

/// Hashes `password` with a caller-chosen salt. Deterministic.
pub fn hash_with_salt(password: &[u8], cost: Cost, prefix: Prefix, salt: Salt) -> BcryptResult<HashParts> {
    let digest = raw_bcrypt(password, &salt, cost, prefix)?;
    Ok(HashParts {
        prefix,
        cost,
        salt,
        digest,
    })
}

/// Hashes `password` under a fresh salt from the operating system.
///
/// Only the first 72 bytes of the password count, the NUL terminator
/// included, so passwords sharing their first 72 bytes hash alike.
pub fn hash(password: &[u8], cost: u32, prefix: Prefix) -> BcryptResult<String> {
    hash_with_rng(password, cost, prefix, &mut OsRng)
}

/// [`hash`] with an explicit random source.
pub fn hash_with_rng<R: RngCore + CryptoRng>(
    password: &[u8],
    cost: u32,
    prefix: Prefix,
    rng: &mut R,
) -> BcryptResult<String> {
    BCrypt::new(cost, prefix)?.hash_with_rng(password, rng)
}

/// Checks `password` against an encoded hash.
///
/// A well-formed hash that does not match gives `Ok(false)`. A malformed
/// one gives `Err(BcryptError::MalformedHash)`, so callers can tell a
/// corrupt record from a wrong password.
pub fn verify(password: &[u8], encoded: &str) -> BcryptResult<bool> {
    let expected = HashParts::decode(encoded)?;
    let actual = match raw_bcrypt(password, &expected.salt, expected.cost, expected.prefix) {
        Ok(digest) => digest,
        // No `$2$` hash can come from an empty password.
        Err(BcryptError::EmptyKey) => return Ok(false),
        Err(err) => return Err(err),
    };
    Ok(bool::from(actual.ct_eq(&expected.digest)))
}

/// Generates a salt setting such as `$2b$12$` followed by 22 salt characters.
pub fn gen_salt(cost: u32, prefix: Prefix) -> BcryptResult<String> {
    gen_salt_with_rng(cost, prefix, &mut OsRng)
}

pub fn gen_salt_with_rng<R: RngCore + CryptoRng>(
    cost: u32,
    prefix: Prefix,
    rng: &mut R,
) -> BcryptResult<String> {
    let setting = Setting {
        prefix,
        cost: Cost::new(cost)?,
        salt: Salt::generate(rng)?,
    };
    Ok(setting.encode())
}

/// Hashes `password` with the prefix, cost and salt taken from `setting`,
/// which may be a bare setting from [`gen_salt`] or a complete hash.
pub fn hash_with_setting(password: &[u8], setting: &str) -> BcryptResult<String> {
    let setting = Setting::decode(setting)?;
    Ok(hash_with_salt(password, setting.cost, setting.prefix, setting.salt)?.encode())
}
