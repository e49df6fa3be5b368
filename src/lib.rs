//! Password hashing with bcrypt, built on a local Blowfish and the
//! Eksblowfish key schedule (Provos and Mazières, 1999).
//!
//! ```
//! use bcrypt_kit::{hash, verify, Prefix};
//!
//! let hashed = hash(b"hunter2", 4, Prefix::V2b).unwrap();
//! assert!(verify(b"hunter2", &hashed).unwrap());
//! assert!(!verify(b"hunter3", &hashed).unwrap());
//! ```
//!
//! Every call owns its cipher state, so hashing from many threads at once
//! needs no locking. The work is CPU-bound and doubles with each step of
//! cost; keep it off latency-sensitive threads.

mod bcrypt;
mod blowfish;
mod encoding;
mod error;
mod schedule;
mod tables;
mod types;

pub use crate::bcrypt::{
    gen_salt, gen_salt_with_rng, hash, hash_with_rng, hash_with_salt, hash_with_setting, raw_bcrypt,
    verify, BCrypt,
};
pub use crate::blowfish::{Blowfish, KeyVariant};
pub use crate::encoding::{decode_base64, encode_base64, HashParts, Setting};
pub use crate::error::{BcryptError, BcryptResult};
pub use crate::schedule::{eks_setup, prepare_key};
pub use crate::types::{
    Cost, Digest, Prefix, Salt, DEFAULT_COST, DIGEST_LEN, MAX_COST, MAX_KEY_LEN, MIN_COST, SALT_LEN,
};
