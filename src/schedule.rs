//! Eksblowfish, the expensive key schedule behind bcrypt.

use zeroize::Zeroizing;

use crate::blowfish::{Blowfish, KeyVariant};
use crate::error::BcryptResult;
use crate::types::{Cost, Prefix, Salt, MAX_KEY_LEN};

/// Builds the key bcrypt actually mixes in: the password, a NUL terminator
/// (except for `$2$`), and nothing past byte 72.
///
/// The length is capped here, on `usize`, before anything narrower sees it.
/// OpenBSD's `$2a$` stored it in a `u8` and wrapped for 255+ byte passwords.
pub fn prepare_key(password: &[u8], prefix: Prefix) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(Vec::with_capacity(MAX_KEY_LEN));
    let take = password.len().min(MAX_KEY_LEN);
    key.extend_from_slice(&password[..take]);
    if prefix.appends_nul() && key.len() < MAX_KEY_LEN {
        key.push(0);
    }
    key
}

/// Runs the full expensive key setup and returns the resulting cipher.
///
/// `key` must come from [`prepare_key`]. The salt is always read as
/// unsigned bytes; only the password key follows `prefix`'s variant.
pub fn eks_setup(key: &[u8], salt: &Salt, cost: Cost, prefix: Prefix) -> BcryptResult<Blowfish> {
    let variant = prefix.key_variant();
    let salt = salt.as_bytes();

    let mut state = Blowfish::new();
    state.expand_key_with_salt(key, salt, variant)?;

    for _ in 0..cost.rounds() {
        state.expand_key(key, variant)?;
        state.expand_key(salt, KeyVariant::Standard)?;
    }

    Ok(state)
}
