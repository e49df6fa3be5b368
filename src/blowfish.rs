//! The Blowfish block cipher, reduced to what bcrypt needs: the standard
//! initial tables, key expansion (plain and salted) and block encryption.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{BcryptError, BcryptResult};
use crate::tables::{P_INIT, S_INIT};

const ROUNDS: usize = 16;

/// How password bytes are packed into 32-bit key words.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyVariant {
    /// Bytes are treated as unsigned, as every current implementation does.
    Standard,
    /// Bytes are sign-extended before being OR-ed into the word. This
    /// reproduces the pre-2011 crypt_blowfish bug behind `$2x$` hashes.
    SignExtended,
}

/// Live Blowfish subkeys. Wiped on drop since they derive from the password.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Blowfish {
    p: [u32; ROUNDS + 2],
    s: [[u32; 256]; 4],
}

/// Reads big-endian words out of a key, wrapping around at its end.
struct KeyStream<'a> {
    key: &'a [u8],
    pos: usize,
    variant: KeyVariant,
}

impl<'a> KeyStream<'a> {
    fn new(key: &'a [u8], variant: KeyVariant) -> BcryptResult<Self> {
        if key.is_empty() {
            return Err(BcryptError::EmptyKey);
        }
        Ok(KeyStream { key, pos: 0, variant })
    }

    fn next_word(&mut self) -> u32 {
        let mut word = 0u32;
        for _ in 0..4 {
            let byte = self.key[self.pos];
            word = match self.variant {
                KeyVariant::Standard => (word << 8) | u32::from(byte),
                KeyVariant::SignExtended => (word << 8) | (byte as i8 as i32 as u32),
            };
            self.pos = (self.pos + 1) % self.key.len();
        }
        word
    }
}

impl Blowfish {
    /// A cipher holding the published initial P-array and S-boxes.
    pub fn new() -> Self {
        Blowfish {
            p: P_INIT,
            s: S_INIT,
        }
    }

    fn f(&self, x: u32) -> u32 {
        let [a, b, c, d] = x.to_be_bytes();
        let h = self.s[0][usize::from(a)].wrapping_add(self.s[1][usize::from(b)]);
        (h ^ self.s[2][usize::from(c)]).wrapping_add(self.s[3][usize::from(d)])
    }

    /// Encrypts one 64-bit block given as its two big-endian halves.
    pub fn encrypt_block(&self, mut left: u32, mut right: u32) -> (u32, u32) {
        for i in (0..ROUNDS).step_by(2) {
            left ^= self.p[i];
            right ^= self.f(left);
            right ^= self.p[i + 1];
            left ^= self.f(right);
        }
        left ^= self.p[ROUNDS];
        right ^= self.p[ROUNDS + 1];
        (right, left)
    }

    fn mix_key(&mut self, key: &[u8], variant: KeyVariant) -> BcryptResult<()> {
        let mut stream = KeyStream::new(key, variant)?;
        for p in self.p.iter_mut() {
            *p ^= stream.next_word();
        }
        Ok(())
    }

    /// Regenerates every subkey by chained encryption. Before each block is
    /// encrypted it is XOR-ed with `tweak(n)`, `n` counting blocks from zero.
    fn regenerate<F>(&mut self, mut tweak: F)
    where
        F: FnMut(usize) -> (u32, u32),
    {
        let (mut left, mut right) = (0u32, 0u32);
        let mut n = 0;

        for i in (0..ROUNDS + 2).step_by(2) {
            let (tl, tr) = tweak(n);
            n += 1;
            let (l, r) = self.encrypt_block(left ^ tl, right ^ tr);
            left = l;
            right = r;
            self.p[i] = left;
            self.p[i + 1] = right;
        }

        for b in 0..4 {
            for i in (0..256).step_by(2) {
                let (tl, tr) = tweak(n);
                n += 1;
                let (l, r) = self.encrypt_block(left ^ tl, right ^ tr);
                left = l;
                right = r;
                self.s[b][i] = left;
                self.s[b][i + 1] = right;
            }
        }
    }

    /// Standard Blowfish key expansion: mixes `key` (read cyclically) into the
    /// P-array, then rebuilds all tables from an all-zero block.
    pub fn expand_key(&mut self, key: &[u8], variant: KeyVariant) -> BcryptResult<()> {
        self.mix_key(key, variant)?;
        self.regenerate(|_| (0, 0));
        Ok(())
    }

    /// Eksblowfish's salted expansion: like [`Blowfish::expand_key`], but each
    /// block is XOR-ed with the next 8 bytes of `salt` before it is encrypted.
    pub fn expand_key_with_salt(
        &mut self,
        key: &[u8],
        salt: &[u8; 16],
        variant: KeyVariant,
    ) -> BcryptResult<()> {
        self.mix_key(key, variant)?;

        let mut words = [0u32; 4];
        for (w, chunk) in words.iter_mut().zip(salt.chunks_exact(4)) {
            *w = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        self.regenerate(|n| {
            let j = (n * 2) % 4;
            (words[j], words[j + 1])
        });
        words.zeroize();
        Ok(())
    }
}

impl Default for Blowfish {
    fn default() -> Self {
        Blowfish::new()
    }
}
