use rand::Rng;
use std::fmt;
use std::fmt::Write;

/// number of random integers fed into a random hash
pub const RANDOM_HASH_INPUTS: usize = 32;

/// exclusive upper bound of each random integer (ASCII code point range)
const RANDOM_INPUT_BOUND: u8 = 128;

/// MD5 digest, rendered as 32 lowercase hex chars
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 16]);

impl Hash {
    /// hash the ASCII bytes of a text
    pub fn of_text(text: &str) -> Self {
        Self(md5::compute(text.as_bytes()).0)
    }

    /// convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

/// draw `len` integers in 0..128 and concatenate their decimal text.
///
/// the packages this tool emits have always derived their random names from
/// this text, not from raw random bytes: `[7, 101, 0]` becomes `"71010"`.
/// the result is therefore between `len` and `3 * len` ASCII digits long.
pub fn random_digits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    let mut out = String::with_capacity(len * 3);
    for _ in 0..len {
        let n: u8 = rng.gen_range(0..RANDOM_INPUT_BOUND);
        // writing to a String cannot fail
        let _ = write!(out, "{}", n);
    }
    out
}

/// fresh random hash: MD5 over [`random_digits`] of [`RANDOM_HASH_INPUTS`] integers
pub fn random_hash<R: Rng + ?Sized>(rng: &mut R) -> Hash {
    Hash::of_text(&random_digits(rng, RANDOM_HASH_INPUTS))
}

/// true if `s` looks like a hash this crate would produce (32 lowercase hex chars)
pub fn is_hash_hex(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
