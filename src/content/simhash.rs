//! 64-bit simhash fingerprints over word features

/// Fingerprints this many bits apart (or more) are a material change
pub const HAMMING_THRESHOLD: u32 = 3;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1 (multiply, then xor)
pub fn fnv1_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        hash.wrapping_mul(FNV_PRIME) ^ u64::from(*byte)
    })
}

/// Lower-cased maximal runs of alphanumerics, `_` and `'`
fn word_features(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '\''))
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Computes the simhash of `text`
///
/// Every feature votes +1 on the bits set in its hash and -1 on the others;
/// a bit is set in the fingerprint when its total is non-negative. Text with
/// no features therefore hashes to all ones.
pub fn simhash(text: &str) -> u64 {
    let mut votes = [0i64; 64];

    for feature in word_features(text) {
        let hash = fnv1_64(feature.as_bytes());
        for (bit, vote) in votes.iter_mut().enumerate() {
            if hash >> bit & 1 == 1 {
                *vote += 1;
            } else {
                *vote -= 1;
            }
        }
    }

    votes
        .iter()
        .enumerate()
        .filter(|(_, vote)| **vote >= 0)
        .fold(0u64, |fingerprint, (bit, _)| fingerprint | 1 << bit)
}

/// Number of differing bits
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Whether a chunk with fingerprint `current` needs re-indexing
///
/// A chunk with no previous fingerprint is always changed.
pub fn is_changed(current: u64, previous: Option<u64>) -> bool {
    match previous {
        Some(previous) => hamming_distance(current, previous) >= HAMMING_THRESHOLD,
        None => true,
    }
}
