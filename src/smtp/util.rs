use rand::Rng;
use rand::rngs::OsRng;

const LOCAL_PART_LEN: usize = 12;
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Unlikely-to-exist local part for catch-all probing.
pub fn random_local_part() -> String {
    let mut rng = OsRng;
    (0..LOCAL_PART_LEN)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}
