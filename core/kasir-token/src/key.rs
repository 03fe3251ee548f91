//! License key generation.

use rand::rngs::OsRng;
use rand::Rng;

/// Key alphabet: uppercase letters and digits minus the visually ambiguous
/// characters (0/O, 1/I).
pub const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const GROUPS: usize = 4;
const GROUP_LEN: usize = 5;

/// Generates a human-typable license key: four dash-separated groups of
/// five characters from [`KEY_ALPHABET`], e.g. `7KQ2M-ABCDE-XY9Z3-PQRST`.
#[must_use]
pub fn generate_license_key() -> String {
    let mut rng = OsRng;
    let mut groups = Vec::with_capacity(GROUPS);
    for _ in 0..GROUPS {
        let group: String = (0..GROUP_LEN)
            .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
            .collect();
        groups.push(group);
    }
    groups.join("-")
}
