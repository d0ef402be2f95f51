//! Helpers for the quick creation of randomized strings.

use rand::seq::IndexedRandom;

pub(crate) const ALPHANUM: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produce a random alphanumeric string of exactly `length` bytes.
pub(crate) fn random_token<R>(rng: &mut R, length: usize) -> String
where
    R: rand::Rng + ?Sized,
{
    let mut token = String::with_capacity(length);
    for _ in 0..length {
        let byte = *ALPHANUM.choose(rng).expect("alphabet is non-empty");
        token.push(char::from(byte));
    }
    token
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{ALPHANUM, random_token};

    // Ensure that no returned token ever has a non-alphabet character and
    // that the requested length is always honored.
    proptest! {
        #[test]
        fn tokens_are_alphanumeric_and_sized(seed: u64, length in 0usize..64) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let token = random_token(&mut rng, length);
            prop_assert_eq!(token.len(), length);
            for byte in token.bytes() {
                prop_assert!(ALPHANUM.contains(&byte));
            }
        }
    }
}
