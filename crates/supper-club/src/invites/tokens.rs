use rand::RngCore;

use crate::domain::InviteCode;

const TOKEN_BYTES: usize = 16;

/// Source of opaque invite tokens.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> InviteCode;
}

/// 128 bits from the thread-local CSPRNG, hex encoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokens;

impl TokenGenerator for RandomTokens {
    fn generate(&self) -> InviteCode {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        InviteCode(hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_tokens_are_hex_and_distinct() {
        let first = RandomTokens.generate();
        let second = RandomTokens.generate();
        assert_eq!(first.as_str().len(), TOKEN_BYTES * 2);
        assert!(first.as_str().chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
