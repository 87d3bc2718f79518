//! Password hashing.

use crate::model::PasswordHash;
use sha2::{Digest, Sha256};
use uuid::Uuid;

const SCHEME: &str = "sha256";
pub const DEFAULT_ROUNDS: u32 = 10_000;

/// Turns plaintext passwords into stored [`PasswordHash`]es and checks them
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> PasswordHash;
    fn verify(&self, password: &str, stored: &PasswordHash) -> bool;
}

/// Salted, iterated SHA-256, encoded as `sha256$<rounds>$<salt>$<hex digest>`
#[derive(Debug, Clone)]
pub struct Sha256CredentialHasher {
    rounds: u32,
}

impl Default for Sha256CredentialHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ROUNDS)
    }
}

impl Sha256CredentialHasher {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }

    fn digest(rounds: u32, salt: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        let mut state = hasher.finalize();
        for _ in 1..rounds {
            let mut hasher = Sha256::new();
            hasher.update(state);
            hasher.update(password.as_bytes());
            state = hasher.finalize();
        }
        format!("{:x}", state)
    }
}

impl CredentialHasher for Sha256CredentialHasher {
    fn hash(&self, password: &str) -> PasswordHash {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = Self::digest(self.rounds, &salt, password);
        PasswordHash::new(format!("{SCHEME}${}${salt}${digest}", self.rounds))
    }

    fn verify(&self, password: &str, stored: &PasswordHash) -> bool {
        let mut parts = stored.as_str().splitn(4, '$');
        let (Some(SCHEME), Some(rounds), Some(salt), Some(expected)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        let Ok(rounds) = rounds.parse::<u32>() else {
            return false;
        };
        constant_time_eq(
            Self::digest(rounds.max(1), salt, password).as_bytes(),
            expected.as_bytes(),
        )
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
