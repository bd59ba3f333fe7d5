//! Staff user accounts and password hashing.

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Prefix marking a PBKDF2-HMAC-SHA256 password record.
const HASH_SCHEME: &str = "pbkdf2";

/// PBKDF2 iterations for new records.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// A staff account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Stored password record; never sent to clients
    #[serde(skip_serializing)]
    pub password: String,
}

/// Payload for creating an account.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    /// Plaintext; hashed before storage
    pub password: String,
}

impl User {
    /// Create an account with a freshly hashed password.
    pub fn from_new(new: NewUser) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: new.username.trim().to_string(),
            password: hash_password(&new.password),
        }
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        verify_password(&self.password, candidate)
    }
}

/// Hash a password as `pbkdf2$<iterations>$<salt hex>$<hash hex>`.
pub fn hash_password(password: &str) -> String {
    hash_with(password, &rand::random::<[u8; SALT_LEN]>(), PBKDF2_ITERATIONS)
}

fn hash_with(password: &str, salt: &[u8], iterations: u32) -> String {
    format!(
        "{HASH_SCHEME}${iterations}${}${}",
        hex::encode(salt),
        hex::encode(derive(password, salt, iterations))
    )
}

/// Check a candidate password against a stored record.
///
/// Records without the `pbkdf2$` prefix are legacy plaintext values.
pub fn verify_password(stored: &str, candidate: &str) -> bool {
    let Some(record) = stored.strip_prefix("pbkdf2$") else {
        return stored.as_bytes().ct_eq(candidate.as_bytes()).into();
    };

    let mut parts = record.splitn(3, '$');
    let (Some(iterations), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let (Ok(iterations), Ok(salt), Ok(expected)) = (
        iterations.parse::<u32>(),
        hex::decode(salt),
        hex::decode(expected),
    ) else {
        tracing::warn!("malformed password record");
        return false;
    };
    if iterations == 0 || expected.len() != HASH_LEN {
        return false;
    }

    let hash = derive(candidate, &salt, iterations);
    hash.as_slice().ct_eq(expected.as_slice()).into()
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut hash);
    hash
}
