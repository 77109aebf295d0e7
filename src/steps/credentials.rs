// ABOUTME: Random credential generation.
// ABOUTME: Alphanumeric passwords and base64-encoded encryption keys.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};

pub const DB_PASSWORD_LEN: usize = 24;
pub const ADMIN_PASSWORD_LEN: usize = 20;
const ENCRYPTION_KEY_BYTES: usize = 32;

pub fn generate_password(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// 32 random bytes, base64 encoded.
pub fn generate_encryption_key() -> String {
    let mut bytes = [0u8; ENCRYPTION_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
