//! bcrypt password hashing

use thiserror::Error;

#[derive(Error, Debug)]
#[error("Password hashing failed: {0}")]
pub struct PasswordError(String);

impl From<bcrypt::BcryptError> for PasswordError {
    fn from(err: bcrypt::BcryptError) -> Self {
        PasswordError(err.to_string())
    }
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Constant-time comparison against a stored bcrypt hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    Ok(bcrypt::verify(password, hash)?)
}
