//! Password and session-secret hashing helpers.

use argon2::Argon2;
use argon2::password_hash::{
    Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    rand_core::OsRng,
};
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::error::{DataError, Result};

/// Length of the random session secret embedded in bearer tokens.
pub(crate) const SESSION_SECRET_LEN: usize = 40;

pub(crate) fn generate_token(length: usize) -> String {
    let mut rng = rand::rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

pub(crate) fn hash_secret(input: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon = Argon2::default();
    let hash = argon
        .hash_password(input.as_bytes(), &salt)
        .map_err(|detail| DataError::SecretHashFailed { detail })?;
    Ok(hash.to_string())
}

pub(crate) fn verify_secret(expected_hash: &str, candidate: &str) -> Result<bool> {
    let parsed = PasswordHash::new(expected_hash)
        .map_err(|detail| DataError::StoredHashInvalid { detail })?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(detail) => Err(DataError::SecretVerifyFailed { detail }),
    }
}
