use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Fails for a wrong password and for a stored hash that is not a valid PHC string.
pub fn verify_password(password: &str, hashed: &str) -> Result<(), argon2::password_hash::Error> {
    let argon2 = Argon2::default();
    let parsed = PasswordHash::new(hashed)?;

    argon2.verify_password(password.as_bytes(), &parsed)
}

/// Rules for a replacement password; returns the reason it is rejected.
pub fn validate_new_password(current: &str, new: &str) -> Result<(), &'static str> {
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err("New password must be at least 8 characters long.");
    }
    if new == current {
        return Err("New password must differ from the current password.");
    }
    Ok(())
}
