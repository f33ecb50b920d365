//! Email/password accounts. Passwords are stored as bcrypt hashes;
//! rows provisioned through a federated provider have no hash and
//! never match a password sign-in.

use crate::db::models::User;
use crate::db::profiles;
use crate::error::AppError;
use crate::state::DbPool;

const MIN_PASSWORD_LEN: usize = 8;

/// Register a new account. The avatar URL is derived from the display
/// name with all whitespace removed.
pub fn sign_up(pool: &DbPool, email: &str, password: &str, name: &str) -> Result<User, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name must not be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let conn = pool.get()?;
    if profiles::find_user_by_email(&conn, email)?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
    let id = uuid::Uuid::now_v7().to_string();
    let avatar = default_avatar_url(name);

    profiles::insert_user(&conn, &id, email, Some(&hash), name, &avatar)?;
    profiles::find_user(&conn, &id)?
        .ok_or_else(|| AppError::Internal("User vanished after insert".to_string()))
}

/// Check credentials against the stored hash. Wrong password, unknown
/// email, and hash-less federated accounts all fail the same way.
pub fn sign_in(pool: &DbPool, email: &str, password: &str) -> Result<User, AppError> {
    let conn = pool.get()?;
    let user = profiles::find_user_by_email(&conn, email)?.ok_or(AppError::Unauthorized)?;

    let hash = user.password_hash.as_deref().ok_or(AppError::Unauthorized)?;
    if !bcrypt::verify(password, hash).unwrap_or(false) {
        return Err(AppError::Unauthorized);
    }
    Ok(user)
}

fn default_avatar_url(name: &str) -> String {
    let handle: String = name.split_whitespace().collect();
    format!("https://avatar.vitrina.dev/marble/180/{}", handle)
}
