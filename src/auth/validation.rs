//! Sign-up input validation

use regex::Regex;
use std::sync::OnceLock;

use crate::db::models::NewUser;

const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_-+={[}]|\\:;<,>.?/";

pub fn validate_email(email: &str) -> Result<(), String> {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,4}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("invalid email address".to_string());
    }
    Ok(())
}

/// Usernames are any non-empty run of printable ASCII.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("username is required".to_string());
    }
    if !username.chars().all(|c| (' '..='~').contains(&c)) {
        return Err("invalid username".to_string());
    }
    Ok(())
}

/// 8 to 20 characters with at least one digit, lowercase, uppercase and symbol.
pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    let strong = (8..=20).contains(&len)
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if !strong {
        return Err("invalid password".to_string());
    }
    Ok(())
}

pub fn validate_new_user(user: &NewUser) -> Result<(), String> {
    validate_email(&user.email)?;
    validate_username(&user.username)?;
    validate_password(&user.password)?;
    if user.password != user.confirm_password {
        return Err("passwords do not match".to_string());
    }
    Ok(())
}
