//! Checks run on user actions before anything goes over the network.

use crate::models::Identity;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a group name")]
    EmptyGroupName,

    #[error("Please select at least one member")]
    NoMembers,

    #[error("Username is required")]
    EmptyUsername,

    #[error("Password is required")]
    EmptyPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Message is empty")]
    EmptyMessage,
}

/// Returns the trimmed group name
pub fn validate_new_group(name: &str, members: &[Identity]) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyGroupName);
    }
    if members.is_empty() {
        return Err(ValidationError::NoMembers);
    }
    Ok(name.to_string())
}

pub fn validate_login(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    Ok(())
}

pub fn validate_registration(
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    validate_login(username, password)?;
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

pub fn validate_message(text: &str, has_file: bool) -> Result<(), ValidationError> {
    if text.trim().is_empty() && !has_file {
        return Err(ValidationError::EmptyMessage);
    }
    Ok(())
}
