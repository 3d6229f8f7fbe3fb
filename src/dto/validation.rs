//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest identifier accepted from the authentication provider.
const MAX_USER_ID_LEN: usize = 128;

/// Validates an identifier handed over by the authentication provider.
///
/// Identifiers are embedded in remote document ids, so they must be non-empty and bounded, and
/// must not contain whitespace, control characters or `:`, which separates id segments.
///
/// # Examples
///
/// ```ignore
/// validate_user_id("auth0|5f7c8ec7") // Ok
/// validate_user_id("")               // Err - empty
/// validate_user_id("two words")      // Err - whitespace
/// validate_user_id("alice::mallory") // Err - separator
/// ```
pub fn validate_user_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_USER_ID_LEN {
        let mut err = ValidationError::new("user_id_length");
        err.message = Some(
            format!(
                "User ID must be between 1 and {MAX_USER_ID_LEN} bytes (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        let mut err = ValidationError::new("user_id_format");
        err.message = Some("User ID must not contain whitespace or control characters".into());
        return Err(err);
    }

    if id.contains(':') {
        let mut err = ValidationError::new("user_id_separator");
        err.message = Some("User ID must not contain ':'".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_id_valid() {
        assert!(validate_user_id("user-1").is_ok());
        assert!(validate_user_id("auth0|5f7c8ec7a1b2").is_ok());
    }

    #[test]
    fn test_validate_user_id_invalid_length() {
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id(&"x".repeat(MAX_USER_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_user_id_invalid_format() {
        assert!(validate_user_id("two words").is_err());
        assert!(validate_user_id("tab\there").is_err());
        assert!(validate_user_id("line\nbreak").is_err());
    }

    #[test]
    fn test_validate_user_id_rejects_separator() {
        assert!(validate_user_id("alice::mallory").is_err());
        assert!(validate_user_id("google-oauth2:1234").is_err());
        assert!(validate_user_id("alice").is_ok());
    }
}
