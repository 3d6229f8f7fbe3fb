use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::dto::{sync::SyncStatusDto, validation::validate_user_id};

/// Sign-in notification raised by the authentication provider bridge.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInRequest {
    /// Stable opaque identifier of the signed-in user.
    pub user_id: String,
}

impl Validate for SignInRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_user_id(&self.user_id) {
            errors.add("user_id", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Identity state after an authentication event.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Signed-in user, `null` after sign-out.
    pub user_id: Option<String>,
    /// Whether this event started a reconciliation.
    pub sync_started: bool,
    /// Sync indicator after the event.
    pub sync: SyncStatusDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_rejects_blank_user() {
        let request = SignInRequest {
            user_id: String::new(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("user_id"));

        let request = SignInRequest {
            user_id: "user-1".into(),
        };
        assert!(request.validate().is_ok());
    }
}
