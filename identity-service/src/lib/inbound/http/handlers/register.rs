use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::identity::models::Address;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Profile;
use crate::domain::identity::models::RegisterCommand;
use crate::domain::identity::models::Registration;
use crate::domain::identity::models::Roles;
use crate::domain::identity::models::Username;
use crate::domain::identity::ports::IdentityServicePort;
use crate::identity::errors::EmailError;
use crate::identity::errors::RoleError;
use crate::identity::errors::UsernameError;
use crate::inbound::http::router::AppState;

pub async fn register<S: IdentityServicePort>(
    State(state): State<AppState<S>>,
    Json(body): Json<RegisterRequest>,
) -> Result<ApiSuccess<RegisterResponseData>, ApiError> {
    state
        .identity_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref registration| ApiSuccess::new(StatusCode::CREATED, registration.into()))
}

/// Roles as clients send them: a single label or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RoleField {
    One(String),
    Many(Vec<String>),
}

impl RoleField {
    fn into_roles(self) -> Result<Roles, RoleError> {
        match self {
            RoleField::One(label) => Roles::parse([label]),
            RoleField::Many(labels) => Roles::parse(labels),
        }
    }
}

/// HTTP request body for registration (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    #[serde(alias = "userName")]
    username: String,
    password: String,
    #[serde(default, alias = "role")]
    roles: Option<RoleField>,
    #[serde(default, alias = "firstName", alias = "firstname")]
    first_name: Option<String>,
    #[serde(default, alias = "lastName", alias = "lastname")]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    address: Option<AddressRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddressRequest {
    street: String,
    city: String,
    #[serde(default, alias = "postalIndex")]
    postal_index: Option<i32>,
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterRequestError {
    #[error("Invalid username: {0}")]
    Username(#[from] UsernameError),

    #[error("Invalid role: {0}")]
    Role(#[from] RoleError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterCommand, ParseRegisterRequestError> {
        let username = Username::new(self.username)?;
        let profile = Profile {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email.map(EmailAddress::new).transpose()?,
            address: self.address.map(|a| Address {
                street: a.street,
                city: a.city,
                postal_index: a.postal_index,
            }),
        };

        let command = RegisterCommand::new(username, self.password).with_profile(profile);
        match self.roles {
            Some(roles) => Ok(command.with_roles(roles.into_roles()?)),
            None => Ok(command),
        }
    }
}

impl From<ParseRegisterRequestError> for ApiError {
    fn from(err: ParseRegisterRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterResponseData {
    pub message: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub username: String,
    pub roles: Vec<String>,
}

impl From<&Registration> for RegisterResponseData {
    fn from(registration: &Registration) -> Self {
        Self {
            message: "User registered successfully".to_string(),
            token: registration.token.token.clone(),
            expires_at: registration.token.expires_at,
            username: registration.identity.username.as_str().to_string(),
            roles: registration.identity.roles.labels(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::models::Role;

    fn parse(json: serde_json::Value) -> RegisterCommand {
        serde_json::from_value::<RegisterRequest>(json)
            .unwrap()
            .try_into_command()
            .unwrap()
    }

    #[test]
    fn test_role_accepts_single_label() {
        let command = parse(serde_json::json!({
            "username": "alice",
            "password": "pw123",
            "role": "user"
        }));
        assert_eq!(command.roles, Some(Roles::single(Role::user())));
    }

    #[test]
    fn test_roles_accepts_list() {
        let command = parse(serde_json::json!({
            "userName": "alice",
            "password": "pw123",
            "roles": ["ROLE_USER", "BUSINESSUSER"]
        }));
        assert_eq!(
            command.roles,
            Some(Roles::of(Role::user(), [Role::business_user()]))
        );
    }

    #[test]
    fn test_missing_roles_left_to_policy() {
        let command = parse(serde_json::json!({
            "username": "alice",
            "password": "pw123"
        }));
        assert!(command.roles.is_none());
        assert_eq!(command.profile, Profile::default());
    }

    #[test]
    fn test_profile_fields_pass_through() {
        let command = parse(serde_json::json!({
            "username": "alice",
            "password": "pw123",
            "firstName": "Alice",
            "lastname": "Liddell",
            "email": "alice@example.com",
            "address": { "street": "Rabbit Hole 1", "city": "Oxford", "postalIndex": 1865 }
        }));

        assert_eq!(command.profile.first_name.as_deref(), Some("Alice"));
        assert_eq!(command.profile.last_name.as_deref(), Some("Liddell"));
        assert_eq!(
            command.profile.email.as_ref().map(|e| e.as_str()),
            Some("alice@example.com")
        );
        assert_eq!(command.profile.address.unwrap().postal_index, Some(1865));
    }

    #[test]
    fn test_empty_role_list_is_rejected() {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "alice",
            "password": "pw123",
            "roles": []
        }))
        .unwrap();

        assert!(matches!(
            request.try_into_command(),
            Err(ParseRegisterRequestError::Role(RoleError::Empty))
        ));
    }

    #[test]
    fn test_bad_email_is_rejected() {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "alice",
            "password": "pw123",
            "email": "not-an-email"
        }))
        .unwrap();

        assert!(matches!(
            request.try_into_command(),
            Err(ParseRegisterRequestError::Email(_))
        ));
    }
}
