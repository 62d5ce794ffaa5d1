use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiSuccess;
use crate::domain::identity::models::AuthenticatedPrincipal;

/// Echo the principal the middleware recovered from the bearer token.
pub async fn current_identity(
    Extension(principal): Extension<AuthenticatedPrincipal>,
) -> ApiSuccess<CurrentIdentityResponseData> {
    ApiSuccess::new(StatusCode::OK, (&principal).into())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentIdentityResponseData {
    pub subject: String,
    pub roles: Vec<String>,
}

impl From<&AuthenticatedPrincipal> for CurrentIdentityResponseData {
    fn from(principal: &AuthenticatedPrincipal) -> Self {
        Self {
            subject: principal.subject.as_str().to_string(),
            roles: principal.roles.labels(),
        }
    }
}
