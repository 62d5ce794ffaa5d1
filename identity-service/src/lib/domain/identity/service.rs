use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use chrono::Duration;
use chrono::Utc;

use crate::domain::identity::models::AuthenticatedPrincipal;
use crate::domain::identity::models::Credentials;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::IssuedToken;
use crate::domain::identity::models::RegisterCommand;
use crate::domain::identity::models::Registration;
use crate::domain::identity::models::Role;
use crate::domain::identity::models::Roles;
use crate::domain::identity::models::Username;
use crate::identity::errors::AuthError;
use crate::identity::errors::RoleError;
use crate::identity::errors::StoreError;
use crate::identity::ports::CredentialStore;
use crate::identity::ports::IdentityServicePort;

/// Which roles a registration may ask for, and what it gets when it asks for none.
#[derive(Debug, Clone)]
pub struct RegistrationPolicy {
    pub default_role: Role,
    pub allowed_roles: Roles,
}

impl RegistrationPolicy {
    pub fn new(default_role: Role, allowed_roles: Roles) -> Self {
        Self {
            default_role,
            allowed_roles,
        }
    }

    fn resolve(&self, requested: Option<Roles>) -> Result<Roles, RoleError> {
        let roles = requested.unwrap_or_else(|| Roles::single(self.default_role.clone()));

        let rejected = roles
            .iter()
            .find(|role| !self.allowed_roles.contains(role))
            .cloned();

        match rejected {
            Some(role) => Err(RoleError::NotAllowed(role.to_string())),
            None => Ok(roles),
        }
    }
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            default_role: Role::user(),
            allowed_roles: Roles::of(Role::user(), [Role::business_user()]),
        }
    }
}

/// Registration and authentication flows.
///
/// Holds no mutable state of its own; uniqueness is ultimately the store's job.
pub struct IdentityService<CS>
where
    CS: CredentialStore,
{
    store: Arc<CS>,
    authenticator: Arc<Authenticator>,
    policy: RegistrationPolicy,
    token_ttl: Duration,
}

impl<CS> IdentityService<CS>
where
    CS: CredentialStore,
{
    /// Create a new identity service with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Credential store implementation
    /// * `authenticator` - Password hashing and token issuance
    /// * `policy` - Role rules applied at registration
    /// * `token_ttl` - Lifetime of every issued token
    pub fn new(
        store: Arc<CS>,
        authenticator: Arc<Authenticator>,
        policy: RegistrationPolicy,
        token_ttl: Duration,
    ) -> Self {
        Self {
            store,
            authenticator,
            policy,
            token_ttl,
        }
    }

    fn issue(&self, identity: &Identity) -> Result<IssuedToken, AuthError> {
        self.authenticator
            .issue_token(
                identity.username.as_str(),
                identity.roles.labels(),
                self.token_ttl,
            )
            .map(IssuedToken::from)
            .map_err(|e| {
                tracing::error!(username = %identity.username, error = %e, "Token issuance failed");
                AuthError::from(e)
            })
    }
}

#[async_trait]
impl<CS> IdentityServicePort for IdentityService<CS>
where
    CS: CredentialStore,
{
    async fn register(&self, command: RegisterCommand) -> Result<Registration, AuthError> {
        let roles = self.policy.resolve(command.roles)?;

        if self
            .store
            .find_by_username(&command.username)
            .await?
            .is_some()
        {
            tracing::warn!(username = %command.username, "Registration rejected: username taken");
            return Err(AuthError::UsernameTaken(command.username.to_string()));
        }

        let password_hash = self.authenticator.hash_password(&command.password)?;

        let identity = Identity {
            id: IdentityId::new(),
            username: command.username,
            password_hash,
            roles,
            profile: command.profile,
            created_at: Utc::now(),
        };

        // Lookup and insert are not atomic; a concurrent registration can still win here.
        let identity = self.store.insert(identity).await.map_err(|e| {
            match &e {
                StoreError::DuplicateKey(username) => {
                    tracing::warn!(username = %username, "Registration lost a race for the username")
                }
                _ => tracing::error!(error = %e, "Failed to persist identity"),
            }
            AuthError::from(e)
        })?;

        let token = self.issue(&identity)?;

        tracing::info!(
            identity_id = %identity.id,
            username = %identity.username,
            roles = ?identity.roles.labels(),
            "Identity registered"
        );

        Ok(Registration { identity, token })
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<IssuedToken, AuthError> {
        let Credentials { username, password } = credentials;

        let identity = match Username::new(username) {
            Ok(username) => self.store.find_by_username(&username).await?,
            Err(_) => None,
        };

        let Some(identity) = identity else {
            tracing::warn!("Authentication rejected: invalid credentials");
            return Err(self.authenticator.reject_unknown(&password).into());
        };

        let result = self
            .authenticator
            .authenticate(
                &password,
                &identity.password_hash,
                identity.username.as_str(),
                identity.roles.labels(),
                self.token_ttl,
            )
            .map_err(|e| {
                match &e {
                    auth::AuthenticationError::InvalidCredentials => {
                        tracing::warn!("Authentication rejected: invalid credentials")
                    }
                    _ => tracing::error!(
                        username = %identity.username,
                        error = %e,
                        "Authentication failed"
                    ),
                }
                AuthError::from(e)
            })?;

        tracing::info!(username = %identity.username, "Identity authenticated");

        Ok(result.into())
    }

    fn verify_token(&self, token: &str) -> Result<AuthenticatedPrincipal, AuthError> {
        let claims = self.authenticator.validate_token(token)?;

        let subject = Username::new(claims.sub).map_err(|_| AuthError::Malformed)?;
        let roles = Roles::parse(&claims.role).map_err(|_| AuthError::Malformed)?;

        Ok(AuthenticatedPrincipal { subject, roles })
    }
}
