use async_trait::async_trait;

use crate::domain::identity::models::AuthenticatedPrincipal;
use crate::domain::identity::models::Credentials;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IssuedToken;
use crate::domain::identity::models::RegisterCommand;
use crate::domain::identity::models::Registration;
use crate::domain::identity::models::Username;
use crate::identity::errors::AuthError;
use crate::identity::errors::StoreError;

/// Port for registration, authentication and token verification.
#[async_trait]
pub trait IdentityServicePort: Send + Sync + 'static {
    /// Register a new identity and issue its first token.
    ///
    /// # Arguments
    /// * `command` - Validated username, plaintext password, roles and profile
    ///
    /// # Returns
    /// Stored identity together with a freshly issued token
    ///
    /// # Errors
    /// * `UsernameTaken` - Username already registered (checked before and during insert)
    /// * `InvalidRole` - Requested role is not assignable at registration
    /// * `StoreUnavailable` - Credential store failed
    async fn register(&self, command: RegisterCommand) -> Result<Registration, AuthError>;

    /// Verify credentials and issue a token.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown username or wrong password (indistinguishable)
    /// * `StoreUnavailable` - Credential store failed
    async fn authenticate(&self, credentials: Credentials) -> Result<IssuedToken, AuthError>;

    /// Validate a presented token.
    ///
    /// # Returns
    /// Subject and roles embedded in the token
    ///
    /// # Errors
    /// * `Expired` - Token lifetime elapsed
    /// * `InvalidSignature` - Signature does not match
    /// * `Malformed` - Token cannot be parsed or carries unusable claims
    fn verify_token(&self, token: &str) -> Result<AuthenticatedPrincipal, AuthError>;
}

/// Persistence operations the flows need from a credential store.
///
/// Implementations must enforce username uniqueness themselves, including
/// against concurrent inserts of the same username.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Retrieve identity by username.
    ///
    /// # Returns
    /// Optional identity (None if not found)
    ///
    /// # Errors
    /// * `Unavailable` - Store operation failed
    /// * `Corrupt` - Stored record could not be read back
    async fn find_by_username(&self, username: &Username) -> Result<Option<Identity>, StoreError>;

    /// Persist a new identity.
    ///
    /// # Errors
    /// * `DuplicateKey` - Username is already taken
    /// * `Unavailable` - Store operation failed
    async fn insert(&self, identity: Identity) -> Result<Identity, StoreError>;
}
