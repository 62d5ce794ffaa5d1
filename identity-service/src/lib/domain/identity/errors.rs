use thiserror::Error;

/// Error for Username validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Username too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },

    #[error(
        "Username contains invalid characters (only alphanumeric, underscore, and hyphen allowed)"
    )]
    InvalidCharacters,
}

/// Error for Role and Roles validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("Role label is empty")]
    Blank,

    #[error("Role label contains invalid characters: {0}")]
    InvalidCharacters(String),

    #[error("At least one role is required")]
    Empty,

    #[error("Role is not assignable at registration: {0}")]
    NotAllowed(String),
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Failures reported by a credential store adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The uniqueness constraint on username rejected the insert.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be turned back into an identity.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Top-level error for registration, authentication and token verification.
///
/// Unknown usernames and wrong passwords both surface as `InvalidCredentials`;
/// a duplicate caught before insert and one caught by the store both surface
/// as `UsernameTaken`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    // Value object validation errors (automatically converted via #[from])
    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("Invalid role: {0}")]
    InvalidRole(#[from] RoleError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    // Flow outcomes
    #[error("Username already exists: {0}")]
    UsernameTaken(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token has expired")]
    Expired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is malformed")]
    Malformed,

    #[error("Authentication required")]
    Unauthenticated,

    // Infrastructure errors
    #[error("Credential store unavailable")]
    StoreUnavailable(String),

    #[error("Internal error")]
    Internal(String),
}

impl From<auth::JwtError> for AuthError {
    fn from(err: auth::JwtError) -> Self {
        match err {
            auth::JwtError::Expired => AuthError::Expired,
            auth::JwtError::InvalidSignature => AuthError::InvalidSignature,
            auth::JwtError::Malformed(_) => AuthError::Malformed,
            auth::JwtError::EncodingFailed(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<auth::PasswordError> for AuthError {
    fn from(err: auth::PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(username) => AuthError::UsernameTaken(username),
            StoreError::Unavailable(msg) | StoreError::Corrupt(msg) => {
                AuthError::StoreUnavailable(msg)
            }
        }
    }
}

impl From<auth::AuthenticationError> for AuthError {
    fn from(err: auth::AuthenticationError) -> Self {
        match err {
            auth::AuthenticationError::InvalidCredentials => AuthError::InvalidCredentials,
            auth::AuthenticationError::PasswordError(e) => e.into(),
            auth::AuthenticationError::JwtError(e) => e.into(),
        }
    }
}
