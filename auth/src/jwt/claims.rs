use std::collections::BTreeSet;
use std::collections::HashMap;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Signed token payload.
///
/// Carries the subject, the issue/expiry window (Unix seconds) and the role
/// set under the `role` key. Any other custom fields land in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Role labels granted to the subject
    #[serde(default)]
    pub role: BTreeSet<String>,

    /// Additional custom fields (flattened into token)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Create claims for a subject, valid from now for `ttl`.
    ///
    /// # Arguments
    /// * `subject` - Identity the token speaks for
    /// * `roles` - Role labels to embed
    /// * `ttl` - Lifetime of the token
    ///
    /// # Returns
    /// Claims with sub, iat, exp and role set
    pub fn for_subject<I, R>(subject: impl ToString, roles: I, ttl: Duration) -> Self
    where
        I: IntoIterator<Item = R>,
        R: ToString,
    {
        let now = Utc::now();

        Self {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            role: roles.into_iter().map(|r| r.to_string()).collect(),
            extra: HashMap::new(),
        }
    }

    /// Set issued at (Unix timestamp).
    pub fn with_issued_at(mut self, iat: i64) -> Self {
        self.iat = iat;
        self
    }

    /// Set expiration (Unix timestamp).
    pub fn with_expiration(mut self, exp: i64) -> Self {
        self.exp = exp;
        self
    }

    /// Add a custom field.
    ///
    /// # Errors
    /// Returns the serialization error if `value` has no JSON representation
    pub fn with_extra(
        mut self,
        key: impl ToString,
        value: impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        let json_value = serde_json::to_value(value)?;
        self.extra.insert(key.to_string(), json_value);
        Ok(self)
    }

    /// Expiry as a UTC timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role.contains(role)
    }
}
