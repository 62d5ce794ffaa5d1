use chrono::Duration;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Deserialize;
use serde::Serialize;

use super::claims::Claims;
use super::errors::JwtError;

/// JWT token handler for issuing and verifying tokens.
///
/// Key and algorithm (HS256) are fixed at construction; the algorithm named in
/// a presented token's header is never trusted. Holds no mutable state, so a
/// single instance can be shared across tasks without locking.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    leeway_seconds: u64,
}

impl JwtHandler {
    /// Create a new JWT handler with a secret key.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens (should be stored securely)
    ///
    /// # Returns
    /// JwtHandler configured with HS256 and strict expiry comparison
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Store secrets in environment variables or secure vaults, never in code
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            leeway_seconds: 0,
        }
    }

    /// Tolerate clock skew of `seconds` when checking `exp`.
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    /// Issue a signed token for `subject` carrying `roles`, valid for `ttl`.
    ///
    /// # Returns
    /// The encoded token together with the claims that were signed
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue<I, R>(
        &self,
        subject: impl ToString,
        roles: I,
        ttl: Duration,
    ) -> Result<(String, Claims), JwtError>
    where
        I: IntoIterator<Item = R>,
        R: ToString,
    {
        let claims = Claims::for_subject(subject, roles, ttl);
        let token = self.encode(&claims)?;
        Ok((token, claims))
    }

    /// Verify a token and return its claims unchanged.
    ///
    /// # Errors
    /// * `Expired` - `exp` lies in the past (beyond the configured leeway)
    /// * `InvalidSignature` - Signature does not match the payload
    /// * `Malformed` - Token cannot be parsed or lacks `sub`/`exp`
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        self.decode(token)
    }

    /// Encode claims into a JWT token.
    ///
    /// # Arguments
    /// * `claims` - Claims to encode (must implement Serialize)
    ///
    /// # Returns
    /// JWT token string
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let header = Header::new(self.algorithm);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Decode and validate a JWT token.
    ///
    /// Requires `sub` and `exp`. Expiry is compared against the current clock
    /// minus the configured leeway.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self, token: &str) -> Result<T, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.validate_exp = true;
        validation.leeway = self.leeway_seconds;

        let token_data =
            decode::<T>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    JwtError::InvalidSignature
                }
                _ => JwtError::Malformed(e.to_string()),
            })?;

        Ok(token_data.claims)
    }
}
