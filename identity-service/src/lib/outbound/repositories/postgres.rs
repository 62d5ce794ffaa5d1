use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::identity::models::Address;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::Profile;
use crate::domain::identity::models::Roles;
use crate::domain::identity::models::Username;
use crate::domain::identity::ports::CredentialStore;
use crate::identity::errors::StoreError;

const USERNAME_CONSTRAINT: &str = "identities_username_key";

/// Credential store backed by the `identities` table.
///
/// The unique constraint on `username` decides concurrent registrations.
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_by_username(&self, username: &Username) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, roles, first_name, last_name, email,
                   street, city, postal_index, created_at
            FROM identities
            WHERE username = $1
            "#,
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        row.map(|r| identity_from_row(&r)).transpose()
    }

    async fn insert(&self, identity: Identity) -> Result<Identity, StoreError> {
        let profile = &identity.profile;
        let address = profile.address.as_ref();

        sqlx::query(
            r#"
            INSERT INTO identities (id, username, password_hash, roles, first_name, last_name,
                                    email, street, city, postal_index, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(identity.id.0)
        .bind(identity.username.as_str())
        .bind(&identity.password_hash)
        .bind(identity.roles.labels())
        .bind(profile.first_name.as_deref())
        .bind(profile.last_name.as_deref())
        .bind(profile.email.as_ref().map(|e| e.as_str()))
        .bind(address.map(|a| a.street.as_str()))
        .bind(address.map(|a| a.city.as_str()))
        .bind(address.and_then(|a| a.postal_index))
        .bind(identity.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() && db_err.constraint() == Some(USERNAME_CONSTRAINT)
                {
                    return StoreError::DuplicateKey(identity.username.as_str().to_string());
                }
            }
            StoreError::Unavailable(e.to_string())
        })?;

        Ok(identity)
    }
}

fn identity_from_row(row: &PgRow) -> Result<Identity, StoreError> {
    let column = |e: sqlx::Error| StoreError::Corrupt(e.to_string());

    let id: Uuid = row.try_get("id").map_err(column)?;
    let username: String = row.try_get("username").map_err(column)?;
    let roles: Vec<String> = row.try_get("roles").map_err(column)?;
    let email: Option<String> = row.try_get("email").map_err(column)?;
    let street: Option<String> = row.try_get("street").map_err(column)?;
    let city: Option<String> = row.try_get("city").map_err(column)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(column)?;

    let address = match (street, city) {
        (Some(street), Some(city)) => Some(Address {
            street,
            city,
            postal_index: row.try_get("postal_index").map_err(column)?,
        }),
        _ => None,
    };

    Ok(Identity {
        id: IdentityId(id),
        username: Username::new(username).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        password_hash: row.try_get("password_hash").map_err(column)?,
        roles: Roles::parse(&roles).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        profile: Profile {
            first_name: row.try_get("first_name").map_err(column)?,
            last_name: row.try_get("last_name").map_err(column)?,
            email: email
                .map(EmailAddress::new)
                .transpose()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            address,
        },
        created_at,
    })
}
