use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Server-side record of one issued refresh token, keyed by the `jti` claim
/// embedded in the signed token. Rows are only ever mutated to flip
/// `revoked` from false to true; rotation and logout never delete them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub jti: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(jti: Uuid, user_id: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            jti,
            user_id,
            expires_at,
            revoked: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Image {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub public_id: String,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Image {
    pub fn new(user_id: Uuid, url: String, public_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            url,
            public_id,
            processed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_user_has_fresh_id() {
        let a = User::new("a@example.com".to_string(), "hash".to_string());
        let b = User::new("b@example.com".to_string(), "hash".to_string());
        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a@example.com".to_string(), "super_secret_hash".to_string());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("super_secret_hash"));
        assert!(json.contains("a@example.com"));
    }

    #[test]
    fn test_refresh_token_expiry() {
        let live = RefreshTokenRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Utc::now() + Duration::days(7),
        );
        assert!(!live.is_expired());
        assert!(!live.revoked);

        let stale = RefreshTokenRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Utc::now() - Duration::seconds(1),
        );
        assert!(stale.is_expired());
    }

    #[test]
    fn test_new_image_is_unprocessed() {
        let image = Image::new(
            Uuid::new_v4(),
            "https://cdn.example.com/abc.jpg".to_string(),
            "abc123".to_string(),
        );
        assert!(!image.processed);
    }
}
