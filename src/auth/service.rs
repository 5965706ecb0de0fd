use crate::auth::password::PasswordHasher;
use crate::auth::tokens::TokenManager;
use crate::db::models::{RefreshTokenRecord, User};
use crate::db::operations::DbOperations;
use crate::error::{AppError, AuthError, DatabaseError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// Orchestrates the session lifecycle: signup, login, refresh rotation and
/// logout. Token signing/verification is delegated to `TokenManager`,
/// password handling to `PasswordHasher`; this layer owns the sequencing and
/// the revocation checks against the store.
#[derive(Clone)]
pub struct AuthService {
    db: DbOperations,
    tokens: TokenManager,
    password: PasswordHasher,
}

impl AuthService {
    pub fn new(db: DbOperations, tokens: TokenManager, password: PasswordHasher) -> Self {
        Self { db, tokens, password }
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        validate_credentials(email, password)?;

        if self.db.get_user_by_email(email).await?.is_some() {
            return Err(AuthError::EmailAlreadyRegistered.into());
        }

        let password_hash = self.hash_password(password.to_string()).await?;
        let user = User::new(email.to_string(), password_hash);

        // The unique index closes the check-then-insert window against a
        // concurrent signup with the same email.
        let user = match self.db.create_user(&user).await {
            Ok(user) => user,
            Err(AppError::DatabaseError(DatabaseError::Duplicate)) => {
                return Err(AuthError::EmailAlreadyRegistered.into());
            }
            Err(e) => return Err(e),
        };

        info!("Created user {} for email {}", user.id, user.email);
        self.issue_pair(user.id, Utc::now()).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        // Unknown email and wrong password collapse to the same outward error.
        let user = match self.db.get_user_by_email(email).await? {
            Some(user) => user,
            None => {
                info!("Login rejected: no user for email {}", email);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let verified = self
            .verify_password(password.to_string(), user.password_hash.clone())
            .await?;
        if !verified {
            info!("Login rejected: password mismatch for user {}", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        self.issue_pair(user.id, Utc::now()).await
    }

    /// Exchange a refresh token for a new access/refresh pair. The presented
    /// token is single-use: it is revoked before its successor is issued, and
    /// the conditional revoke in the store arbitrates concurrent presentations
    /// of the same jti so at most one wins.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let now = Utc::now();
        let (subject, jti) = self.tokens.validate_refresh(refresh_token, now)?;

        match self.db.get_refresh_token_by_jti(jti).await? {
            None => {
                warn!("Refresh rejected: jti {} unknown to the store", jti);
                return Err(AuthError::InvalidToken.into());
            }
            Some(record) if record.revoked => {
                warn!("Refresh rejected: jti {} already revoked (replay)", jti);
                return Err(AuthError::InvalidToken.into());
            }
            Some(record) if record.expires_at < now => {
                warn!("Refresh rejected: jti {} expired in the store", jti);
                return Err(AuthError::InvalidToken.into());
            }
            Some(_) => {}
        }

        let rotated = self.db.revoke_refresh_token(jti, now).await?;
        if !rotated {
            warn!("Refresh rejected: jti {} lost the rotation race", jti);
            return Err(AuthError::InvalidToken.into());
        }

        self.issue_pair(subject, now).await
    }

    /// Revoke the presented refresh token on behalf of an authenticated user.
    /// The revocation is scoped to rows owned by `user_id`; an unknown,
    /// mismatched or already-revoked jti is a silent no-op so repeated logout
    /// calls succeed.
    pub async fn logout(&self, refresh_token: &str, user_id: Uuid) -> Result<(), AppError> {
        let now = Utc::now();
        let (_, jti) = self.tokens.validate_refresh(refresh_token, now)?;

        let revoked = self.db.revoke_refresh_token_for_user(jti, user_id).await?;
        if revoked {
            info!("User {} revoked refresh token {}", user_id, jti);
        } else {
            info!("Logout no-op for user {}: jti {} absent, foreign or already revoked", user_id, jti);
        }

        Ok(())
    }

    /// Resolve a presented access token to its user. Protected routes call
    /// this before touching any user-scoped data.
    pub async fn current_user(&self, access_token: &str) -> Result<User, AppError> {
        let subject = self.tokens.validate_access(access_token, Utc::now())?;

        self.db
            .get_user_by_id(subject)
            .await?
            .ok_or_else(|| AuthError::InvalidToken.into())
    }

    async fn issue_pair(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<TokenPair, AppError> {
        let access_token = self.tokens.issue_access(user_id, now)?;
        let issued = self.tokens.issue_refresh(user_id, now)?;

        self.db
            .create_refresh_token(&RefreshTokenRecord::new(issued.jti, user_id, issued.expires_at))
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token: issued.token,
            token_type: "bearer".to_string(),
        })
    }

    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.password.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))?
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = self.password.clone();
        let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))?;
        Ok(verified)
    }
}

const MIN_PASSWORD_LENGTH: usize = 8;

fn validate_credentials(email: &str, password: &str) -> Result<(), AppError> {
    let looks_like_email = email.len() >= 3
        && !email.contains(char::is_whitespace)
        && email.split_once('@').map_or(false, |(local, domain)| {
            !local.is_empty() && domain.contains('.')
        });
    if !looks_like_email {
        return Err(AppError::ValidationError("Invalid email address".to_string()));
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    Ok(())
}
