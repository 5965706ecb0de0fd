use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, decode, Header, EncodingKey, DecodingKey, Validation, Algorithm};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub exp: i64,     // Expiration time
    pub iat: i64,     // Issued at
    #[serde(rename = "type")]
    pub kind: TokenKind,
    // Present on refresh tokens only; the server-side revocation key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// A freshly minted refresh token together with the identity the caller must
/// persist before handing the token out.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Stateless issuer and validator for HS256-signed bearer tokens.
///
/// Issuance is a pure function of (subject, now) plus the jti generator;
/// validation never touches storage. Revocation lookups belong to the
/// `AuthService` orchestration above this layer.
#[derive(Clone)]
pub struct TokenManager {
    secret: String,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenManager {
    pub fn new(
        secret: String,
        algorithm: Algorithm,
        access_expiry_minutes: i64,
        refresh_expiry_days: i64,
    ) -> Self {
        Self {
            secret,
            algorithm,
            access_ttl: Duration::minutes(access_expiry_minutes),
            refresh_ttl: Duration::days(refresh_expiry_days),
        }
    }

    pub fn issue_access(&self, subject: Uuid, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + self.access_ttl).timestamp(),
            iat: now.timestamp(),
            kind: TokenKind::Access,
            jti: None,
        };

        let token = encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }

    pub fn issue_refresh(
        &self,
        subject: Uuid,
        now: DateTime<Utc>,
    ) -> Result<IssuedRefreshToken, AppError> {
        // The jti exists before the token does, so the caller can persist the
        // revocation row for exactly the identity embedded in the signature.
        let jti = Uuid::new_v4();
        let expires_at = now + self.refresh_ttl;

        let claims = Claims {
            sub: subject.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            kind: TokenKind::Refresh,
            jti: Some(jti.to_string()),
        };

        let token = encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(IssuedRefreshToken { token, jti, expires_at })
    }

    pub fn validate_access(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AppError> {
        let claims = self.decode(token, now)?;

        if claims.kind != TokenKind::Access {
            warn!("Rejected token: type {:?} presented where access was required", claims.kind);
            return Err(AuthError::InvalidToken.into());
        }

        self.parse_subject(&claims)
    }

    pub fn validate_refresh(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(Uuid, Uuid), AppError> {
        let claims = self.decode(token, now)?;

        if claims.kind != TokenKind::Refresh {
            warn!("Rejected token: type {:?} presented where refresh was required", claims.kind);
            return Err(AuthError::InvalidToken.into());
        }

        let subject = self.parse_subject(&claims)?;

        let jti = claims
            .jti
            .as_deref()
            .and_then(|jti| Uuid::parse_str(jti).ok())
            .ok_or_else(|| {
                warn!("Rejected refresh token with missing or unparseable jti claim");
                AuthError::MalformedToken
            })?;

        Ok((subject, jti))
    }

    fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AppError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked against the caller-supplied clock below, with
        // zero leeway; the library check is against the system clock.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?
        .claims;

        if claims.exp < now.timestamp() {
            return Err(AuthError::TokenExpired.into());
        }

        Ok(claims)
    }

    fn parse_subject(&self, claims: &Claims) -> Result<Uuid, AppError> {
        Uuid::parse_str(&claims.sub).map_err(|_| {
            warn!("Rejected token with non-UUID sub claim");
            AuthError::MalformedToken.into()
        })
    }
}
