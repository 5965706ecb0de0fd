use actix_web::{web, HttpResponse, HttpRequest};
use serde::Deserialize;
use crate::AppState;
use crate::error::{AppError, AuthError};
use tracing::{info, warn, error};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Pull the bearer access token out of the Authorization header.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AuthError::InvalidToken.into())
}

fn client_key(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) async fn enforce_rate_limit(req: &HttpRequest, state: &AppState) -> Result<(), AppError> {
    if !state.rate_limiter.check_rate_limit(&client_key(req)).await {
        warn!("Rate limit exceeded for client {}", client_key(req));
        return Err(AuthError::RateLimited.into());
    }
    Ok(())
}

pub async fn signup(
    http_req: HttpRequest,
    req: web::Json<SignupRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    enforce_rate_limit(&http_req, &state).await?;
    info!("Received signup request for email: {}", req.email);

    match state.auth.signup(&req.email, &req.password).await {
        Ok(pair) => {
            info!("Signup successful for email: {}", req.email);
            Ok(HttpResponse::Created().json(pair))
        }
        Err(e) => {
            error!("Signup failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

pub async fn login(
    http_req: HttpRequest,
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    enforce_rate_limit(&http_req, &state).await?;
    info!("Received login request for email: {}", req.email);

    match state.auth.login(&req.email, &req.password).await {
        Ok(pair) => {
            info!("Login successful for email: {}", req.email);
            Ok(HttpResponse::Ok().json(pair))
        }
        Err(e) => {
            error!("Login failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

pub async fn refresh(
    http_req: HttpRequest,
    req: web::Json<RefreshRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    enforce_rate_limit(&http_req, &state).await?;

    match state.auth.refresh(&req.refresh_token).await {
        Ok(pair) => Ok(HttpResponse::Ok().json(pair)),
        Err(e) => {
            error!("Token refresh failed: {}", e);
            Err(e)
        }
    }
}

pub async fn logout(
    http_req: HttpRequest,
    req: web::Json<RefreshRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    enforce_rate_limit(&http_req, &state).await?;

    // Logout requires an authenticated caller; the refresh token in the body
    // is only revocable by its owner.
    let access_token = bearer_token(&http_req)?;
    let user = state.auth.current_user(access_token).await?;

    state.auth.logout(&req.refresh_token, user.id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Refresh token revoked, user logged out"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_bearer_token_extraction() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_or_malformed_authorization_rejected() {
        let req = TestRequest::default().to_http_request();
        assert!(bearer_token(&req).is_err());

        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic dXNlcjpwdw=="))
            .to_http_request();
        assert!(bearer_token(&req).is_err());
    }
}
