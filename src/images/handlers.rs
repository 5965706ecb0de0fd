use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::bearer_token;
use crate::auth::handlers::enforce_rate_limit;
use crate::db::models::{Image, User};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::AppState;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MIN_IMAGE_BYTES: usize = 1024;

const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

async fn authenticate(req: &HttpRequest, state: &AppState) -> Result<User, AppError> {
    enforce_rate_limit(req, state).await?;
    let token = bearer_token(req)?;
    state.auth.current_user(token).await
}

fn validate_upload(size: usize, content_type: &str) -> Result<(), AppError> {
    if size > MAX_IMAGE_BYTES {
        return Err(AppError::ValidationError(
            "Image file is too large. Maximum size is 10MB.".to_string(),
        ));
    }
    if size < MIN_IMAGE_BYTES {
        return Err(AppError::ValidationError(
            "Image file is too small. Minimum size is 1KB.".to_string(),
        ));
    }
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(AppError::ValidationError(
            "Invalid image file type. Only JPEG, PNG, and GIF are allowed.".to_string(),
        ));
    }
    Ok(())
}

pub async fn upload_image(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate(&req, &state).await?;

    let content_type = req
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string();

    validate_upload(body.len(), &content_type)?;

    info!("Uploading {} byte {} image for user {}", body.len(), content_type, user.id);

    let stored = state.storage.upload(body.to_vec(), &content_type).await?;

    let image = Image::new(user.id, stored.url, stored.public_id);
    let image = match state.db.create_image(&image).await {
        Ok(image) => image,
        Err(e) => {
            // The bytes are at the provider but the row is not; clean up so
            // the account does not accumulate unreachable assets.
            error!("Failed to persist image row, removing {} from storage: {}", image.public_id, e);
            if let Err(cleanup) = state.storage.delete(&image.public_id).await {
                warn!("Orphaned upload {} could not be removed: {}", image.public_id, cleanup);
            }
            return Err(e);
        }
    };

    Ok(HttpResponse::Created().json(image))
}

pub async fn get_image(
    req: HttpRequest,
    image_id: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate(&req, &state).await?;

    let image = state
        .db
        .get_image_by_id(*image_id)
        .await?
        .ok_or(AppError::DatabaseError(DatabaseError::NotFound))?;

    if image.user_id != user.id {
        warn!("User {} denied access to image {} owned by {}", user.id, image.id, image.user_id);
        return Err(AuthError::Forbidden.into());
    }

    Ok(HttpResponse::Ok().json(image))
}

pub async fn list_images(
    req: HttpRequest,
    query: web::Query<ListQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate(&req, &state).await?;

    let skip = query.skip.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let images = state.db.list_images_by_user(user.id, skip, limit).await?;

    Ok(HttpResponse::Ok().json(images))
}

pub async fn delete_image(
    req: HttpRequest,
    image_id: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate(&req, &state).await?;

    let image = state
        .db
        .get_image_by_id(*image_id)
        .await?
        .ok_or(AppError::DatabaseError(DatabaseError::NotFound))?;

    if image.user_id != user.id {
        warn!("User {} denied deletion of image {} owned by {}", user.id, image.id, image.user_id);
        return Err(AuthError::Forbidden.into());
    }

    state.storage.delete(&image.public_id).await?;

    let deleted = state
        .db
        .delete_image(image.id)
        .await?
        .ok_or(AppError::DatabaseError(DatabaseError::NotFound))?;

    info!("User {} deleted image {}", user.id, deleted.id);

    Ok(HttpResponse::Ok().json(deleted))
}
