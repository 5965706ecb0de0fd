use actix_web::{web, App, HttpServer};
use actix_cors::Cors;
use photoflow_server::{health_check, AppState, Settings};
use photoflow_server::auth::handlers::{login, logout, refresh, signup};
use photoflow_server::images::handlers::{delete_image, get_image, list_images, upload_image};
use photoflow_server::images::MAX_IMAGE_BYTES;
use dotenv::dotenv;
use std::net::TcpListener;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[actix_web::main]
async fn main() -> photoflow_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully");

    info!("Starting server at {}:{}", config.server.host, config.server.port);

    // Initialize application state
    let state = AppState::new(config.clone()).await?;
    let state = web::Data::new(state);

    // Periodic maintenance: sweep expired refresh-token rows and idle
    // rate-limit windows
    let sweep_state = state.clone();
    tokio::spawn(async move {
        loop {
            match sweep_state
                .db
                .delete_expired_refresh_tokens(chrono::Utc::now())
                .await
            {
                Ok(0) => {}
                Ok(swept) => info!("Swept {} expired refresh tokens", swept),
                Err(e) => warn!("Refresh token sweep failed: {}", e),
            }

            sweep_state.rate_limiter.cleanup().await;

            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    });

    // Create and bind TCP listener
    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;

    // Start HTTP server
    HttpServer::new(move || {
        let cors = if config.cors.enabled {
            let cors_config = Cors::default();

            // Apply specific CORS rules based on configuration
            let cors_config = if config.cors.allow_any_origin {
                cors_config
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .expose_any_header()
            } else {
                // More restrictive CORS for production use
                cors_config
                    .allowed_origin("https://app.photoflow.example.com")
                    .allowed_origin("http://localhost:8080")
                    .allowed_origin("http://127.0.0.1:8080")
                    .allowed_methods(vec!["GET", "POST", "DELETE"])
                    .allowed_headers(vec!["Authorization", "Content-Type"])
                    .supports_credentials()
            };

            // Set max age
            cors_config.max_age(config.cors.max_age as usize)
        } else {
            // CORS disabled - use most restrictive settings
            Cors::default()
        };

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            // Uploads arrive as a raw body; allow up to the image limit
            .app_data(web::PayloadConfig::new(MAX_IMAGE_BYTES + 4096))
            .route("/health", web::get().to(health_check))
            .route("/auth/signup", web::post().to(signup))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
            .route("/images/upload", web::post().to(upload_image))
            .route("/images", web::get().to(list_images))
            .route("/images/{image_id}", web::get().to(get_image))
            .route("/images/{image_id}", web::delete().to(delete_image))
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await?;

    Ok(())
}
