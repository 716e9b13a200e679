// src/main.rs
mod config;
mod dtos;
mod error;
mod handlers;
mod middleware;
mod models;
mod procedures;
mod repositories;
mod services;
#[cfg(test)]
mod test_support;
mod views;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use log::{error, info};
use reqwest::Client;

use crate::config::{AppConfig, SessionKey};
use crate::handlers::page_handlers::{compose, home, profile, single_post};
use crate::handlers::rpc_handlers::{rpc_mutation, rpc_query};
use crate::middleware::origin_guard::AllowedOrigins;
use crate::repositories::identity_repo::{ClerkIdentityRepo, IdentityProvider};
use crate::repositories::post_repository::{PgPostRepository, PostStore};
use crate::services::page_cache::PageCache;
use crate::services::rate_limiter::{POST_CREATE_TOKENS, POST_CREATE_WINDOW, RateLimiter, UpstashRateLimiter};
use crate::services::session_services::SessionVerifier;

fn mask_key(k: &str) -> String {
    if k.len() <= 8 { "[REDACTED]".to_string() }
    else { format!("{}***{}", &k[..4], &k[k.len()-4..]) }
}

/// Collaborators shared by every request. Built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<dyn PostStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

fn exit_with(msg: &str, err: impl std::fmt::Display) -> ! {
    error!("{}: {}", msg, err);
    std::process::exit(1);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let app_config = AppConfig::from_env().unwrap_or_else(|e| exit_with("invalid configuration", format!("{:#}", e)));

    info!("Identity API: {}", app_config.identity_api_url);
    info!("Identity key: {}", mask_key(&app_config.identity_secret_key));
    info!("Rate limit counter: {} (token {})", app_config.ratelimit_url, mask_key(&app_config.ratelimit_token));

    let pg_pool = config::get_pg_pool().unwrap_or_else(|e| exit_with("Failed to create PG pool", format!("{:#}", e)));
    let post_repo = PgPostRepository::new(pg_pool);
    if let Err(e) = post_repo.ensure_schema().await {
        exit_with("Failed to prepare posts table", e);
    }

    let http_client = Client::builder()
        .user_agent("chirp-be/0.1")
        .build()
        .unwrap_or_else(|e| exit_with("failed to build http client", e));

    let identity = ClerkIdentityRepo::new(http_client.clone(), &app_config.identity_api_url, &app_config.identity_secret_key)
        .unwrap_or_else(|e| exit_with("invalid identity provider key", e));

    let rate_limiter = UpstashRateLimiter::new(
        http_client,
        &app_config.ratelimit_url,
        &app_config.ratelimit_token,
        &app_config.ratelimit_prefix,
        POST_CREATE_TOKENS,
        POST_CREATE_WINDOW,
    );

    let verifier = match &app_config.session_key {
        SessionKey::RsaPem(pem) => SessionVerifier::from_rsa_pem(pem.as_bytes())
            .unwrap_or_else(|e| exit_with("invalid CLERK_JWT_KEY", e)),
        SessionKey::Secret(secret) => SessionVerifier::from_secret(secret.as_bytes()),
    };

    let state = web::Data::new(AppState {
        posts: Arc::new(post_repo),
        identity: Arc::new(identity),
        rate_limiter: Arc::new(rate_limiter),
    });
    let verifier = web::Data::new(verifier);
    let pages = web::Data::new(PageCache::new(app_config.page_revalidate));

    let bind_address = format!("0.0.0.0:{}", app_config.port);
    info!("Starting server on {}", bind_address);

    let allowed_origins = app_config.allowed_origins.clone();
    let form_origins = web::Data::new(AllowedOrigins::new(&allowed_origins));

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["authorization", "content-type", "accept"])
            .supports_credentials()
            .max_age(3600);

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(verifier.clone())
            .app_data(pages.clone())
            .app_data(form_origins.clone())
            .service(rpc_query)        // GET /api/trpc/{procedure}
            .service(rpc_mutation)     // POST /api/trpc/{procedure}
            .service(home)             // GET /
            .service(compose)          // POST /
            .service(single_post)      // GET /post/{id}
            .service(profile)          // GET /@{username}
    })
    .bind(&bind_address)?
    .run()
    .await
}
