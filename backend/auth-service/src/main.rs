use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::Context;
use api_error::ErrorEnvelope;
use auth_filter::AuthenticationFilter;
use jwt_auth::JwtAuthority;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_service::{config::Config, handlers};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    info!("starting auth-service on {}:{}", config.host, config.port);

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("database migrations applied");

    let authority = Arc::new(JwtAuthority::new(
        &config.jwt_secret,
        config.jwt_access_ttl_secs,
        config.jwt_refresh_ttl_secs,
    ));

    let bind_addr = (config.host.clone(), config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(authority.clone()))
            .wrap(AuthenticationFilter::new(authority.clone()))
            .wrap(ErrorEnvelope)
            .wrap(TracingLogger::default())
            .route("/health", web::get().to(health))
            .service(
                web::scope("/api/auth")
                    .route("/register", web::post().to(handlers::auth::register))
                    .route("/login", web::post().to(handlers::auth::login))
                    .route("/refresh", web::post().to(handlers::auth::refresh))
                    .route("/me", web::get().to(handlers::auth::me))
                    .route("/users", web::get().to(handlers::auth::list_users)),
            )
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "UP" }))
}
