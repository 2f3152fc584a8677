use actix_web::{web, App, HttpServer};
use anyhow::Context;
use api_error::ErrorEnvelope;
use auth_filter::AuthenticationFilter;
use jwt_auth::JwtAuthority;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use enrollment_service::clients::{CourseApi, HttpCourseClient};
use enrollment_service::services::EnrollmentService;
use enrollment_service::{config::Config, handlers};

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
    info!(
        "starting enrollment-service on {}:{}",
        config.host, config.port
    );

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

    // Verification only; this service never issues tokens.
    let authority = Arc::new(JwtAuthority::new(
        &config.jwt_secret,
        jwt_auth::DEFAULT_ACCESS_TTL_SECS,
        jwt_auth::DEFAULT_REFRESH_TTL_SECS,
    ));

    let courses: Arc<dyn CourseApi> = Arc::new(
        HttpCourseClient::new(&config.course_service_url)
            .context("failed to build course client")?,
    );
    let service = EnrollmentService::new(pool.clone(), courses);

    let bind_addr = (config.host.clone(), config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(service.clone()))
            .wrap(AuthenticationFilter::new(authority.clone()))
            .wrap(ErrorEnvelope)
            .wrap(TracingLogger::default())
            .route("/health", web::get().to(handlers::enrollments::health))
            .service(
                web::scope("/api/enrollments")
                    .route("", web::post().to(handlers::enrollments::enroll))
                    .route("/my", web::get().to(handlers::enrollments::my_enrollments))
                    .route(
                        "/courses/{courseId}/enrollments",
                        web::get().to(handlers::enrollments::course_enrollments),
                    )
                    .route(
                        "/courses/{courseId}/stats",
                        web::get().to(handlers::enrollments::course_stats),
                    )
                    .route(
                        "/{id}",
                        web::get().to(handlers::enrollments::get_enrollment),
                    )
                    .route(
                        "/{id}/progress",
                        web::patch().to(handlers::enrollments::update_progress),
                    )
                    .route("/{id}", web::delete().to(handlers::enrollments::cancel))
                    .route(
                        "/{id}/certificate",
                        web::post().to(handlers::enrollments::issue_certificate),
                    ),
            )
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}
