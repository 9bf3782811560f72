use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use podcast_service::clients::{Mailer, ObjectStorage, PaymentGateway, PiGateway};
use podcast_service::handlers;
use podcast_service::services::LoginVerifier;
use podcast_service::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn health_summary(pool: web::Data<PgPool>) -> HttpResponse {
    match sqlx::query("SELECT 1").fetch_one(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "podcast-service",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "podcast-service",
        })),
    }
}

async fn root_banner() -> HttpResponse {
    HttpResponse::Ok().body("Podcast backend is running")
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting podcast-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    if config.gateway.api_key.is_none() {
        tracing::warn!("PI_API_KEY not set; payment gateway calls will fail");
    }

    // Database pool + migrations
    let pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {}", e);
            eprintln!("ERROR: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Migration failed: {}", e);
        io::Error::new(io::ErrorKind::Other, e)
    })?;
    tracing::info!("Migrations completed");

    // External clients
    let gateway: Arc<dyn PaymentGateway> = Arc::new(
        PiGateway::new(&config.gateway)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?,
    );
    let storage = Arc::new(ObjectStorage::new(&config.storage).await);
    let mailer = Arc::new(Mailer::new(config.smtp.clone()));
    let verifier = Arc::new(
        LoginVerifier::from_spki_hex(&config.auth.login_public_key_hex)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?,
    );

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let pool_data = web::Data::new(pool);
    let gateway_data = web::Data::new(gateway);
    let storage_data = web::Data::new(storage);
    let mailer_data = web::Data::new(mailer);
    let verifier_data = web::Data::new(verifier);

    HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in config.cors.allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(pool_data.clone())
            .app_data(gateway_data.clone())
            .app_data(storage_data.clone())
            .app_data(mailer_data.clone())
            .app_data(verifier_data.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/", web::get().to(root_banner))
            .route("/health", web::get().to(health_summary))
            .route("/podcasts", web::get().to(handlers::podcasts::list_podcasts))
            .route("/upload", web::post().to(handlers::podcasts::upload_podcast))
            .route("/tip", web::post().to(handlers::tips::create_tip))
            .route("/tips/{username}", web::get().to(handlers::tips::list_tips))
            .route(
                "/total-tips/{username}",
                web::get().to(handlers::tips::total_tips),
            )
            .route(
                "/tips-since-last-payout/{username}",
                web::get().to(handlers::tips::tips_since_last_payout),
            )
            .route(
                "/report-podcast",
                web::post().to(handlers::moderation::report_podcast),
            )
            .route(
                "/request-payout",
                web::post().to(handlers::payouts::request_payout),
            )
            .route(
                "/request-manual-payout",
                web::post().to(handlers::payouts::request_manual_payout),
            )
            .route("/verify-login", web::post().to(handlers::auth::verify_login))
            .route(
                "/approve-payment",
                web::post().to(handlers::payouts::approve_payment),
            )
            .route(
                "/complete-payment",
                web::post().to(handlers::payouts::complete_payment),
            )
            .route(
                "/wallet-address/{username}",
                web::get().to(handlers::wallet::get_wallet_address),
            )
            .route(
                "/wallet-address",
                web::post().to(handlers::wallet::save_wallet_address),
            )
            .service(
                web::scope("/admin")
                    .route(
                        "/payout-requests",
                        web::get().to(handlers::admin::list_payout_requests),
                    )
                    .route(
                        "/payout-requests/{username}/fulfill",
                        web::patch().to(handlers::admin::fulfill_payout_request),
                    )
                    .route("/payouts", web::get().to(handlers::admin::list_payouts))
                    .route(
                        "/manual-payout",
                        web::post().to(handlers::admin::record_manual_payout),
                    )
                    .route(
                        "/payouts/{id}/txid",
                        web::patch().to(handlers::admin::set_payout_txid),
                    )
                    .route(
                        "/payouts/{id}/fulfill",
                        web::patch().to(handlers::admin::fulfill_payout),
                    )
                    .route(
                        "/podcasts",
                        web::delete().to(handlers::podcasts::clear_podcasts),
                    ),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
