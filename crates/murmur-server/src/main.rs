use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use murmur_api::mailer::Mailer;
use murmur_api::router::build_router;
use murmur_api::state::AppStateInner;
use murmur_api::suggest::Suggester;

const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_SUGGEST_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("MURMUR_JWT_SECRET").unwrap_or_else(|_| {
        warn!("MURMUR_JWT_SECRET not set, using development secret");
        "dev-secret-change-me".into()
    });
    let db_path = std::env::var("MURMUR_DB_PATH").unwrap_or_else(|_| "murmur.db".into());
    let host = std::env::var("MURMUR_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("MURMUR_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let upstream_timeout = Duration::from_secs(
        std::env::var("MURMUR_UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()?,
    );

    // Init database
    let db = murmur_db::Database::open(&PathBuf::from(&db_path))?;

    // Collaborators degrade to local modes when unconfigured, so a dev
    // checkout runs with no keys at all.
    let mailer = match std::env::var("MURMUR_MAIL_API_KEY") {
        Ok(api_key) => Mailer::http(
            std::env::var("MURMUR_MAIL_API_URL")
                .unwrap_or_else(|_| DEFAULT_MAIL_API_URL.into()),
            api_key,
            std::env::var("MURMUR_MAIL_FROM")
                .unwrap_or_else(|_| "Murmur <onboarding@resend.dev>".into()),
            upstream_timeout,
        )?,
        Err(_) => {
            warn!("MURMUR_MAIL_API_KEY not set, verification codes are logged instead of emailed");
            Mailer::LogOnly
        }
    };

    let suggester = match std::env::var("MURMUR_SUGGEST_API_KEY") {
        Ok(api_key) => Suggester::http(
            std::env::var("MURMUR_SUGGEST_API_URL")
                .unwrap_or_else(|_| DEFAULT_SUGGEST_API_URL.into()),
            api_key,
            upstream_timeout,
        )?,
        Err(_) => Suggester::Static,
    };

    // Shared state
    let state = Arc::new(AppStateInner {
        db,
        jwt_secret,
        mailer,
        suggester,
    });

    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Murmur server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
