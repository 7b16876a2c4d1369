use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use server::config::ServerConfig;
use server::routes::{app, resolve_voice, AppState};
use tts_core::{
    EngineConfig, GraphemeBackend, LexiconBackend, OrtBackend, Phonemizer, TtsEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting TTS server...");

    let config = ServerConfig::from_env();
    info!(
        "Server configuration loaded: port={}, model={}, rate_limit={}/min",
        config.port, config.model_id, config.rate_limit_per_minute
    );

    // A failed model load leaves the server up and answering 503, so
    // health checks and deploys can still observe the process.
    let engine = match build_engine(&config) {
        Ok(engine) => {
            info!("Loaded {} voices", engine.voices().len());
            Some(Arc::new(engine))
        }
        Err(e) => {
            error!("Could not load TTS model: {e}. Serving without a model.");
            None
        }
    };

    let state = AppState {
        engine,
        config: config.clone(),
    };

    // CORS configuration - environment-aware
    let cors = if let Some(ref allowed_origins) = config.cors_allowed_origins {
        let origins: Vec<axum::http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin: &String| origin.parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
            permissive_cors()
        } else {
            info!("CORS configured for {} origin(s)", origins.len());
            CorsLayer::new()
                .allow_origin(tower_http::cors::AllowOrigin::list(origins))
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(tower_http::cors::Any)
                .allow_credentials(false)
        }
    } else {
        warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        permissive_cors()
    };

    // Global rate limit; per-IP extraction is unreliable behind the
    // usual Docker/proxy setups.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second((config.rate_limit_per_minute / 60).max(1) as u64)
            .burst_size(config.rate_limit_per_minute)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );
    info!("Rate limiting: {} requests per minute", config.rate_limit_per_minute);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors)
        .into_inner();

    let router: Router = app(state)
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT."))?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, router).await?;
    Ok(())
}

fn build_engine(config: &ServerConfig) -> anyhow::Result<TtsEngine> {
    let backend = OrtBackend::load(&config.model_path, &config.voices_path, config.sample_rate)?;
    let lexicon = LexiconBackend::from_file(&config.lexicon_path)?;
    info!("Loaded lexicon with {} entries", lexicon.len());
    let phonemizer = Phonemizer::new(Box::new(lexicon), Box::new(GraphemeBackend::for_model()));

    Ok(TtsEngine::new(
        Box::new(backend),
        phonemizer,
        EngineConfig {
            max_chunk_symbols: config.max_chunk_symbols,
            crossfade_ms: config.crossfade_ms,
            default_voice: resolve_voice(&config.default_voice),
        },
    ))
}

fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
        .allow_credentials(false)
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    if let Ok(value) = axum::http::HeaderValue::from_str(&request_id) {
        request.headers_mut().insert("x-request-id", value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert("x-request-id", value);
        response
    } else {
        next.run(request).await
    }
}
