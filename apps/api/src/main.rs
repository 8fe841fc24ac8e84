mod auth;
mod env;
mod error;
mod openapi;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::MatchedPath;
use axum::http::Request;
use axum::{Router, body::Body};
use confab_broker::{Publisher, Subscriber, TaskQueues};
use confab_bus::Bus;
use confab_chat::ChatEngine;
use confab_external::stub::{DocxRsRenderer, HttpLlm, HttpUpstream};
use confab_store::{ObjectStore, Store};
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::{
    classify::ServerErrorsFailureClass,
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::prelude::*;

use env::env;
use state::AppState;

async fn build_state() -> AppState {
    let cfg = env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database.database_url)
        .await
        .expect("failed to connect to database");
    confab_store::run_migrations(&pool)
        .await
        .expect("failed to run migrations");

    let store = Store::new(pool.clone());
    let objects = ObjectStore::new(cfg.objects.shared_audio_path.clone());
    let queues = TaskQueues::connect(pool.clone())
        .await
        .expect("failed to connect task queues");
    let publisher = Publisher::new(pool.clone());
    let bus = Bus::new();

    let subscriber = Subscriber::connect(&pool)
        .await
        .expect("failed to connect job_updates subscriber");
    tokio::spawn(confab_bus::run_bus_listener(subscriber, bus.clone()));

    let llm_upstream = HttpUpstream::new(cfg.llm.llm_endpoint.clone(), cfg.llm.llm_api_key.clone());
    let llm: Arc<dyn confab_external::Llm> = Arc::new(HttpLlm(llm_upstream));
    let docx: Arc<dyn confab_external::DocxRenderer> = Arc::new(DocxRsRenderer);

    let chat = Arc::new(ChatEngine::new(store.clone(), llm.clone(), cfg.chat.chat_history_limit));

    AppState {
        store,
        objects,
        queues: Arc::new(tokio::sync::Mutex::new(queues)),
        publisher,
        bus,
        llm,
        docx,
        chat,
        chat_history_limit: cfg.chat.chat_history_limit,
    }
}

async fn app() -> Router {
    let state = build_state().await;

    routes::router()
        .with_state(state)
        .route("/openapi.json", axum::routing::get(openapi_json))
        .layer(
            CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods(cors::Any)
                .allow_headers(cors::Any),
        )
        .layer(
            ServiceBuilder::new()
                .layer(NewSentryLayer::<Request<Body>>::new_from_top())
                .layer(SentryHttpLayer::new().enable_transaction())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &Request<Body>| {
                            let path = request.uri().path();

                            if path == "/health" {
                                return tracing::Span::none();
                            }

                            let method = request.method();
                            let matched_path = request
                                .extensions()
                                .get::<MatchedPath>()
                                .map(MatchedPath::as_str)
                                .unwrap_or(path);

                            tracing::info_span!(
                                "http_request",
                                method = %method,
                                http.route = %matched_path,
                                otel.name = %format!("{} {}", method, matched_path),
                                span.op = "http.server",
                            )
                        })
                        .on_request(|request: &Request<Body>, _span: &tracing::Span| {
                            if request.uri().path() == "/health" {
                                return;
                            }
                            tracing::info!(
                                method = %request.method(),
                                path = %request.uri().path(),
                                "http_request_started"
                            );
                        })
                        .on_response(
                            |response: &axum::http::Response<axum::body::Body>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                if span.is_disabled() {
                                    return;
                                }
                                tracing::info!(
                                    parent: span,
                                    http_status = %response.status().as_u16(),
                                    latency_ms = %latency.as_millis(),
                                    "http_request_finished"
                                );
                            },
                        )
                        .on_failure(
                            |failure_class: ServerErrorsFailureClass,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                if span.is_disabled() {
                                    return;
                                }
                                tracing::error!(
                                    parent: span,
                                    failure_class = ?failure_class,
                                    latency_ms = %latency.as_millis(),
                                    "http_request_failed"
                                );
                            },
                        ),
                ),
        )
}

fn main() -> std::io::Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    let env = env();

    let _guard = sentry::init(sentry::ClientOptions {
        dsn: env.sentry_dsn.as_ref().and_then(|s| s.parse().ok()),
        release: option_env!("APP_VERSION").map(|v| format!("confab-api@{}", v).into()),
        environment: Some(
            if cfg!(debug_assertions) {
                "development"
            } else {
                "production"
            }
            .into(),
        ),
        traces_sample_rate: 1.0,
        sample_rate: 1.0,
        send_default_pii: true,
        auto_session_tracking: true,
        session_mode: sentry::SessionMode::Request,
        attach_stacktrace: true,
        max_breadcrumbs: 100,
        ..Default::default()
    });

    sentry::configure_scope(|scope| {
        scope.set_tag("service", "confab-api");
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(sentry::integrations::tracing::layer())
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let addr = SocketAddr::from(([0, 0, 0, 0], env.port));
            tracing::info!(addr = %addr, "server_listening");

            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            axum::serve(listener, app().await)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .unwrap();
        });

    if let Some(client) = sentry::Hub::current().client() {
        client.close(Some(Duration::from_secs(2)));
    }

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("shutdown_signal_received");
}

async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(openapi::openapi())
}
