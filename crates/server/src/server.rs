use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use chrono::Duration;
use serde::Serialize;

use std::{future::Future, sync::Arc};

use crate::{
    ServerError, accounts, categories, goals, investments, recurring, reports, subscriptions,
    transactions, users,
};
use engine::{Engine, EngineError};

/// Knobs of the manual recurring run (`POST /recurring/run`); the scheduler
/// of the app uses the same values.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::seconds(30),
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub options: ServerOptions,
}

/// Resolves HTTP Basic credentials (`email:password`) to the user and stores
/// it in the request extensions.
async fn auth(
    State(state): State<ServerState>,
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let unauthorized = || ServerError::Engine(EngineError::Unauthorized("invalid credentials".to_string()));
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(unauthorized());
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(unauthorized());
    }

    let user = state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/me", get(users::me).patch(users::update))
        .route("/me/password", post(users::change_password))
        .route("/accounts", get(accounts::list).post(accounts::create))
        .route(
            "/accounts/{id}",
            get(accounts::get)
                .patch(accounts::update)
                .delete(accounts::delete),
        )
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/{id}",
            axum::routing::patch(categories::update).delete(categories::delete),
        )
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::delete),
        )
        .route(
            "/transactions/{id}/attachments",
            post(transactions::add_attachment),
        )
        .route(
            "/transactions/{id}/attachments/{attachment_id}",
            axum::routing::delete(transactions::remove_attachment),
        )
        .route("/recurring", get(recurring::list))
        .route("/recurring/run", post(recurring::run))
        .route("/recurring/stats", get(recurring::stats))
        .route("/recurring/{id}", axum::routing::delete(recurring::cancel))
        .route("/goals", get(goals::list).post(goals::create))
        .route(
            "/goals/{id}",
            get(goals::get).patch(goals::update).delete(goals::delete),
        )
        .route("/goals/{id}/contributions", post(goals::contribute))
        .route(
            "/investments",
            get(investments::list).post(investments::create),
        )
        .route("/investments/portfolio", get(investments::portfolio))
        .route(
            "/investments/{id}",
            get(investments::get)
                .patch(investments::update)
                .delete(investments::delete),
        )
        .route("/investments/{id}/price", put(investments::update_price))
        .route(
            "/subscriptions",
            get(subscriptions::list).post(subscriptions::create),
        )
        .route("/subscriptions/upcoming", get(subscriptions::upcoming))
        .route("/subscriptions/summary", get(subscriptions::summary))
        .route(
            "/subscriptions/{id}",
            get(subscriptions::get)
                .patch(subscriptions::update)
                .delete(subscriptions::delete),
        )
        .route("/subscriptions/{id}/pay", post(subscriptions::pay))
        .route("/reports/summary", get(reports::summary))
        .route("/reports/monthly", get(reports::monthly))
        .route("/reports/categories", get(reports::categories))
        .route("/reports/net-worth", get(reports::net_worth))
        .route("/reports/export", get(reports::export))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    Router::new()
        .route("/health", get(health))
        .route("/users", post(users::register))
        .merge(protected)
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn run_with_listener<F>(
    engine: Arc<Engine>,
    options: ServerOptions,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine, options };

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Binds `addr` and serves until `shutdown` resolves.
pub async fn run<F>(
    engine: Arc<Engine>,
    options: ServerOptions,
    addr: &str,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    run_with_listener(engine, options, listener, shutdown).await
}
