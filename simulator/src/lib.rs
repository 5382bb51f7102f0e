use axum::{
    body::Bytes,
    extract::{Query, State as AxumState},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::{
    sync::{Mutex, MutexGuard},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};
use tripledice_execution::{AccountStore, Engine, Error, GameRng, Roller, Timing};
use tripledice_types::{
    api::{
        Ack, AuthRequest, AuthResponse, ClaimResponse, NicknameRequest, Policy, StakeRequest,
        Status,
    },
    Account, Outcome, ParseOutcomeError, Phase,
};

mod auth;
pub use auth::{validate_nickname, Sessions, MAX_SESSIONS};
mod config;
pub use config::{Config, ConfigError, RateLimitConfig, StoreConfig};

/// Shared table state: one engine behind one lock, plus the session registry.
///
/// The current deadline is mirrored in an atomic (milliseconds since `origin`) so callers can
/// skip the lock when no transition is due.
pub struct Simulator<S: AccountStore, R: Roller = GameRng> {
    engine: Mutex<Engine<S, R>>,
    origin: Instant,
    deadline_ms: AtomicU64,
    sessions: Sessions,
}

impl<S: AccountStore, R: Roller> Simulator<S, R> {
    pub async fn new(store: S, roller: R, timing: Timing) -> Self {
        let origin = now();
        let engine = Engine::new(store, roller, timing, origin).await;
        let deadline_ms = millis_since(origin, engine.round().deadline());
        Self {
            engine: Mutex::new(engine),
            origin,
            deadline_ms: AtomicU64::new(deadline_ms),
            sessions: Sessions::new(),
        }
    }

    /// Bound the number of live sessions.
    pub fn with_session_capacity(mut self, capacity: usize) -> Self {
        self.sessions = Sessions::with_capacity(capacity);
        self
    }

    fn publish(&self, engine: &Engine<S, R>) {
        let deadline_ms = millis_since(self.origin, engine.round().deadline());
        self.deadline_ms.store(deadline_ms, Ordering::Release);
    }

    fn is_due(&self, now: Instant) -> bool {
        millis_since(self.origin, now) >= self.deadline_ms.load(Ordering::Acquire)
    }

    /// Advance the round if its deadline has passed.
    ///
    /// Checked once without the lock and again by the engine under it, so concurrent callers
    /// racing on the same deadline produce a single transition.
    pub async fn advance_if_due(&self) -> Option<Phase> {
        if !self.is_due(now()) {
            return None;
        }
        let mut engine = self.engine.lock().await;
        let advanced = engine.advance_if_due(now()).await;
        self.publish(&engine);
        advanced
    }

    async fn lock(&self) -> MutexGuard<'_, Engine<S, R>> {
        self.advance_if_due().await;
        self.engine.lock().await
    }

    pub async fn status(&self, uid: Option<&str>) -> Result<Status, Error> {
        let mut engine = self.lock().await;
        let result = engine.status(uid, now()).await;
        self.publish(&engine);
        result
    }

    /// Stake `points` on the outcome named by `tag`. Returns the balance after the debit.
    pub async fn stake(&self, uid: &str, tag: &str, points: i64) -> Result<i64, Error> {
        let outcome: Outcome = tag
            .parse()
            .map_err(|e: ParseOutcomeError| Error::InvalidInput(e.to_string()))?;
        let mut engine = self.lock().await;
        let result = engine.stake(uid, outcome, points, now()).await;
        self.publish(&engine);
        result
    }

    /// Withdraw every stake of `uid` in the current round. Returns the refunded total.
    pub async fn cancel_stakes(&self, uid: &str) -> Result<i64, Error> {
        let mut engine = self.lock().await;
        let result = engine.cancel_stakes(uid, now()).await;
        self.publish(&engine);
        result
    }

    pub async fn claim_bonus(&self, uid: &str) -> Result<Account, Error> {
        let mut engine = self.lock().await;
        let result = engine.claim_bonus(uid, now()).await;
        self.publish(&engine);
        result
    }

    pub async fn set_nickname(&self, uid: &str, raw: &str) -> Result<String, Error> {
        let nickname = validate_nickname(raw)?;
        let mut engine = self.lock().await;
        let result = engine.set_nickname(uid, &nickname, now()).await;
        self.publish(&engine);
        result.map(|()| nickname)
    }

    pub fn issue_session(&self, uid: Option<String>) -> (String, String) {
        self.sessions.issue(uid)
    }

    pub fn resolve_session(&self, token: &str) -> Option<String> {
        self.sessions.resolve(token)
    }

    /// Run a closure against the engine under the lock.
    pub async fn inspect<T>(&self, f: impl FnOnce(&Engine<S, R>) -> T) -> T {
        let engine = self.engine.lock().await;
        f(&engine)
    }
}

impl<S: AccountStore + 'static, R: Roller + 'static> Simulator<S, R> {
    /// Drive the round clock in the background, waking every `period`.
    ///
    /// Each wake-up runs in its own task; a panic there is logged and the loop keeps going.
    pub fn spawn_ticker(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let simulator = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let tick = simulator.clone();
                match tokio::spawn(async move { tick.advance_if_due().await }).await {
                    Ok(Some(phase)) => debug!(?phase, "ticker advanced round"),
                    Ok(None) => {}
                    Err(e) => error!("ticker iteration failed: {}", e),
                }
            }
        })
    }
}

/// Current instant on the tokio clock, so paused test time drives the rounds.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Floor of whole milliseconds from `origin` to `instant`.
fn millis_since(origin: Instant, instant: Instant) -> u64 {
    instant.saturating_duration_since(origin).as_millis() as u64
}

/// Error body returned by every failing route.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::PhaseRejected
            | Error::InsufficientBalance { .. }
            | Error::AlreadyClaimed
            | Error::BalanceTooHighToClaim { .. } => StatusCode::CONFLICT,
            Error::StoreUnavailable(e) => {
                error!("account store unavailable: {}", e);
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        (status, Json(Ack::failed(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub struct Api<S: AccountStore, R: Roller = GameRng> {
    simulator: Arc<Simulator<S, R>>,
    rate_limit: Option<RateLimitConfig>,
}

impl<S: AccountStore + 'static, R: Roller + 'static> Api<S, R> {
    pub fn new(simulator: Arc<Simulator<S, R>>) -> Self {
        Self {
            simulator,
            rate_limit: None,
        }
    }

    /// Limit each client IP to `per_second` requests with the given burst.
    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimitConfig>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn router(&self) -> Router {
        // Configure CORS
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

        let router = Router::new()
            .route("/api/auth", post(authenticate::<S, R>))
            .route("/policy", get(policy))
            .route("/status", get(status::<S, R>))
            .route("/predict", post(predict::<S, R>))
            .route("/predict/clear", post(clear::<S, R>))
            .route("/bonus/claim", post(claim_bonus::<S, R>))
            .route("/user/nickname", post(nickname::<S, R>))
            .layer(cors);

        // Configure Rate Limiting
        let router = match self.rate_limit.as_ref().and_then(|limit| {
            GovernorConfigBuilder::default()
                .per_millisecond((1_000 / limit.per_second).max(1))
                .burst_size(limit.burst)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
        }) {
            Some(config) => router.layer(GovernorLayer {
                config: Arc::new(config),
            }),
            None => {
                if self.rate_limit.is_some() {
                    tracing::warn!("ignoring invalid rate limit");
                }
                router
            }
        };

        router.with_state(self.simulator.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Resolve the caller from a bearer token header or a `token` query parameter.
fn caller<S: AccountStore, R: Roller>(
    simulator: &Simulator<S, R>,
    headers: &HeaderMap,
    query: &TokenQuery,
) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    let token = bearer.or(query.token.as_deref())?;
    simulator.resolve_session(token)
}

fn require_caller<S: AccountStore, R: Roller>(
    simulator: &Simulator<S, R>,
    headers: &HeaderMap,
    query: &TokenQuery,
) -> Result<String, ApiError> {
    caller(simulator, headers, query).ok_or(ApiError(Error::Unauthenticated))
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError(Error::InvalidInput(e.to_string())))
}

async fn authenticate<S: AccountStore + 'static, R: Roller + 'static>(
    AxumState(simulator): AxumState<Arc<Simulator<S, R>>>,
    body: Bytes,
) -> ApiResult<AuthResponse> {
    let request: AuthRequest = if body.is_empty() {
        AuthRequest::default()
    } else {
        parse(&body)?
    };
    let (token, uid) = simulator.issue_session(request.uid);
    info!(uid = %uid, "issued session");
    Ok(Json(AuthResponse {
        success: true,
        token,
        uid,
    }))
}

async fn policy() -> Json<Policy> {
    Json(Policy::default())
}

async fn status<S: AccountStore + 'static, R: Roller + 'static>(
    AxumState(simulator): AxumState<Arc<Simulator<S, R>>>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Status> {
    let uid = caller(&simulator, &headers, &query);
    Ok(Json(simulator.status(uid.as_deref()).await?))
}

async fn predict<S: AccountStore + 'static, R: Roller + 'static>(
    AxumState(simulator): AxumState<Arc<Simulator<S, R>>>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
    body: Bytes,
) -> ApiResult<Ack> {
    let uid = require_caller(&simulator, &headers, &query)?;
    let request: StakeRequest = parse(&body)?;
    simulator
        .stake(&uid, &request.prediction_type, request.points)
        .await?;
    Ok(Json(Ack::ok()))
}

async fn clear<S: AccountStore + 'static, R: Roller + 'static>(
    AxumState(simulator): AxumState<Arc<Simulator<S, R>>>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Ack> {
    let uid = require_caller(&simulator, &headers, &query)?;
    let refunded = simulator.cancel_stakes(&uid).await?;
    if refunded == 0 {
        return Ok(Json(Ack::ok_with("nothing to cancel")));
    }
    Ok(Json(Ack::ok()))
}

async fn claim_bonus<S: AccountStore + 'static, R: Roller + 'static>(
    AxumState(simulator): AxumState<Arc<Simulator<S, R>>>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> ApiResult<ClaimResponse> {
    let uid = require_caller(&simulator, &headers, &query)?;
    let account = simulator.claim_bonus(&uid).await?;
    Ok(Json(ClaimResponse {
        success: true,
        score: account.score,
        round_id: account.last_claim_round,
    }))
}

async fn nickname<S: AccountStore + 'static, R: Roller + 'static>(
    AxumState(simulator): AxumState<Arc<Simulator<S, R>>>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
    body: Bytes,
) -> ApiResult<Ack> {
    let uid = require_caller(&simulator, &headers, &query)?;
    let request: NicknameRequest = parse(&body)?;
    simulator.set_nickname(&uid, &request.nickname).await?;
    Ok(Json(Ack::ok()))
}
