//! Rate limit enforcement for requests against the platform API.
//!
//! The engine coordinates a process-wide global token bucket with a family of
//! per-route buckets discovered from response headers. Admission is
//! serialized; the wire send is not: once a [`Permit`] is issued the request
//! proceeds with no locks held, and the response's headers are fed back
//! through [`Permit::complete`].

pub mod headers;

mod bucket;

pub use self::headers::{RatelimitHeaders, RatelimitScope};

use self::bucket::Bucket;
use crate::routing::Path;
use std::{
    collections::{HashMap, HashSet},
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
    time::SystemTime,
};
use tokio::{
    runtime::Handle,
    sync::Mutex,
    time::{self, Duration, Instant},
};

/// Length of the global bucket's window.
///
/// The platform enforces the global limit per second; the local window is
/// aligned to the first response's server date and rotated from there.
pub const GLOBAL_LIMIT_PERIOD: Duration = Duration::from_secs(1);

/// How long to wait before re-checking a bucket that is empty but has no
/// learned window yet (an exhausted default bucket whose first responses are
/// still in flight).
const UNKNOWN_WINDOW_WAIT: Duration = Duration::from_millis(200);

/// Padding added to server-provided reset times so a retry issued exactly on
/// the boundary lands past it despite clock drift.
const DRIFT_GUARD: Duration = Duration::from_millis(1);

/// Configuration for the rate limit engine.
#[derive(Clone, Debug)]
pub struct RateLimiterConfig {
    /// Number of times a request may be re-admitted after a 429 or 502.
    pub retries: u8,
    /// Whether `shared`-scope 429s are retried at all.
    pub retry_shared: bool,
    /// Tokens per window of the global bucket. `None` disables global
    /// limiting entirely.
    pub global_limit: Option<u64>,
    /// Limit seeded into a synthetic bucket when a route is first seen,
    /// before the platform reveals the real one. `None` leaves unknown
    /// routes unthrottled until their first response.
    pub default_limit: Option<u64>,
    /// Request keys exempt from the global bucket, compared with their
    /// resource cleared. Interaction callbacks in this domain.
    pub ignore_global: HashSet<Path>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            retries: 1,
            retry_shared: true,
            global_limit: Some(50),
            default_limit: None,
            ignore_global: HashSet::from([Path::InteractionsIdTokenCallback(0)]),
        }
    }
}

/// Which bucket a request key is bound to.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Binding {
    /// The route carries a rate limit tracked under this bucket id.
    Limited(Box<str>),
    /// The platform reported the route unlimited.
    NoLimit,
}

/// The maps the engine serializes under its transaction lock.
struct Engine {
    global: Option<Bucket>,
    paths: HashMap<Path, Binding>,
    buckets: HashMap<Box<str>, Bucket>,
    defaults: HashMap<Path, u64>,
    /// Recycled buckets whose last referencing path rebound.
    pool: Vec<Bucket>,
}

impl Engine {
    fn new(config: &RateLimiterConfig) -> Self {
        Self {
            global: config
                .global_limit
                .map(|limit| Bucket::new("global".into(), limit)),
            paths: HashMap::new(),
            buckets: HashMap::new(),
            defaults: HashMap::new(),
            pool: Vec::new(),
        }
    }

    /// Limit seeded into a fresh synthetic bucket for `path`, if any.
    ///
    /// A per-resource key falls back to the default of its parent route.
    fn resolve_default(&self, path: &Path, config: &RateLimiterConfig) -> Option<u64> {
        self.defaults
            .get(path)
            .or_else(|| self.defaults.get(&path.parent()))
            .copied()
            .or(config.default_limit)
    }

    fn allocate(&mut self, id: Box<str>, limit: u64) -> Bucket {
        match self.pool.pop() {
            Some(mut bucket) => {
                bucket.reuse(id, limit);

                bucket
            }
            None => Bucket::new(id, limit),
        }
    }

    /// Recycle `bucket` unless some other path still references its id.
    fn release(&mut self, bucket: Bucket) {
        let referenced = self
            .paths
            .values()
            .any(|binding| matches!(binding, Binding::Limited(hash) if **hash == *bucket.id()));

        if !referenced {
            self.pool.push(bucket);
        } else {
            self.buckets.insert(bucket.id().into(), bucket);
        }
    }

    /// Decide whether `path` may take a token right now.
    fn route_decision(&mut self, path: &Path, now: Instant, config: &RateLimiterConfig) -> Decision {
        let binding = match self.paths.get(path) {
            Some(binding) => binding.clone(),
            None => {
                let Some(limit) = self.resolve_default(path, config) else {
                    // Nothing known and no default: the route is unthrottled
                    // until its first response teaches us otherwise.
                    return Decision::AdmitUnlimited;
                };

                let id: Box<str> = format!("default;{path}").into();
                let bucket = self.allocate(id.clone(), limit);
                self.buckets.insert(id.clone(), bucket);
                self.paths.insert(path.clone(), Binding::Limited(id.clone()));

                Binding::Limited(id)
            }
        };

        let hash = match binding {
            Binding::NoLimit => return Decision::AdmitUnlimited,
            Binding::Limited(hash) => hash,
        };

        let Some(bucket) = self.buckets.get_mut(&hash) else {
            return Decision::AdmitUnlimited;
        };

        if bucket.is_empty() && bucket.is_expired(now) {
            // Window passed: reset in place. The next window's length is
            // learned from the next response header.
            bucket.reset(None);
        }

        if !bucket.is_empty() {
            return Decision::AdmitLimited(hash);
        }

        Decision::Wait(bucket.expiry().unwrap_or(now + UNKNOWN_WINDOW_WAIT))
    }

    /// Fold a response's per-route headers into the maps.
    fn confirm_route(&mut self, path: &Path, headers: &RatelimitHeaders, now: Instant) {
        let present = match headers {
            RatelimitHeaders::GlobalLimited(_) => {
                // No per-route information; the request spent nothing on the
                // route as far as the platform is concerned.
                self.cancel_route(path);

                return;
            }
            RatelimitHeaders::None => return self.bind_unlimited(path),
            RatelimitHeaders::Present(present) => present,
        };

        // The parser already drops empty bucket values; filter again so a
        // stray empty hash can never key a bucket shared across routes.
        let Some(hash) = present.bucket().filter(|hash| !hash.is_empty()) else {
            return self.bind_unlimited(path);
        };

        let window = present.reset_at();
        let expiry = now + window.duration_since(SystemTime::now()).unwrap_or_default();
        let current = self.paths.get(path).cloned();

        if let Some(Binding::Limited(ref current_hash)) = current {
            if **current_hash == *hash {
                if let Some(bucket) = self.buckets.get_mut(hash) {
                    bucket.confirm_header(1, present, window, expiry);
                }

                return;
            }
        }

        // Rebind the request key to the platform's hash, migrating in-flight
        // accounting so responses still in the air decrement correctly. The
        // rebind happens first: recycling the old bucket must not see a stale
        // reference from this path.
        self.paths
            .insert(path.clone(), Binding::Limited(hash.into()));

        let inherited = match current {
            Some(Binding::Limited(old_hash)) => match self.buckets.remove(&old_hash) {
                Some(mut old) => {
                    let pending = old.take_pending();

                    #[cfg(feature = "tracing")]
                    tracing::debug!(%path, from = %old.id(), to = hash, "rebinding request key");

                    self.release(old);

                    pending
                }
                None => 1,
            },
            _ => 1,
        };

        if !self.buckets.contains_key(hash) {
            let bucket = self.allocate(hash.into(), present.limit());
            self.buckets.insert(hash.into(), bucket);
        }

        if let Some(bucket) = self.buckets.get_mut(hash) {
            bucket.inherit_pending(inherited);
            bucket.confirm_header(1, present, window, expiry);
        }
    }

    /// Mark `path` as having no server-side limit.
    fn bind_unlimited(&mut self, path: &Path) {
        let old = self.paths.insert(path.clone(), Binding::NoLimit);

        if let Some(Binding::Limited(hash)) = old {
            if let Some(mut old) = self.buckets.remove(&hash) {
                old.take_pending();
                self.release(old);
            }
        }
    }

    /// Return the route token of a request that completed without per-route
    /// header information.
    fn cancel_route(&mut self, path: &Path) {
        if let Some(Binding::Limited(hash)) = self.paths.get(path) {
            let hash = hash.clone();

            if let Some(bucket) = self.buckets.get_mut(&hash) {
                bucket.cancel(1);
            }
        }
    }
}

/// Outcome of one admission check on a route bucket.
enum Decision {
    /// No limit applies; nothing to decrement.
    AdmitUnlimited,
    /// The bucket under this id is admitting.
    AdmitLimited(Box<str>),
    /// Both empty and unexpired; sleep until the instant and re-check.
    Wait(Instant),
}

struct RateLimiterRef {
    /// Coarse lock serializing the admission decision. Never held across
    /// the wire send or an admission sleep.
    admission: Mutex<()>,
    /// Fine lock serializing read-modify-write over the bucket maps.
    state: Mutex<Engine>,
    config: RateLimiterConfig,
}

/// Rate limiter for requests against the platform API.
///
/// Cloning is cheap and shares the underlying buckets.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterRef>,
}

impl RateLimiter {
    /// Create a new rate limiter with the provided configuration.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            inner: Arc::new(RateLimiterRef {
                admission: Mutex::new(()),
                state: Mutex::new(Engine::new(&config)),
                config,
            }),
        }
    }

    /// Whether the path bypasses the global bucket.
    pub fn is_exempt(&self, path: &Path) -> bool {
        self.inner.config.ignore_global.contains(&path.parent())
    }

    /// Configured retry budget for one request.
    pub fn retries(&self) -> u8 {
        self.inner.config.retries
    }

    /// Whether `shared`-scope 429s may be retried.
    pub fn retries_shared(&self) -> bool {
        self.inner.config.retry_shared
    }

    /// Seed a default limit for a request key, used before the platform
    /// reveals the route's real bucket.
    pub async fn set_default(&self, path: Path, limit: u64) {
        self.inner.state.lock().await.defaults.insert(path, limit);
    }

    /// Wait until a token is available for the path, on both the global and
    /// the route bucket.
    ///
    /// The returned permit must be completed with the response's headers, or
    /// dropped to return the token.
    pub async fn acquire(&self, path: Path) -> Permit {
        let exempt = self.is_exempt(&path);

        loop {
            let admission = self.inner.admission.lock().await;
            let mut engine = self.inner.state.lock().await;
            let now = Instant::now();

            if !exempt {
                if let Some(global) = engine.global.as_mut() {
                    if global.is_empty() {
                        if global.is_expired(now) {
                            global.reset(Some(now + GLOBAL_LIMIT_PERIOD));
                        } else if global.expiry().is_none() {
                            // Drained before any response pinned the window;
                            // start one locally so waiters have an instant.
                            global.begin_window(now + GLOBAL_LIMIT_PERIOD);
                        }
                    }

                    if global.is_empty() {
                        let until = global.expiry().unwrap_or(now + GLOBAL_LIMIT_PERIOD);

                        #[cfg(feature = "tracing")]
                        tracing::debug!(%path, "global bucket empty; waiting for reset");

                        // Both locks are released while sleeping so other
                        // requests can run their own admission.
                        drop(engine);
                        drop(admission);
                        time::sleep_until(until).await;

                        continue;
                    }
                }
            }

            match engine.route_decision(&path, now, &self.inner.config) {
                Decision::AdmitUnlimited => {
                    if !exempt {
                        if let Some(global) = engine.global.as_mut() {
                            global.use_tokens(1);
                        }
                    }

                    return Permit::new(Arc::clone(&self.inner), path, exempt, false);
                }
                Decision::AdmitLimited(hash) => {
                    if !exempt {
                        if let Some(global) = engine.global.as_mut() {
                            global.use_tokens(1);
                        }
                    }

                    if let Some(bucket) = engine.buckets.get_mut(&hash) {
                        bucket.use_tokens(1);
                    }

                    return Permit::new(Arc::clone(&self.inner), path, exempt, true);
                }
                Decision::Wait(until) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(%path, "route bucket empty; waiting for reset");

                    // Release both locks: one saturated route must not block
                    // admission for every other route.
                    drop(engine);
                    drop(admission);
                    time::sleep_until(until).await;
                }
            }
        }
    }

    /// Force a scope empty after a 429, so nothing is re-sent before the
    /// platform's `retry_after` has passed.
    ///
    /// `shared` scope carries no engine state; its handling is purely retry
    /// policy in the executor.
    pub async fn note_rate_limited(
        &self,
        path: &Path,
        scope: RatelimitScope,
        retry_after: Duration,
    ) {
        let mut engine = self.inner.state.lock().await;
        let expiry = Instant::now() + retry_after + DRIFT_GUARD;

        match scope {
            RatelimitScope::Global => {
                if let Some(global) = engine.global.as_mut() {
                    global.block_until(expiry);
                }
            }
            RatelimitScope::User => {
                if let Some(Binding::Limited(hash)) = engine.paths.get(path) {
                    let hash = hash.clone();

                    if let Some(bucket) = engine.buckets.get_mut(&hash) {
                        bucket.block_until(expiry);
                    }
                }
            }
            RatelimitScope::Shared => {}
        }
    }

    /// Snapshot of the bucket currently bound to a path, if any.
    pub async fn bucket(&self, path: &Path) -> Option<BucketInfo> {
        let engine = self.inner.state.lock().await;

        let hash = match engine.paths.get(path)? {
            Binding::Limited(hash) => hash.clone(),
            Binding::NoLimit => return None,
        };

        engine.buckets.get(&hash).map(BucketInfo::of)
    }

    /// Snapshot of the global bucket, if global limiting is enabled.
    pub async fn global(&self) -> Option<BucketInfo> {
        self.inner.state.lock().await.global.as_ref().map(BucketInfo::of)
    }
}

impl Debug for RateLimiter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RateLimiter")
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

/// Observable state of a bucket, for introspection and tests.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BucketInfo {
    pub limit: u64,
    pub remaining: u64,
    pub pending: u64,
}

impl BucketInfo {
    fn of(bucket: &Bucket) -> Self {
        Self {
            limit: bucket.limit(),
            remaining: bucket.remaining(),
            pending: bucket.pending(),
        }
    }
}

/// An admitted request's token, holding `pending` on its buckets until the
/// response is known.
pub struct Permit {
    inner: Arc<RateLimiterRef>,
    path: Path,
    exempt: bool,
    route_used: bool,
    completed: bool,
}

impl Debug for Permit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Permit")
            .field("path", &self.path)
            .field("exempt", &self.exempt)
            .field("route_used", &self.route_used)
            .finish()
    }
}

impl Permit {
    fn new(inner: Arc<RateLimiterRef>, path: Path, exempt: bool, route_used: bool) -> Self {
        Self {
            inner,
            path,
            exempt,
            route_used,
            completed: false,
        }
    }

    /// Feed the response's rate limit headers and server date back into the
    /// engine, completing the request's life cycle.
    pub async fn complete(mut self, headers: RatelimitHeaders, date: Option<SystemTime>) {
        self.completed = true;

        let mut engine = self.inner.state.lock().await;
        let now = Instant::now();

        if !self.exempt {
            if let Some(global) = engine.global.as_mut() {
                global.confirm_date(
                    1,
                    date.unwrap_or_else(SystemTime::now),
                    now,
                    GLOBAL_LIMIT_PERIOD,
                );
            }
        }

        if self.route_used || !matches!(headers, RatelimitHeaders::GlobalLimited(_)) {
            engine.confirm_route(&self.path, &headers, now);
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if self.completed {
            return;
        }

        // The request never completed; give the tokens back. Locking is
        // async, so the return happens on a spawned task when a runtime is
        // available (it always is on the request path).
        let Ok(handle) = Handle::try_current() else {
            return;
        };

        let inner = Arc::clone(&self.inner);
        let path = self.path.clone();
        let exempt = self.exempt;
        let route_used = self.route_used;

        handle.spawn(async move {
            let mut engine = inner.state.lock().await;

            if !exempt {
                if let Some(global) = engine.global.as_mut() {
                    global.cancel(1);
                }
            }

            if route_used {
                engine.cancel_route(&path);
            }
        });
    }
}
