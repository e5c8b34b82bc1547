use accord_http::{
    ratelimiting::{RateLimiter, RateLimiterConfig, RatelimitHeaders, RatelimitScope},
    routing::Path,
};
use std::time::{Duration as StdDuration, SystemTime};
use tokio::time::{Duration, Instant};

const PATH: fn() -> Path = || Path::ChannelsIdMessages(1);
const OTHER_PATH: fn() -> Path = || Path::GuildsIdBansUserId(2);
const EXEMPT_PATH: fn() -> Path = || Path::InteractionsIdTokenCallback(3);

fn config(global: Option<u64>, default: Option<u64>) -> RateLimiterConfig {
    RateLimiterConfig {
        global_limit: global,
        default_limit: default,
        ..RateLimiterConfig::default()
    }
}

fn server_date(secs: u64) -> Option<SystemTime> {
    Some(SystemTime::UNIX_EPOCH + StdDuration::from_secs(secs))
}

/// Headers of a response from a route limited under `bucket`.
fn present(bucket: &str, limit: u64, remaining: u64, reset_in: Duration) -> RatelimitHeaders {
    let reset_at = SystemTime::now() + reset_in;
    let reset = reset_at
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs_f64();

    let reset = format!("{reset:.3}");
    let reset_after = format!("{:.3}", reset_in.as_secs_f64());
    let limit = limit.to_string();
    let remaining = remaining.to_string();

    let pairs: [(&str, &[u8]); 5] = [
        ("x-ratelimit-bucket", bucket.as_bytes()),
        ("x-ratelimit-limit", limit.as_bytes()),
        ("x-ratelimit-remaining", remaining.as_bytes()),
        ("x-ratelimit-reset", reset.as_bytes()),
        ("x-ratelimit-reset-after", reset_after.as_bytes()),
    ];

    RatelimitHeaders::from_pairs(pairs.into_iter()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn global_pending_is_tracked_per_request() {
    let rate_limiter = RateLimiter::new(config(Some(50), None));

    let permit = rate_limiter.acquire(PATH()).await;

    let global = rate_limiter.global().await.unwrap();
    assert_eq!(1, global.pending);
    assert_eq!(49, global.remaining);

    permit.complete(RatelimitHeaders::None, server_date(100)).await;

    let global = rate_limiter.global().await.unwrap();
    assert_eq!(0, global.pending);
    assert_eq!(49, global.remaining);
    assert!(global.remaining + global.pending <= global.limit);
}

#[tokio::test(start_paused = true)]
async fn global_burst_over_limit_waits_for_reset() {
    let rate_limiter = RateLimiter::new(config(Some(3), None));
    let now = Instant::now();

    for _ in 0..3 {
        rate_limiter
            .acquire(PATH())
            .await
            .complete(RatelimitHeaders::None, server_date(100))
            .await;
    }

    assert!(now.elapsed() < Duration::from_secs(1), "did not run instantly");

    rate_limiter
        .acquire(PATH())
        .await
        .complete(RatelimitHeaders::None, server_date(101))
        .await;

    assert!(
        now.elapsed() >= Duration::from_secs(1),
        "fourth request beat the global window"
    );
}

#[tokio::test(start_paused = true)]
async fn route_bucket_created_from_first_response() {
    let rate_limiter = RateLimiter::new(config(Some(50), None));

    rate_limiter
        .acquire(PATH())
        .await
        .complete(
            present("abc", 5, 4, Duration::from_secs(2)),
            server_date(100),
        )
        .await;

    let bucket = rate_limiter.bucket(&PATH()).await.unwrap();
    assert_eq!(5, bucket.limit);
    assert_eq!(4, bucket.remaining);
    assert_eq!(0, bucket.pending);

    let global = rate_limiter.global().await.unwrap();
    assert_eq!(49, global.remaining);
    assert_eq!(0, global.pending);
}

#[tokio::test(start_paused = true)]
async fn default_bucket_pending_migrates_once() {
    let rate_limiter = RateLimiter::new(config(Some(50), Some(2)));

    let first = rate_limiter.acquire(PATH()).await;
    let second = rate_limiter.acquire(PATH()).await;

    // Both in flight against the synthetic default bucket.
    let synthetic = rate_limiter.bucket(&PATH()).await.unwrap();
    assert_eq!(2, synthetic.limit);
    assert_eq!(0, synthetic.remaining);
    assert_eq!(2, synthetic.pending);

    first
        .complete(
            present("abc", 5, 4, Duration::from_secs(2)),
            server_date(100),
        )
        .await;

    // The discovered bucket inherited the second request's pending token.
    let discovered = rate_limiter.bucket(&PATH()).await.unwrap();
    assert_eq!(5, discovered.limit);
    assert_eq!(1, discovered.pending);

    second
        .complete(
            present("abc", 5, 3, Duration::from_secs(2)),
            server_date(100),
        )
        .await;

    let discovered = rate_limiter.bucket(&PATH()).await.unwrap();
    assert_eq!(0, discovered.pending);
    assert!(discovered.remaining + discovered.pending <= discovered.limit);
}

#[tokio::test(start_paused = true)]
async fn exhausted_route_does_not_block_other_routes() {
    let rate_limiter = RateLimiter::new(config(Some(50), None));
    let now = Instant::now();

    // Teach the engine that PATH is limited and drained.
    rate_limiter
        .acquire(PATH())
        .await
        .complete(
            present("abc", 1, 0, Duration::from_secs(2)),
            server_date(100),
        )
        .await;

    let mut blocked = std::pin::pin!(rate_limiter.acquire(PATH()));

    tokio::select! {
        biased;
        _ = &mut blocked => panic!("admitted on a drained bucket"),
        permit = rate_limiter.acquire(OTHER_PATH()) => {
            permit
                .complete(RatelimitHeaders::None, server_date(100))
                .await;
        }
    }

    assert!(now.elapsed() < Duration::from_secs(2), "other route was held up");

    // The drained route eventually proceeds after its window.
    let permit = blocked.await;
    assert!(now.elapsed() >= Duration::from_secs(2));
    permit
        .complete(
            present("abc", 1, 0, Duration::from_secs(2)),
            server_date(101),
        )
        .await;
}

#[tokio::test(start_paused = true)]
async fn global_429_blocks_every_route() {
    let rate_limiter = RateLimiter::new(config(Some(50), None));

    rate_limiter
        .acquire(PATH())
        .await
        .complete(RatelimitHeaders::None, server_date(100))
        .await;

    rate_limiter
        .note_rate_limited(&PATH(), RatelimitScope::Global, Duration::from_millis(500))
        .await;

    let now = Instant::now();

    rate_limiter
        .acquire(OTHER_PATH())
        .await
        .complete(RatelimitHeaders::None, server_date(101))
        .await;

    assert!(
        now.elapsed() >= Duration::from_millis(500),
        "request sent before the 429 retry-after passed"
    );
}

#[tokio::test(start_paused = true)]
async fn user_429_blocks_only_the_route() {
    let rate_limiter = RateLimiter::new(config(Some(50), None));

    rate_limiter
        .acquire(PATH())
        .await
        .complete(
            present("abc", 5, 4, Duration::from_secs(1)),
            server_date(100),
        )
        .await;

    rate_limiter
        .note_rate_limited(&PATH(), RatelimitScope::User, Duration::from_millis(500))
        .await;

    let bucket = rate_limiter.bucket(&PATH()).await.unwrap();
    assert_eq!(0, bucket.remaining);

    // Another route is unaffected.
    let now = Instant::now();
    rate_limiter
        .acquire(OTHER_PATH())
        .await
        .complete(RatelimitHeaders::None, server_date(100))
        .await;
    assert!(now.elapsed() < Duration::from_millis(500));

    // The punished route waits.
    let now = Instant::now();
    rate_limiter
        .acquire(PATH())
        .await
        .complete(
            present("abc", 5, 4, Duration::from_secs(1)),
            server_date(101),
        )
        .await;
    assert!(now.elapsed() >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn unlimited_route_never_waits() {
    let rate_limiter = RateLimiter::new(config(Some(50), None));

    rate_limiter
        .acquire(PATH())
        .await
        .complete(RatelimitHeaders::None, server_date(100))
        .await;

    let now = Instant::now();

    for _ in 0..10 {
        rate_limiter
            .acquire(PATH())
            .await
            .complete(RatelimitHeaders::None, server_date(100))
            .await;
    }

    assert!(now.elapsed() < Duration::from_millis(1));
    assert!(rate_limiter.bucket(&PATH()).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn empty_bucket_header_means_unlimited() {
    let rate_limiter = RateLimiter::new(config(Some(50), None));

    // The platform signals "no limit" with an empty bucket value; the route
    // must bind to the no-limit sentinel, not to a bucket keyed by "".
    rate_limiter
        .acquire(PATH())
        .await
        .complete(
            present("", 1, 0, Duration::from_secs(60)),
            server_date(100),
        )
        .await;

    assert!(rate_limiter.bucket(&PATH()).await.is_none());

    // Another route reporting an empty bucket shares nothing with it.
    rate_limiter
        .acquire(OTHER_PATH())
        .await
        .complete(
            present("", 1, 0, Duration::from_secs(60)),
            server_date(100),
        )
        .await;

    let now = Instant::now();

    for _ in 0..5 {
        rate_limiter
            .acquire(PATH())
            .await
            .complete(
                present("", 1, 0, Duration::from_secs(60)),
                server_date(100),
            )
            .await;
        rate_limiter
            .acquire(OTHER_PATH())
            .await
            .complete(
                present("", 1, 0, Duration::from_secs(60)),
                server_date(100),
            )
            .await;
    }

    assert!(now.elapsed() < Duration::from_millis(1), "unlimited routes waited");
}

#[tokio::test(start_paused = true)]
async fn exempt_path_bypasses_global() {
    let rate_limiter = RateLimiter::new(config(Some(1), None));
    let now = Instant::now();

    // Far more acquisitions than the global limit allows, instantly.
    for _ in 0..5 {
        rate_limiter
            .acquire(EXEMPT_PATH())
            .await
            .complete(RatelimitHeaders::None, server_date(100))
            .await;
    }

    assert!(now.elapsed() < Duration::from_secs(1));

    let global = rate_limiter.global().await.unwrap();
    assert_eq!(1, global.remaining, "exempt path consumed a global token");
}

#[tokio::test(start_paused = true)]
async fn dropped_permit_returns_tokens() {
    let rate_limiter = RateLimiter::new(config(Some(2), None));

    drop(rate_limiter.acquire(PATH()).await);
    tokio::task::yield_now().await;

    let global = rate_limiter.global().await.unwrap();
    assert_eq!(0, global.pending);
    assert_eq!(2, global.remaining);
}

#[tokio::test(start_paused = true)]
async fn default_seeded_per_path_via_set_default() {
    let rate_limiter = RateLimiter::new(config(Some(50), None));

    rate_limiter.set_default(PATH().parent(), 1).await;

    // First request admits against the seeded synthetic bucket.
    let permit = rate_limiter.acquire(PATH()).await;

    let synthetic = rate_limiter.bucket(&PATH()).await.unwrap();
    assert_eq!(1, synthetic.limit);
    assert_eq!(0, synthetic.remaining);

    // A second one has to wait for discovery; it must not be admitted
    // before the first response lands.
    let mut blocked = std::pin::pin!(rate_limiter.acquire(PATH()));

    tokio::select! {
        biased;
        _ = &mut blocked => panic!("seeded default over-admitted"),
        () = tokio::task::yield_now() => {}
    }

    permit
        .complete(
            present("abc", 5, 4, Duration::from_secs(2)),
            server_date(100),
        )
        .await;

    let permit = blocked.await;
    permit
        .complete(
            present("abc", 5, 3, Duration::from_secs(2)),
            server_date(100),
        )
        .await;

    let bucket = rate_limiter.bucket(&PATH()).await.unwrap();
    assert_eq!(0, bucket.pending);
}
