use super::headers::Present;
use std::time::SystemTime;
use tokio::time::{Duration, Instant};

/// A rate limit token bucket.
///
/// Owned exclusively by the [`RateLimiter`]; everything here assumes the
/// engine's transaction lock is held.
///
/// [`RateLimiter`]: super::RateLimiter
#[derive(Clone, Debug)]
pub(super) struct Bucket {
    id: Box<str>,
    limit: u64,
    remaining: u64,
    /// Requests dispatched but not yet confirmed by a response.
    pending: u64,
    /// Local instant the current window rotates, for admission waits.
    expiry: Option<Instant>,
    /// Server-time identity of the window, for ordering response headers.
    window: Option<SystemTime>,
    /// Server date of the last confirmed response. Global bucket only.
    date: Option<SystemTime>,
}

impl Bucket {
    pub fn new(id: Box<str>, limit: u64) -> Self {
        Self {
            id,
            limit,
            remaining: limit,
            pending: 0,
            expiry: None,
            window: None,
            date: None,
        }
    }

    /// Re-seed a pooled bucket for a new binding.
    pub fn reuse(&mut self, id: Box<str>, limit: u64) {
        self.id = id;
        self.limit = limit;
        self.remaining = limit;
        self.pending = 0;
        self.expiry = None;
        self.window = None;
        self.date = None;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn limit(&self) -> u64 {
        self.limit
    }

    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    pub const fn pending(&self) -> u64 {
        self.pending
    }

    pub const fn expiry(&self) -> Option<Instant> {
        self.expiry
    }

    pub const fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiry.map_or(false, |expiry| now >= expiry)
    }

    /// Take `n` tokens for requests about to be put on the wire.
    pub fn use_tokens(&mut self, n: u64) {
        self.remaining = self.remaining.saturating_sub(n);
        self.pending += n;
    }

    /// Return `n` tokens for requests that never completed.
    pub fn cancel(&mut self, n: u64) {
        self.pending = self.pending.saturating_sub(n);
        self.remaining += n;
    }

    /// Start a fresh window. In-flight requests keep their tokens spent.
    pub fn reset(&mut self, expiry: Option<Instant>) {
        self.remaining = self.limit.saturating_sub(self.pending);
        self.expiry = expiry;
        self.window = None;
    }

    /// Force the bucket empty until `expiry`, in response to a 429.
    pub fn block_until(&mut self, expiry: Instant) {
        self.remaining = 0;
        self.expiry = Some(expiry);
    }

    /// Pin a window boundary without touching the token counts.
    pub fn begin_window(&mut self, expiry: Instant) {
        self.expiry = Some(expiry);
    }

    /// Absorb `pending` in-flight requests from a bucket this one replaces.
    pub fn inherit_pending(&mut self, pending: u64) {
        self.pending += pending;
    }

    /// Give up all in-flight accounting, for recycling.
    pub fn take_pending(&mut self) -> u64 {
        std::mem::take(&mut self.pending)
    }

    /// Fold a response's header record into the bucket.
    ///
    /// The window comparison decides whether the response belongs to the
    /// current window (nothing to learn), a later one (install the new
    /// limits), or an already-rotated one (return the token so it is not
    /// double-spent).
    pub fn confirm_header(
        &mut self,
        n: u64,
        present: &Present,
        window: SystemTime,
        expiry: Instant,
    ) {
        self.pending = self.pending.saturating_sub(n);

        match self.window {
            Some(current) if current == window => {}
            Some(current) if current > window => {
                self.remaining += n;
            }
            _ => {
                self.limit = present.limit();
                self.remaining = present.remaining().saturating_sub(self.pending);
                self.window = Some(window);
                self.expiry = Some(expiry);
            }
        }
    }

    /// Fold a response's server date into the global bucket.
    ///
    /// The window is inferred from the `date` header: an unchanged date is
    /// the current window, a later date rotates the window, an earlier date
    /// is a response from a window that already rotated out.
    pub fn confirm_date(&mut self, n: u64, date: SystemTime, now: Instant, period: Duration) {
        self.pending = self.pending.saturating_sub(n);

        match self.date {
            Some(current) if current == date => {}
            Some(current) if current > date => {
                self.remaining += n;
            }
            _ => {
                self.date = Some(date);
                self.expiry = Some(now + period);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Bucket;
    use std::time::{Duration as StdDuration, SystemTime, UNIX_EPOCH};
    use tokio::time::{Duration, Instant};

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + StdDuration::from_secs(secs)
    }

    #[tokio::test(start_paused = true)]
    async fn reset_preserves_pending() {
        let mut bucket = Bucket::new("abc".into(), 5);
        bucket.use_tokens(2);

        bucket.reset(None);

        assert_eq!(3, bucket.remaining());
        assert_eq!(2, bucket.pending());
    }

    #[tokio::test(start_paused = true)]
    async fn old_window_response_returns_token() {
        let now = Instant::now();
        let mut bucket = Bucket::new("abc".into(), 5);
        let present = crate::ratelimiting::headers::test_present(5, 3);

        bucket.use_tokens(1);
        bucket.confirm_header(1, &present, at(20), now + Duration::from_secs(1));
        assert_eq!(3, bucket.remaining());

        // A second in-flight request whose response raced the rotation.
        bucket.use_tokens(1);
        bucket.confirm_header(1, &present, at(10), now + Duration::from_secs(1));

        assert_eq!(0, bucket.pending());
        assert_eq!(3, bucket.remaining());
    }

    #[tokio::test(start_paused = true)]
    async fn date_rotation() {
        let now = Instant::now();
        let period = Duration::from_secs(1);
        let mut bucket = Bucket::new("global".into(), 50);

        bucket.use_tokens(1);
        bucket.confirm_date(1, at(100), now, period);
        assert_eq!(Some(now + period), bucket.expiry());

        // Same window: no change.
        bucket.use_tokens(1);
        bucket.confirm_date(1, at(100), now + Duration::from_millis(10), period);
        assert_eq!(Some(now + period), bucket.expiry());

        // Earlier date: the token comes back.
        let remaining = bucket.remaining();
        bucket.use_tokens(1);
        bucket.confirm_date(1, at(99), now, period);
        assert_eq!(remaining, bucket.remaining());
    }
}
