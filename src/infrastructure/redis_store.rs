//! Redis-backed window store.
//!
//! Lets several application instances share one set of throttle windows, so
//! a client is limited across the whole deployment rather than per process.
//!
//! ## Data model
//!
//! - Key: `{key_prefix}{identifier}:{category}`
//! - Value: hash with fields `count`, `start_ms` (Unix ms), `window_ms`
//! - TTL: the window length, set when a window opens, so idle clients vanish
//!   without a sweep
//!
//! A hit runs as one Lua script: read the hash, open a new window if it is
//! missing or elapsed, otherwise reject or increment. Redis executes scripts
//! atomically, which gives the same per-key guarantee as the in-memory store.
//!
//! ## Time
//!
//! Window starts are stored as wall-clock milliseconds so that every instance
//! agrees on them. The throttle's monotonic instants are converted through a
//! base pair captured at connect time. Instances should run NTP-synchronized
//! clocks; skew shifts window boundaries by the skew.
//!
//! ## Limitations
//!
//! - `len()` always returns 0 and `is_empty()` always returns false. An exact
//!   count needs a full SCAN, which is too expensive to do on demand.
//! - `sweep()` is a no-op; expiry is handled by Redis TTLs.
//! - The store bridges a synchronous port onto the async client with
//!   `block_in_place`, which requires the multi-threaded tokio runtime.
//!   Called outside any runtime it spins up a temporary one.
//!
//! ## Example
//!
//! ```rust,ignore
//! use request_throttle::{RedisStore, Throttle};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = RedisStore::connect("redis://127.0.0.1/")
//!         .await
//!         .expect("Failed to connect to Redis");
//!
//!     let throttle = Throttle::builder().build_with_store(store).unwrap();
//! }
//! ```

use crate::application::ports::{StoreError, WindowStore};
use crate::domain::{
    key::ThrottleKey,
    limits::WindowLimit,
    window::{Decision, WindowState},
};
use crate::infrastructure::clock::WallClockBase;
use redis::aio::ConnectionManager;
use redis::{Client, ErrorKind, RedisError, Script};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

/// KEYS[1] = window key; ARGV = now_ms, limit, window_ms.
/// Returns {admitted (0/1), count, start_ms}.
const HIT_SCRIPT: &str = r#"
local now = tonumber(ARGV[1])
local limit = tonumber(ARGV[2])
local window = tonumber(ARGV[3])
local state = redis.call('HMGET', KEYS[1], 'count', 'start_ms')
local count = tonumber(state[1])
local start = tonumber(state[2])
if count == nil or start == nil or now - start > window then
  redis.call('HSET', KEYS[1], 'count', 1, 'start_ms', now, 'window_ms', window)
  redis.call('PEXPIRE', KEYS[1], window + 1)
  return {1, 1, now}
end
if count >= limit then
  return {0, count, start}
end
count = redis.call('HINCRBY', KEYS[1], 'count', 1)
redis.call('HSET', KEYS[1], 'window_ms', window)
redis.call('PEXPIRE', KEYS[1], start + window - now + 1)
return {1, count, start}
"#;

/// Longest window sent to the script. Lua numbers are doubles, so larger
/// millisecond values would lose precision.
const MAX_SCRIPT_WINDOW_MS: u64 = 1 << 52;

fn script_window_ms(limit: WindowLimit) -> u64 {
    u64::try_from(limit.window().as_millis())
        .unwrap_or(u64::MAX)
        .min(MAX_SCRIPT_WINDOW_MS)
}

/// Configuration for the Redis store.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Key prefix for Redis keys (default: "request-throttle:")
    pub key_prefix: String,
    /// How long to wait for the initial connection (default: 5 seconds)
    pub connect_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "request-throttle:".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Redis-backed window store for throttling across instances.
///
/// Cloning is cheap; clones share the underlying connection.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
    script: Script,
    base: WallClockBase,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to Redis with default configuration.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1/")
    ///
    /// # Errors
    /// Returns error if connection fails.
    pub async fn connect(url: &str) -> Result<Self, RedisError> {
        Self::connect_with_config(url, RedisStoreConfig::default()).await
    }

    /// Connect to Redis with custom configuration.
    ///
    /// # Errors
    /// Returns error if the URL is invalid, the connection fails, or it does
    /// not complete within `connect_timeout`.
    pub async fn connect_with_config(
        url: &str,
        config: RedisStoreConfig,
    ) -> Result<Self, RedisError> {
        let client = Client::open(url)?;
        let connection = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| RedisError::from((ErrorKind::IoError, "connection timed out")))??;

        tracing::info!(key_prefix = %config.key_prefix, "connected to redis window store");

        Ok(Self {
            connection,
            config,
            script: Script::new(HIT_SCRIPT),
            base: WallClockBase::capture(Instant::now()),
        })
    }

    /// Get the store configuration.
    pub fn config(&self) -> &RedisStoreConfig {
        &self.config
    }

    fn redis_key(&self, key: &ThrottleKey) -> String {
        redis_key(&self.config.key_prefix, key)
    }

    /// Run an async Redis operation from synchronous code.
    fn block_on<F, T>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        let result = if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tokio::task::block_in_place(|| handle.block_on(op))
        } else {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| StoreError::Unavailable(format!("failed to create runtime: {}", e)))?;
            rt.block_on(op)
        };
        result.map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

fn redis_key(prefix: &str, key: &ThrottleKey) -> String {
    format!("{}{}", prefix, key)
}

/// Turn the script reply into a decision.
fn decode_hit(
    reply: (i64, i64, i64),
    now_ms: u64,
    limit: WindowLimit,
) -> Decision {
    let (admitted, count, start_ms) = reply;
    if admitted == 1 {
        let count = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
        Decision::Admitted {
            remaining: limit.limit().saturating_sub(count),
        }
    } else {
        let window_end = (start_ms.max(0) as u64).saturating_add(script_window_ms(limit));
        Decision::Rejected {
            retry_after: Duration::from_millis(window_end.saturating_sub(now_ms)),
        }
    }
}

/// Turn an HMGET reply into a window state.
fn decode_state(
    key: &ThrottleKey,
    fields: (Option<u32>, Option<u64>, Option<u64>),
    base: &WallClockBase,
) -> Result<Option<WindowState>, StoreError> {
    match fields {
        (None, None, None) => Ok(None),
        (Some(count), Some(start_ms), Some(window_ms)) => Ok(Some(WindowState::from_parts(
            count,
            base.instant(start_ms),
            Duration::from_millis(window_ms),
        ))),
        _ => Err(StoreError::Corrupted {
            key: key.to_string(),
            reason: "incomplete window hash".to_string(),
        }),
    }
}

impl WindowStore for RedisStore {
    fn hit(
        &self,
        key: &ThrottleKey,
        now: Instant,
        limit: WindowLimit,
    ) -> Result<Decision, StoreError> {
        let redis_key = self.redis_key(key);
        let now_ms = self.base.unix_ms(now);
        let window_ms = script_window_ms(limit);
        let mut conn = self.connection.clone();

        let reply: (i64, i64, i64) = self.block_on(async {
            self.script
                .key(&redis_key)
                .arg(now_ms)
                .arg(limit.limit())
                .arg(window_ms)
                .invoke_async(&mut conn)
                .await
        })?;

        Ok(decode_hit(reply, now_ms, limit))
    }

    fn peek(&self, key: &ThrottleKey) -> Result<Option<WindowState>, StoreError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.connection.clone();

        let fields: (Option<u32>, Option<u64>, Option<u64>) = self.block_on(async {
            redis::cmd("HMGET")
                .arg(&redis_key)
                .arg("count")
                .arg("start_ms")
                .arg("window_ms")
                .query_async(&mut conn)
                .await
        })?;

        decode_state(key, fields, &self.base)
    }

    fn remove(&self, key: &ThrottleKey) -> Result<bool, StoreError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.connection.clone();

        let removed: i64 = self.block_on(async {
            redis::cmd("DEL").arg(&redis_key).query_async(&mut conn).await
        })?;

        Ok(removed > 0)
    }

    /// No-op: windows expire through their Redis TTL.
    fn sweep(&self, _now: Instant, _max_age: Duration) -> Result<usize, StoreError> {
        Ok(0)
    }

    /// Returns the number of tracked keys.
    ///
    /// # Limitation
    ///
    /// **This always returns 0 for RedisStore.** Counting would need a SCAN
    /// of the whole keyspace; use Redis monitoring for key counts instead.
    fn len(&self) -> usize {
        0
    }

    /// Check if the store is empty.
    ///
    /// # Limitation
    ///
    /// **This always returns false for RedisStore**, for the same reason as
    /// `len()`.
    fn is_empty(&self) -> bool {
        false
    }

    fn clear(&self) {
        let pattern = format!("{}*", self.config.key_prefix);
        let mut conn = self.connection.clone();

        let result = self.block_on(async {
            let mut cursor: u64 = 0;
            let mut deleted: u64 = 0;
            loop {
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(100)
                    .query_async(&mut conn)
                    .await?;

                if !keys.is_empty() {
                    let n: u64 = redis::cmd("DEL").arg(&keys).query_async(&mut conn).await?;
                    deleted += n;
                }

                if next == 0 {
                    return Ok(deleted);
                }
                cursor = next;
            }
        });

        match result {
            Ok(deleted) => tracing::info!(deleted, "cleared redis window store"),
            Err(e) => tracing::warn!(error = %e, "failed to clear redis window store"),
        }
    }
}
