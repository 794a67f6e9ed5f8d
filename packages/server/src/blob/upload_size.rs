use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info};

use crate::config::{CacheBackend, CacheConfig};
use crate::error::AppError;

/// Key under which the accepted size of an upload session is stored.
pub fn upload_size_key(session_id: &str) -> String {
    format!("upload:{session_id}:size")
}

/// Ephemeral store for the byte size accepted so far by a chunked upload session.
///
/// Entries may expire or vanish; callers treat a missing entry as "size unknown".
#[async_trait]
pub trait UploadSizeCache: Send + Sync {
    async fn set_accepted_blob_size(&self, session_id: &str, size: i64) -> Result<(), AppError>;

    /// Fails with [`AppError::NotFound`] when no readable size is stored.
    async fn get_accepted_blob_size(&self, session_id: &str) -> Result<i64, AppError>;
}

/// Build the cache selected by configuration.
pub async fn from_config(config: &CacheConfig) -> Result<Arc<dyn UploadSizeCache>, AppError> {
    let ttl = Duration::from_secs(config.ttl_secs);
    match config.backend {
        CacheBackend::Redis => {
            let cache = RedisUploadSizeCache::connect(&config.url, config.pool_size, ttl).await?;
            info!(url = %config.url, pool_size = config.pool_size, "Upload size cache: redis");
            Ok(Arc::new(cache))
        }
        CacheBackend::Memory => {
            info!("Upload size cache: in-memory");
            Ok(Arc::new(MemoryUploadSizeCache::new(ttl)))
        }
    }
}

/// Redis-backed cache over a small round-robin pool of multiplexed connections.
pub struct RedisUploadSizeCache {
    connections: Vec<MultiplexedConnection>,
    next: AtomicUsize,
    ttl: Duration,
}

impl RedisUploadSizeCache {
    pub async fn connect(url: &str, pool_size: usize, ttl: Duration) -> Result<Self, AppError> {
        let client = redis::Client::open(url)?;
        let mut connections = Vec::with_capacity(pool_size.max(1));
        for _ in 0..pool_size.max(1) {
            connections.push(client.get_multiplexed_async_connection().await?);
        }
        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
            ttl,
        })
    }

    fn connection(&self) -> MultiplexedConnection {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[i].clone()
    }
}

#[async_trait]
impl UploadSizeCache for RedisUploadSizeCache {
    async fn set_accepted_blob_size(&self, session_id: &str, size: i64) -> Result<(), AppError> {
        let key = upload_size_key(session_id);
        let mut conn = self.connection();

        let mut cmd = redis::cmd("SET");
        cmd.arg(&key).arg(size);
        if !self.ttl.is_zero() {
            cmd.arg("EX").arg(self.ttl.as_secs());
        }
        let reply: String = cmd.query_async(&mut conn).await?;

        if reply != "OK" {
            return Err(AppError::Internal(format!(
                "bad reply value {reply:?} when setting {key}"
            )));
        }
        debug!(%key, size, "Stored accepted blob size");
        Ok(())
    }

    async fn get_accepted_blob_size(&self, session_id: &str) -> Result<i64, AppError> {
        let key = upload_size_key(session_id);
        let mut conn = self.connection();

        let value: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;

        value
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| AppError::NotFound(format!("no accepted size for {key}")))
    }
}

/// Upper bound on the interval between sweeps of expired entries.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Process-local cache for single-node deployments and tests.
///
/// Expired entries are dropped when read, and swept from the whole map on
/// writes at most once per `min(ttl, 60s)`.
pub struct MemoryUploadSizeCache {
    entries: DashMap<String, (i64, Option<Instant>)>,
    ttl: Duration,
    started: Instant,
    /// Milliseconds after `started` at which the next sweep is due.
    next_sweep_ms: AtomicU64,
}

impl MemoryUploadSizeCache {
    /// A zero `ttl` keeps entries until they are overwritten.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            started: Instant::now(),
            next_sweep_ms: AtomicU64::new(0),
        }
    }

    fn sweep_expired(&self, now: Instant) {
        if self.ttl.is_zero() {
            return;
        }

        let elapsed = now.duration_since(self.started).as_millis() as u64;
        let due = self.next_sweep_ms.load(Ordering::Relaxed);
        if elapsed < due {
            return;
        }
        let next = elapsed + self.ttl.min(MAX_SWEEP_INTERVAL).as_millis() as u64;
        if self
            .next_sweep_ms
            .compare_exchange(due, next, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            // another writer is sweeping
            return;
        }

        let before = self.entries.len();
        self.entries
            .retain(|_, (_, expires)| expires.is_none_or(|e| e > now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Swept expired upload sizes");
        }
    }
}

#[async_trait]
impl UploadSizeCache for MemoryUploadSizeCache {
    async fn set_accepted_blob_size(&self, session_id: &str, size: i64) -> Result<(), AppError> {
        let now = Instant::now();
        self.sweep_expired(now);

        let expires = (!self.ttl.is_zero()).then(|| now + self.ttl);
        self.entries
            .insert(upload_size_key(session_id), (size, expires));
        Ok(())
    }

    async fn get_accepted_blob_size(&self, session_id: &str) -> Result<i64, AppError> {
        let key = upload_size_key(session_id);
        let now = Instant::now();
        let live = self
            .entries
            .get(&key)
            .and_then(|entry| match entry.1 {
                Some(expires) if expires <= now => None,
                _ => Some(entry.0),
            });

        match live {
            Some(size) => Ok(size),
            None => {
                self.entries.remove_if(&key, |_, (_, expires)| {
                    expires.is_some_and(|e| e <= now)
                });
                Err(AppError::NotFound(format!("no accepted size for {key}")))
            }
        }
    }
}
