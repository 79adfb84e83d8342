//! Redis connection pool and core connection management
//!
//! One multiplexed connection shared by all request handlers; concurrent
//! commands are pipelined over it. `pool_size` bounds how many store calls
//! may be in flight at once, and every call is clipped to the caller's
//! deadline so a slow store can never hold a request hostage.

use crate::config::RedisConfig;
use crate::utils::error::{ProxyError, Result};
use redis::aio::MultiplexedConnection;
use redis::{Client, FromRedisValue, ScriptInvocation};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Shared Redis pool
#[derive(Clone)]
pub struct RedisPool {
    connection: MultiplexedConnection,
    permits: Arc<Semaphore>,
}

impl RedisPool {
    /// Connect to Redis and build the pool.
    pub async fn connect(cfg: &RedisConfig) -> Result<Self> {
        info!(address = %cfg.address, db = cfg.db, "creating redis connection pool");

        let url = Self::connection_url(cfg)?;
        let client = Client::open(url.as_str())?;
        let connection = client.get_multiplexed_async_connection().await?;

        Ok(Self {
            connection,
            permits: Arc::new(Semaphore::new(cfg.pool_size)),
        })
    }

    fn connection_url(cfg: &RedisConfig) -> Result<String> {
        let mut url = url::Url::parse(&format!("redis://{}/{}", cfg.address, cfg.db))
            .map_err(|e| ProxyError::config(format!("invalid redis address: {e}")))?;
        if !cfg.password.is_empty() {
            url.set_password(Some(&cfg.password))
                .map_err(|_| ProxyError::config("invalid redis password"))?;
        }
        Ok(url.into())
    }

    /// Liveness probe used at startup.
    pub async fn ping(&self, timeout: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let pong: String = tokio::time::timeout(timeout, async {
            redis::cmd("PING").query_async(&mut conn).await
        })
        .await
        .map_err(|_| ProxyError::StoreTimeout)?
        .map_err(ProxyError::Store)?;

        debug!(reply = %pong, "redis ping ok");
        Ok(())
    }

    /// Run a Lua script invocation, bounded by the request deadline.
    pub async fn invoke_script<T: FromRedisValue>(
        &self,
        invocation: ScriptInvocation<'_>,
        deadline: Instant,
    ) -> Result<T> {
        let mut conn = self.connection.clone();
        self.bounded(deadline, async move { invocation.invoke_async(&mut conn).await })
            .await
    }

    /// Run a plain command, bounded by the request deadline.
    pub async fn query<T: FromRedisValue>(&self, cmd: redis::Cmd, deadline: Instant) -> Result<T> {
        let mut conn = self.connection.clone();
        self.bounded(deadline, async move { cmd.query_async(&mut conn).await })
            .await
    }

    async fn bounded<T>(
        &self,
        deadline: Instant,
        fut: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T> {
        let run = async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| ProxyError::Server("redis pool closed".to_string()))?;
            fut.await.map_err(ProxyError::Store)
        };

        match tokio::time::timeout_at(deadline.into(), run).await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::StoreTimeout),
        }
    }
}
