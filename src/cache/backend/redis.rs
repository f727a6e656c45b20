//! Redis Backend
//!
//! Remote store binding. Blocking calls share one lazily opened connection
//! with read/write timeouts; async calls share one lazily opened multiplexed
//! connection and wrap every command in `tokio::time::timeout`. Any failure
//! drops the connection so the next call reconnects. No lock is held while
//! waiting on the network.

use std::sync::Mutex;
use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::{Client, Cmd, ConnectionAddr, ConnectionInfo, FromRedisValue, RedisConnectionInfo};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use super::{CacheBackend, KeyTtl};
use crate::config::Config;
use crate::error::{StoreError, StoreResult};

// == Redis Settings ==
/// Where and how to reach the Redis server.
#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl RedisSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.redis_host.clone(),
            port: config.redis_port,
            db: config.redis_db,
            password: config.redis_password.clone(),
            timeout: config.redis_timeout(),
        }
    }

    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }
}

/// Result of an in-flight connect, published once it settles.
/// The inner None means the connect failed.
type ConnectOutcome = Option<Option<MultiplexedConnection>>;

/// State of the shared async connection.
enum AsyncSlot {
    Empty,
    Pending(watch::Receiver<ConnectOutcome>),
    Ready(MultiplexedConnection),
}

enum Connect {
    Open(watch::Sender<ConnectOutcome>),
    Wait(watch::Receiver<ConnectOutcome>),
}

// == Redis Backend ==
pub struct RedisBackend {
    client: Client,
    timeout: Duration,
    address: String,
    blocking: Mutex<Option<::redis::Connection>>,
    shared: Mutex<AsyncSlot>,
}

impl RedisBackend {
    /// Builds the client. No connection is attempted until first use.
    pub fn new(settings: &RedisSettings) -> StoreResult<Self> {
        let client = Client::open(settings.connection_info())?;

        Ok(Self {
            client,
            timeout: settings.timeout,
            address: format!("{}:{}/{}", settings.host, settings.port, settings.db),
            blocking: Mutex::new(None),
            shared: Mutex::new(AsyncSlot::Empty),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    // == Blocking Path ==
    /// Runs `cmd` on the shared blocking connection. The connection is taken
    /// out of its slot for the round trip, so the lock is never held across
    /// network I/O; concurrent callers that find the slot empty connect on
    /// their own.
    fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> StoreResult<T> {
        let idle = self
            .blocking
            .lock()
            .map_err(|_| StoreError::Unavailable)?
            .take();

        let mut conn = match idle {
            Some(conn) => conn,
            None => self.open_blocking()?,
        };

        let value = cmd.query(&mut conn)?;

        if let Ok(mut slot) = self.blocking.lock() {
            if slot.is_none() {
                *slot = Some(conn);
            }
        }
        Ok(value)
    }

    fn open_blocking(&self) -> StoreResult<::redis::Connection> {
        debug!("opening blocking redis connection to {}", self.address);
        let conn = self.client.get_connection_with_timeout(self.timeout)?;
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))?;
        Ok(conn)
    }

    // == Async Path ==
    /// Returns the shared multiplexed connection, opening it if needed.
    ///
    /// Only one connect is in flight at a time. Callers arriving while it
    /// runs wait for its outcome instead of starting their own, so an
    /// unreachable server costs every caller one timeout, not one each.
    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        let step = {
            let mut slot = self.shared.lock().map_err(|_| StoreError::Unavailable)?;
            match &*slot {
                AsyncSlot::Ready(conn) => return Ok(conn.clone()),
                // A closed channel means the connecting caller was dropped
                AsyncSlot::Pending(rx) if rx.has_changed().is_ok() => Connect::Wait(rx.clone()),
                _ => {
                    let (tx, rx) = watch::channel(None);
                    *slot = AsyncSlot::Pending(rx);
                    Connect::Open(tx)
                }
            }
        };

        let mut rx = match step {
            Connect::Open(tx) => return self.open_shared(tx).await,
            Connect::Wait(rx) => rx,
        };

        let outcome = rx
            .wait_for(|outcome| outcome.is_some())
            .await
            .map_err(|_| StoreError::Unavailable)?;
        match outcome.as_ref() {
            Some(Some(conn)) => Ok(conn.clone()),
            _ => Err(StoreError::Unavailable),
        }
    }

    /// Connects, then publishes the outcome to the slot and to any waiters.
    async fn open_shared(
        &self,
        tx: watch::Sender<ConnectOutcome>,
    ) -> StoreResult<MultiplexedConnection> {
        debug!("opening async redis connection to {}", self.address);
        let connect = self.client.get_multiplexed_async_connection();
        let result = match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(StoreError::from(e)),
            Err(_) => Err(StoreError::Timeout),
        };

        if let Ok(mut slot) = self.shared.lock() {
            *slot = match &result {
                Ok(conn) => AsyncSlot::Ready(conn.clone()),
                Err(_) => AsyncSlot::Empty,
            };
        }
        tx.send_replace(Some(result.as_ref().ok().cloned()));

        result
    }

    async fn query_async<T: FromRedisValue + Send>(&self, cmd: &Cmd) -> StoreResult<T> {
        let mut conn = self.connection().await?;

        let result = match tokio::time::timeout(self.timeout, cmd.query_async(&mut conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::from(e)),
            Err(_) => Err(StoreError::Timeout),
        };

        if result.is_err() {
            if let Ok(mut slot) = self.shared.lock() {
                if matches!(*slot, AsyncSlot::Ready(_)) {
                    *slot = AsyncSlot::Empty;
                }
            }
        }
        result
    }
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("address", &self.address)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// == Commands ==
fn ping_cmd() -> Cmd {
    ::redis::cmd("PING")
}

fn get_cmd(key: &str) -> Cmd {
    let mut cmd = ::redis::cmd("GET");
    cmd.arg(key);
    cmd
}

/// `SET key value [EX ttl] [NX]`; replies OK, or nil when NX blocked the write.
fn set_cmd(key: &str, value: &[u8], ttl: Option<u64>, only_if_absent: bool) -> Cmd {
    let mut cmd = ::redis::cmd("SET");
    cmd.arg(key).arg(value);
    if let Some(ttl) = ttl {
        cmd.arg("EX").arg(ttl);
    }
    if only_if_absent {
        cmd.arg("NX");
    }
    cmd
}

fn del_cmd(keys: &[String]) -> Cmd {
    let mut cmd = ::redis::cmd("DEL");
    for key in keys {
        cmd.arg(key);
    }
    cmd
}

fn keys_cmd(pattern: &str) -> Cmd {
    let mut cmd = ::redis::cmd("KEYS");
    cmd.arg(pattern);
    cmd
}

fn ttl_cmd(key: &str) -> Cmd {
    let mut cmd = ::redis::cmd("TTL");
    cmd.arg(key);
    cmd
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn ping(&self) -> StoreResult<()> {
        self.query::<String>(&ping_cmd()).map(|_| ())
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.query(&get_cmd(key))
    }

    fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<u64>,
        only_if_absent: bool,
    ) -> StoreResult<bool> {
        let reply: Option<String> = self.query(&set_cmd(key, value, ttl, only_if_absent))?;
        Ok(reply.is_some())
    }

    fn delete(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.query(&del_cmd(keys))
    }

    fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.query(&keys_cmd(pattern))
    }

    fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let reply: i64 = self.query(&ttl_cmd(key))?;
        Ok(KeyTtl::from_reply(reply))
    }

    async fn ping_async(&self) -> StoreResult<()> {
        self.query_async::<String>(&ping_cmd()).await.map(|_| ())
    }

    async fn get_async(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.query_async(&get_cmd(key)).await
    }

    async fn set_async(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<u64>,
        only_if_absent: bool,
    ) -> StoreResult<bool> {
        let reply: Option<String> = self
            .query_async(&set_cmd(key, value, ttl, only_if_absent))
            .await?;
        Ok(reply.is_some())
    }

    async fn delete_async(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.query_async(&del_cmd(keys)).await
    }

    async fn keys_async(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.query_async(&keys_cmd(pattern)).await
    }

    async fn ttl_async(&self, key: &str) -> StoreResult<KeyTtl> {
        let reply: i64 = self.query_async(&ttl_cmd(key)).await?;
        Ok(KeyTtl::from_reply(reply))
    }
}
