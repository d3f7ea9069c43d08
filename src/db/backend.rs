//! Backend selection
//!
//! The two implementations of the contract. The variant is chosen once, at
//! startup, from configuration.

use super::{DbError, DbResult};
use crate::aof::AofConfig;
use crate::clock::SharedClock;
use crate::cluster::{ClusterConfig, ClusterManager, ShardStats};
use crate::config::{BackendKind, Config};
use crate::dispatch::Dispatcher;
use crate::protocol::Frame;
use crate::store::{MemoryStore, StoreStats};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Clone)]
pub enum Backend {
    /// One keyspace behind an async mutex; a background task sweeps
    /// expired keys every poll interval
    Memory(Arc<Mutex<Dispatcher>>),

    /// Shard threads, each expiring keys from its own timer queue
    Sharded(Arc<ClusterManager>),
}

impl Backend {
    pub async fn open(config: &Config, clock: SharedClock) -> DbResult<Self> {
        let storage = &config.storage;
        info!("Opening {} backend", storage.backend);

        match storage.backend {
            BackendKind::Memory => {
                let store = MemoryStore::with_capacity_and_clock(storage.capacity, clock);
                let dispatcher = if config.aof.enabled {
                    let aof = AofConfig {
                        path: config.aof.dir.join("forumdb.aof"),
                        sync_policy: config.aof.sync,
                        enabled: true,
                    };
                    Dispatcher::with_aof(store, &aof)?
                } else {
                    Dispatcher::with_store(store)
                };

                let dispatcher = Arc::new(Mutex::new(dispatcher));
                spawn_sweeper(
                    Arc::downgrade(&dispatcher),
                    Duration::from_millis(storage.expiry_poll_ms.max(1)),
                );
                Ok(Backend::Memory(dispatcher))
            }
            BackendKind::Sharded => {
                let cluster = ClusterManager::start(ClusterConfig {
                    shards: storage.resolved_shards(),
                    capacity: storage.capacity,
                    aof_dir: config.aof.enabled.then(|| config.aof.dir.clone()),
                    sync_policy: config.aof.sync,
                    clock,
                })
                .await
                .map_err(|e| DbError::Startup(e.to_string()))?;
                Ok(Backend::Sharded(Arc::new(cluster)))
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Memory(_) => BackendKind::Memory,
            Backend::Sharded(_) => BackendKind::Sharded,
        }
    }

    pub fn num_shards(&self) -> usize {
        match self {
            Backend::Memory(_) => 1,
            Backend::Sharded(cluster) => cluster.num_shards(),
        }
    }

    /// Run one command frame and return its reply, error replies included
    pub async fn execute(&self, frame: Frame) -> DbResult<Frame> {
        match self {
            Backend::Memory(dispatcher) => Ok(dispatcher.lock().await.dispatch(&frame)),
            Backend::Sharded(cluster) => Ok(cluster.execute(frame).await?),
        }
    }

    pub async fn stats(&self) -> DbResult<StoreStats> {
        match self {
            Backend::Memory(dispatcher) => Ok(dispatcher.lock().await.stats()),
            Backend::Sharded(cluster) => Ok(cluster.stats().await?),
        }
    }

    /// Per-shard figures; the memory backend reports itself as shard 0
    pub async fn shard_details(&self) -> DbResult<Vec<ShardStats>> {
        match self {
            Backend::Memory(dispatcher) => {
                let stats = dispatcher.lock().await.stats();
                Ok(vec![ShardStats {
                    shard_id: 0,
                    active_keys: stats.active_keys,
                    total_keys: stats.total_keys,
                    expired_keys: stats.expired_keys,
                    volatile_keys: stats.volatile_keys,
                    memory_bytes: stats.used_memory_bytes,
                    search_documents: stats.search_documents,
                }])
            }
            Backend::Sharded(cluster) => Ok(cluster.shard_details().await?),
        }
    }
}

/// Periodically drop expired keys until the dispatcher goes away
fn spawn_sweeper(dispatcher: Weak<Mutex<Dispatcher>>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Some(dispatcher) = dispatcher.upgrade() else {
                break;
            };
            let removed = dispatcher.lock().await.sweep();
            if removed > 0 {
                debug!("Expiry sweep removed {} keys", removed);
            }
        }
    });
}
