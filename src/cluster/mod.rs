//! Sharded keyspace
//!
//! The keyspace is split over shard threads. Single-key commands go to the
//! shard owning their key; multi-key and keyspace-wide commands are split
//! or fanned out and their replies merged here.

mod router;
mod shard;

pub use router::ShardRouter;
pub use shard::{Shard, ShardConfig, ShardRequest};

use crate::aof::{AofConfig, SyncPolicy};
use crate::clock::SharedClock;
use crate::commands::format_info;
use crate::protocol::Frame;
use crate::store::StoreStats;
use bytes::Bytes;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClusterError {
    #[error("shard {0} is unavailable")]
    Unavailable(usize),
}

/// Settings for starting a cluster
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub shards: usize,
    /// Initial capacity of each shard's keyspace
    pub capacity: usize,
    /// Directory for the per-shard logs; `None` disables persistence
    pub aof_dir: Option<PathBuf>,
    pub sync_policy: SyncPolicy,
    pub clock: SharedClock,
}

impl ClusterConfig {
    fn aof_for(&self, shard_id: usize) -> AofConfig {
        match &self.aof_dir {
            Some(dir) => AofConfig {
                path: dir.join(format!("forumdb_shard_{}.aof", shard_id)),
                sync_policy: self.sync_policy,
                enabled: true,
            },
            None => AofConfig::disabled(),
        }
    }
}

/// Owns the shards and routes commands to them
pub struct ClusterManager {
    shards: Vec<Shard>,
    router: ShardRouter,
}

impl ClusterManager {
    pub async fn start(config: ClusterConfig) -> anyhow::Result<Self> {
        let num_shards = config.shards.max(1);
        info!("Initializing cluster with {} shards", num_shards);

        let mut shards = Vec::with_capacity(num_shards);
        for shard_id in 0..num_shards {
            let shard = Shard::spawn(ShardConfig {
                shard_id,
                capacity: config.capacity,
                aof: config.aof_for(shard_id),
                clock: config.clock.clone(),
            })
            .await?;
            shards.push(shard);
        }

        info!("Cluster initialized with {} shards", num_shards);
        Ok(ClusterManager {
            shards,
            router: ShardRouter::new(num_shards),
        })
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Execute a command frame against the cluster
    pub async fn execute(&self, frame: Frame) -> Result<Frame, ClusterError> {
        let name = frame.command_name().unwrap_or_default();
        let keys = command_args(&frame);

        match name.as_str() {
            "DEL" | "EXISTS" if !keys.is_empty() => self.sum_per_shard(&name, &keys).await,
            "KEYS" => self.collect_keys(frame).await,
            "FLUSHDB" => self.flush(frame).await,
            "INFO" => {
                let stats = self.stats().await?;
                Ok(Frame::bulk(format_info(&stats, "sharded", self.num_shards())))
            }
            "RENAME" if keys.len() == 2 => self.rename(frame, &keys[0], &keys[1]).await,
            _ => {
                let shard_id = keys.first().map(|key| self.router.route_key(key)).unwrap_or(0);
                self.shards[shard_id].execute(frame).await
            }
        }
    }

    /// Split a multi-key command per shard and add up the integer replies
    async fn sum_per_shard(&self, name: &str, keys: &[Bytes]) -> Result<Frame, ClusterError> {
        let mut total = 0;
        for (shard_id, group) in self.router.split(keys).into_iter().enumerate() {
            if group.is_empty() {
                continue;
            }
            match self.shards[shard_id].execute(Frame::command(name, group)).await? {
                Frame::Integer(n) => total += n,
                other => return Ok(other),
            }
        }
        Ok(Frame::integer(total))
    }

    async fn collect_keys(&self, frame: Frame) -> Result<Frame, ClusterError> {
        let mut keys = Vec::new();
        for shard in &self.shards {
            match shard.execute(frame.clone()).await? {
                Frame::Array(items) => keys.extend(items),
                other => return Ok(other),
            }
        }
        keys.sort_by(|a, b| a.as_bulk().cmp(&b.as_bulk()));
        Ok(Frame::Array(keys))
    }

    async fn flush(&self, frame: Frame) -> Result<Frame, ClusterError> {
        for shard in &self.shards {
            let reply = shard.execute(frame.clone()).await?;
            if reply.is_error() {
                return Ok(reply);
            }
        }
        Ok(Frame::ok())
    }

    /// Rename, migrating the entry when the two keys live on different
    /// shards
    ///
    /// The migration is a removal on one shard followed by a rebuild on the
    /// other; it is not atomic.
    async fn rename(&self, frame: Frame, old: &Bytes, new: &Bytes) -> Result<Frame, ClusterError> {
        let from = self.router.route_key(old);
        let to = self.router.route_key(new);
        if from == to {
            return self.shards[from].execute(frame).await;
        }

        let Some(entry) = self.shards[from].extract(old.clone()).await? else {
            return Ok(Frame::ok());
        };
        let reply = self.shards[to].install(new.clone(), entry).await?;
        if reply.is_error() {
            warn!("Cross-shard rename of {:?} to {:?} failed: {:?}", old, new, reply);
        }
        Ok(reply)
    }

    /// Keyspace figures summed over every shard
    pub async fn stats(&self) -> Result<StoreStats, ClusterError> {
        let mut total = StoreStats::default();
        for shard in &self.shards {
            total = total.merge(&shard.stats().await?);
        }
        Ok(total)
    }

    /// Figures of each shard
    pub async fn shard_details(&self) -> Result<Vec<ShardStats>, ClusterError> {
        let mut details = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            let stats = shard.stats().await?;
            details.push(ShardStats {
                shard_id: shard.id(),
                active_keys: stats.active_keys,
                total_keys: stats.total_keys,
                expired_keys: stats.expired_keys,
                volatile_keys: stats.volatile_keys,
                memory_bytes: stats.used_memory_bytes,
                search_documents: stats.search_documents,
            });
        }
        Ok(details)
    }
}

/// Arguments after the command name, when they are all bulk strings
fn command_args(frame: &Frame) -> Vec<Bytes> {
    frame
        .as_array()
        .map(|parts| parts.iter().skip(1).filter_map(Frame::as_bulk).cloned().collect())
        .unwrap_or_default()
}

/// Figures of a single shard
#[derive(Debug, Clone, serde::Serialize)]
pub struct ShardStats {
    pub shard_id: usize,
    pub active_keys: usize,
    pub total_keys: usize,
    pub expired_keys: usize,
    pub volatile_keys: usize,
    pub memory_bytes: usize,
    pub search_documents: usize,
}
