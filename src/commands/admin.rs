//! Admin commands (INFO, FLUSHDB, PING)

use super::{arg, Command, CommandContext, CommandResult};
use crate::aof::AofOperation;
use crate::protocol::Frame;
use crate::store::StoreStats;
use bytes::Bytes;

/// Render keyspace figures as the `INFO` text (`name:value` lines)
///
/// Shared by the single keyspace and the cluster, which merges the figures
/// of every shard first.
pub fn format_info(stats: &StoreStats, backend: &str, shards: usize) -> String {
    format!(
        "# Server\r\n\
        forumdb_version:{}\r\n\
        backend:{}\r\n\
        shards:{}\r\n\
        os:{}\r\n\
        arch:{}\r\n\
        \r\n\
        # Keyspace\r\n\
        keys:{}\r\n\
        expires:{}\r\n\
        expired_pending:{}\r\n\
        total_entries:{}\r\n\
        \r\n\
        # Memory\r\n\
        used_memory:{}\r\n\
        index_memory:{}\r\n\
        aof_bytes:{}\r\n\
        \r\n\
        # Search\r\n\
        search_documents:{}\r\n\
        search_namespaces:{}\r\n",
        env!("CARGO_PKG_VERSION"),
        backend,
        shards,
        std::env::consts::OS,
        std::env::consts::ARCH,
        stats.active_keys,
        stats.volatile_keys,
        stats.expired_keys,
        stats.total_keys,
        stats.used_memory_bytes,
        stats.index_memory_bytes,
        stats.aof_bytes,
        stats.search_documents,
        stats.search_namespaces,
    )
}

/// INFO [section]
///
/// The section argument is accepted and ignored; everything is returned.
pub struct InfoCommand;

impl Command for InfoCommand {
    fn execute(&self, ctx: &mut CommandContext, _args: &[Frame]) -> CommandResult {
        let info = format_info(&ctx.stats(), "memory", 1);
        Ok(Frame::bulk(info))
    }

    fn name(&self) -> &'static str {
        "INFO"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// FLUSHDB
///
/// Drops every key and every search document.
pub struct FlushDbCommand;

impl Command for FlushDbCommand {
    fn execute(&self, ctx: &mut CommandContext, _args: &[Frame]) -> CommandResult {
        ctx.store.clear();
        ctx.log(AofOperation::FlushDb, Bytes::new(), vec![]);
        Ok(Frame::ok())
    }

    fn name(&self) -> &'static str {
        "FLUSHDB"
    }

    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
}

/// PING [message]
pub struct PingCommand;

impl Command for PingCommand {
    fn execute(&self, _ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        if args.is_empty() {
            return Ok(Frame::simple("PONG"));
        }
        Ok(Frame::Bulk(arg(args, 0)?.clone()))
    }

    fn name(&self) -> &'static str {
        "PING"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}
