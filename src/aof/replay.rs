//! AOF replay
//!
//! Every logged operation is re-executed as the command it names, through
//! the same registry that serves clients.

use super::{AofConfig, AofEntry, AofError, AofReader, AofWriter};
use crate::commands::{CommandContext, CommandRegistry};
use crate::protocol::Frame;
use std::sync::Arc;
use tracing::{info, warn};

/// Replay the log at `config.path` into `ctx`, then attach a writer to it
///
/// Does nothing when persistence is disabled. A missing file is an empty
/// log.
pub fn restore(
    ctx: &mut CommandContext,
    registry: &CommandRegistry,
    config: &AofConfig,
) -> Result<usize, AofError> {
    if !config.enabled {
        return Ok(0);
    }

    let reader = AofReader::load_or_empty(&config.path)?;
    let replayed = if reader.size() > 0 {
        info!("Loading AOF from {:?} ({} bytes)", config.path, reader.size());
        replay_entries(ctx, registry, reader.parse_entries())
    } else {
        0
    };

    let writer = AofWriter::new(&config.path, config.sync_policy)?;
    ctx.set_aof_writer(Arc::new(writer));
    info!("AOF writer attached at {:?}", config.path);
    Ok(replayed)
}

/// Re-execute logged entries against a context, returning how many applied
///
/// Logging is suspended while replaying so the log is not written back to
/// itself.
pub fn replay_entries(
    ctx: &mut CommandContext,
    registry: &CommandRegistry,
    entries: Vec<AofEntry>,
) -> usize {
    let writer = ctx.aof_writer.take();
    let total = entries.len();
    let mut replayed = 0;

    for entry in entries {
        let frame = Frame::command(entry.op.command_name(), entry.command_args());
        match registry.execute(ctx, &frame) {
            Frame::Error(e) => {
                warn!("Failed to replay {} on {:?}: {}. Skipping.", entry.op.command_name(), entry.key, e)
            }
            _ => replayed += 1,
        }
    }

    ctx.aof_writer = writer;

    info!("Replayed {}/{} AOF entries", replayed, total);
    replayed
}
