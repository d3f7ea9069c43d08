//! Full-text search commands (SEARCHINDEX, SEARCH, SEARCHREMOVE)
//!
//! Documents live in per-namespace indexes beside the keyspace, so the
//! namespace key never shows up in KEYS or EXISTS.

use super::{arg, arg_integer, arg_str, Command, CommandContext, CommandResult};
use crate::aof::AofOperation;
use crate::protocol::Frame;
use bytes::Bytes;

/// SEARCHINDEX namespace id content
pub struct SearchIndexCommand;

impl Command for SearchIndexCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let namespace = arg(args, 0)?;
        let id = arg(args, 1)?;
        let content = arg_str(args, 2)?;

        ctx.store
            .search_index_mut(namespace)
            .upsert(id.clone(), content.to_string());
        ctx.log(
            AofOperation::SearchIndex,
            namespace.clone(),
            vec![id.clone(), Bytes::copy_from_slice(content.as_bytes())],
        );
        Ok(Frame::ok())
    }

    fn name(&self) -> &'static str {
        "SEARCHINDEX"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

/// SEARCH namespace term limit
///
/// A limit of zero or below returns every match.
pub struct SearchCommand;

impl Command for SearchCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let namespace = arg(args, 0)?;
        let term = arg_str(args, 1)?;
        let limit = match arg_integer(args, 2)? {
            n if n <= 0 => None,
            n => Some(n as usize),
        };

        let ids = ctx
            .store
            .search_index(namespace)
            .map(|index| index.query(term, limit))
            .unwrap_or_default();
        Ok(Frame::bulk_array(ids))
    }

    fn name(&self) -> &'static str {
        "SEARCH"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

/// SEARCHREMOVE namespace id
pub struct SearchRemoveCommand;

impl Command for SearchRemoveCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let namespace = arg(args, 0)?;
        let id = arg(args, 1)?;

        let removed = ctx.store.search_index_mut(namespace).remove(id);
        ctx.store.drop_search_index_if_empty(namespace);

        if removed {
            ctx.log(AofOperation::SearchRemove, namespace.clone(), vec![id.clone()]);
        }
        Ok(Frame::integer(removed as i64))
    }

    fn name(&self) -> &'static str {
        "SEARCHREMOVE"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}
