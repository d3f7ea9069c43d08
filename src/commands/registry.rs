//! Command registry
//!
//! Maps upper-cased names to commands and runs a command frame end to end:
//! lookup, arity check, execution, error reply.

use super::{admin, counter, hash, key, list, search, set, sorted_set, ttl, value};
use super::{Command, CommandContext, CommandError};
use crate::protocol::Frame;
use std::collections::HashMap;
use std::sync::Arc;

pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut registry = CommandRegistry {
            commands: HashMap::new(),
        };

        // Keys
        registry.register(Arc::new(key::DelCommand));
        registry.register(Arc::new(key::ExistsCommand));
        registry.register(Arc::new(key::RenameCommand));
        registry.register(Arc::new(key::KeysCommand));
        registry.register(Arc::new(key::TypeCommand));

        // Expiration
        registry.register(Arc::new(ttl::ExpireCommand));
        registry.register(Arc::new(ttl::ExpireAtCommand));
        registry.register(Arc::new(ttl::PExpireCommand));
        registry.register(Arc::new(ttl::PExpireAtCommand));
        registry.register(Arc::new(ttl::TtlCommand));
        registry.register(Arc::new(ttl::PTtlCommand));

        // Single values and counters
        registry.register(Arc::new(value::SetCommand));
        registry.register(Arc::new(value::GetCommand));
        registry.register(Arc::new(counter::IncrCommand));
        registry.register(Arc::new(counter::IncrByCommand));
        registry.register(Arc::new(counter::DecrCommand));
        registry.register(Arc::new(counter::DecrByCommand));

        // Objects
        registry.register(Arc::new(hash::HSetCommand));
        registry.register(Arc::new(hash::HGetCommand));
        registry.register(Arc::new(hash::HMGetCommand));
        registry.register(Arc::new(hash::HGetAllCommand));
        registry.register(Arc::new(hash::HDelCommand));
        registry.register(Arc::new(hash::HKeysCommand));
        registry.register(Arc::new(hash::HValsCommand));
        registry.register(Arc::new(hash::HExistsCommand));
        registry.register(Arc::new(hash::HIncrByCommand));

        // Sorted sets
        registry.register(Arc::new(sorted_set::ZAddCommand));
        registry.register(Arc::new(sorted_set::ZRemCommand));
        registry.register(Arc::new(sorted_set::ZRangeCommand));
        registry.register(Arc::new(sorted_set::ZRevRangeCommand));
        registry.register(Arc::new(sorted_set::ZRangeByScoreCommand));
        registry.register(Arc::new(sorted_set::ZRevRangeByScoreCommand));
        registry.register(Arc::new(sorted_set::ZCountCommand));
        registry.register(Arc::new(sorted_set::ZCardCommand));
        registry.register(Arc::new(sorted_set::ZScoreCommand));
        registry.register(Arc::new(sorted_set::ZRankCommand));
        registry.register(Arc::new(sorted_set::ZRevRankCommand));
        registry.register(Arc::new(sorted_set::ZIncrByCommand));
        registry.register(Arc::new(sorted_set::ZRemRangeByScoreCommand));

        // Sets
        registry.register(Arc::new(set::SAddCommand));
        registry.register(Arc::new(set::SRemCommand));
        registry.register(Arc::new(set::SIsMemberCommand));
        registry.register(Arc::new(set::SMembersCommand));
        registry.register(Arc::new(set::SCardCommand));

        // Lists
        registry.register(Arc::new(list::LPushCommand));
        registry.register(Arc::new(list::RPushCommand));
        registry.register(Arc::new(list::RPopCommand));
        registry.register(Arc::new(list::LRemCommand));
        registry.register(Arc::new(list::LTrimCommand));
        registry.register(Arc::new(list::LRangeCommand));
        registry.register(Arc::new(list::LLenCommand));

        // Full-text search
        registry.register(Arc::new(search::SearchIndexCommand));
        registry.register(Arc::new(search::SearchCommand));
        registry.register(Arc::new(search::SearchRemoveCommand));

        // Admin
        registry.register(Arc::new(admin::InfoCommand));
        registry.register(Arc::new(admin::FlushDbCommand));
        registry.register(Arc::new(admin::PingCommand));

        registry
    }

    fn register(&mut self, command: Arc<dyn Command>) {
        let name = command.name().to_uppercase();
        self.commands.insert(name, command);
    }

    /// Look up a command (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(&name.to_uppercase()).cloned()
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_uppercase())
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    /// Run a command frame and produce its reply
    pub fn execute(&self, ctx: &mut CommandContext, frame: &Frame) -> Frame {
        match self.try_execute(ctx, frame) {
            Ok(reply) => reply,
            Err(e) => e.into(),
        }
    }

    fn try_execute(&self, ctx: &mut CommandContext, frame: &Frame) -> Result<Frame, CommandError> {
        let parts = match frame.as_array() {
            Some(parts) if !parts.is_empty() => parts,
            _ => return Err(CommandError::Invalid("expected a command array".to_string())),
        };
        let name = frame
            .command_name()
            .ok_or_else(|| CommandError::Invalid("invalid command name".to_string()))?;
        let command = self
            .get(&name)
            .ok_or_else(|| CommandError::Unknown(name.clone()))?;

        let args = &parts[1..];
        let too_many = command.max_args().map(|max| args.len() > max).unwrap_or(false);
        if args.len() < command.min_args() || too_many {
            return Err(CommandError::WrongArity(name.to_lowercase()));
        }

        command.execute(ctx, args)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
