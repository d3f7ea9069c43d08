//! Command dispatcher
//!
//! Owns one keyspace and the registry, and is what the memory backend
//! guards with its mutex.

use crate::aof::{restore, AofConfig, AofError};
use crate::commands::{CommandContext, CommandRegistry};
use crate::protocol::Frame;
use crate::store::{MemoryStore, StoreStats};
use tracing::{debug, info, warn};

pub struct Dispatcher {
    registry: CommandRegistry,
    context: CommandContext,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_store(MemoryStore::with_capacity(capacity))
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Dispatcher {
            registry: CommandRegistry::new(),
            context: CommandContext::with_store(store),
        }
    }

    /// Dispatcher whose keyspace is rebuilt from, and then appended to, the
    /// log described by `config`
    pub fn with_aof(store: MemoryStore, config: &AofConfig) -> Result<Self, AofError> {
        let mut dispatcher = Self::with_store(store);
        let replayed = restore(&mut dispatcher.context, &dispatcher.registry, config)?;
        if replayed > 0 {
            info!("Replayed {} entries from AOF", replayed);
        }
        Ok(dispatcher)
    }

    /// Execute one command frame
    pub fn dispatch(&mut self, frame: &Frame) -> Frame {
        if let Some(name) = frame.command_name() {
            debug!("Dispatching command: {}", name);
        }
        let reply = self.registry.execute(&mut self.context, frame);
        if let Frame::Error(e) = &reply {
            if e.starts_with("ERR unknown command") {
                warn!("{}", e);
            }
        }
        reply
    }

    /// Drop expired keys; returns how many were removed
    ///
    /// The memory backend runs this on a timer. Pending timer deadlines are
    /// discarded since polling covers them.
    pub fn sweep(&mut self) -> usize {
        self.context.store.take_timer_changes();
        self.context.store.cleanup_expired()
    }

    pub fn stats(&self) -> StoreStats {
        self.context.stats()
    }

    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut CommandContext {
        &mut self.context
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    #[test]
    fn test_dispatch_set_get() {
        let mut dispatcher = Dispatcher::new();

        let reply = dispatcher.dispatch(&Frame::command("SET", ["mykey", "myvalue"]));
        assert_eq!(reply, Frame::ok());

        let reply = dispatcher.dispatch(&Frame::command("get", ["mykey"]));
        assert_eq!(reply, Frame::bulk("myvalue"));
    }

    #[test]
    fn test_dispatch_errors() {
        let mut dispatcher = Dispatcher::new();
        assert!(dispatcher.dispatch(&Frame::command("UNKNOWN", ["x"])).is_error());
        assert!(dispatcher.dispatch(&Frame::command("GET", Vec::<&'static str>::new())).is_error());
        assert!(dispatcher.dispatch(&Frame::Array(vec![])).is_error());
    }

    #[test]
    fn test_sweep_drops_expired_keys() {
        let clock = Arc::new(ManualClock::new(0));
        let mut dispatcher = Dispatcher::with_store(MemoryStore::with_clock(clock.clone()));
        dispatcher.dispatch(&Frame::command("SET", ["a", "1"]));
        dispatcher.dispatch(&Frame::command("SET", ["b", "1"]));
        dispatcher.dispatch(&Frame::command("PEXPIRE", ["a", "100"]));

        assert_eq!(dispatcher.sweep(), 0);
        clock.advance(100);
        assert_eq!(dispatcher.sweep(), 1);
        assert_eq!(dispatcher.stats().total_keys, 1);
    }
}
