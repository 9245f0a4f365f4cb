use super::{
    ChatSession,
    handler::{HistoryCommand, ModelCommand, QuitCommand},
    registry::CommandRegistry,
};
use crate::core::error::PilotError;
use std::sync::Arc;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    /// Run a `/command args...` line. Returns `None` if `line` is not a
    /// slash command at all.
    pub fn dispatch(
        &self,
        line: &str,
        session: &mut ChatSession,
    ) -> Option<Result<Option<String>, PilotError>> {
        let rest = line.trim().strip_prefix('/')?;
        let mut parts = rest.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        Some(self.registry.execute(command, &args, session))
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }
}

pub fn create_command_registry() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("quit", QuitCommand);
    registry.register("history", HistoryCommand);
    registry.register("model", ModelCommand);

    CommandDispatcher::new(Arc::new(registry))
}
