use crate::commands::handler::CommandHandler;
use crate::core::error::PilotError;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct CommandRegistry {
    handlers: BTreeMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    pub fn register<C: CommandHandler + 'static>(&mut self, name: &str, command: C) {
        self.handlers.insert(name.to_string(), Arc::new(command));
    }

    pub fn execute(
        &self,
        name: &str,
        args: &[&str],
        session: &mut super::ChatSession,
    ) -> Result<Option<String>, PilotError> {
        if name == "help" {
            return Ok(Some(self.help_text()));
        }
        self.handlers
            .get(name)
            .ok_or_else(|| PilotError::Input(format!("Unknown command: /{}", name)))
            .and_then(|handler| handler.execute(session, args))
    }

    pub fn get_command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.push("help".to_string());
        names.sort();
        names
    }

    pub fn help_text(&self) -> String {
        let mut lines = vec![
            console::style("Available Commands")
                .bold()
                .underlined()
                .to_string(),
            "/help - Show available commands".to_string(),
        ];
        lines.extend(self.handlers.values().map(|h| h.help().to_string()));
        lines.join("\n")
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
