use super::ChatSession;
use crate::core::error::PilotError;
use crate::providers::Role;

use console::style;

pub trait CommandHandler: Send + Sync {
    fn execute(
        &self,
        session: &mut ChatSession,
        args: &[&str],
    ) -> Result<Option<String>, PilotError>;
    fn help(&self) -> &'static str;
}

pub struct QuitCommand;
pub struct HistoryCommand;
pub struct ModelCommand;

impl CommandHandler for QuitCommand {
    fn execute(
        &self,
        session: &mut ChatSession,
        _args: &[&str],
    ) -> Result<Option<String>, PilotError> {
        session.should_continue = false;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/quit - Exit the chat session"
    }
}

impl CommandHandler for HistoryCommand {
    fn execute(
        &self,
        session: &mut ChatSession,
        _args: &[&str],
    ) -> Result<Option<String>, PilotError> {
        let messages = session.controller.messages();
        if messages.is_empty() {
            return Ok(Some("No messages yet.".to_string()));
        }

        let lines: Vec<String> = messages
            .iter()
            .map(|m| {
                let label = match m.role {
                    Role::User => style("You").bold().cyan(),
                    Role::Assistant => style("Assistant").bold().blue(),
                    Role::System => style("System").dim(),
                };
                format!("{}: {}", label, m.content)
            })
            .collect();
        Ok(Some(lines.join("\n\n")))
    }

    fn help(&self) -> &'static str {
        "/history - Show the conversation so far"
    }
}

impl CommandHandler for ModelCommand {
    fn execute(
        &self,
        session: &mut ChatSession,
        args: &[&str],
    ) -> Result<Option<String>, PilotError> {
        if !args.is_empty() {
            return Err(PilotError::Input(
                "The model is fixed for a session; use --model or the config file".to_string(),
            ));
        }
        Ok(Some(format!(
            "Provider: {}\nModel: {}\nMode: {:?}",
            session.provider, session.model, session.mode
        )))
    }

    fn help(&self) -> &'static str {
        "/model - Show the active provider and model"
    }
}
