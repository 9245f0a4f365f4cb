use crate::cli::Args;
use crate::commands::{ChatSession, create_command_registry};
use crate::config::{Config, Provider};
use crate::core::adapter::{ResponseAdapter, TransportMode};
use crate::core::controller::{ChatController, SubmitOutcome};
use crate::core::error::PilotError;
use crate::core::persona::system_instruction;
use crate::display;
use crate::input;
use crate::providers::factory::ProviderFactory;
use is_terminal::IsTerminal;
use std::io::{self, Read};

pub struct Application {
    pub args: Args,
    pub config: Config,
}

impl Application {
    pub fn new(args: Args, config: Config) -> Self {
        Self { args, config }
    }

    /// Wire provider strategy, adapter and controller together from the CLI
    /// flags and the config file. Flags win.
    pub fn build_session(&self) -> Result<ChatSession, PilotError> {
        let provider = match self.args.provider.as_deref() {
            Some(name) => name.parse::<Provider>()?,
            None => self.config.provider(),
        };

        let mut settings = self.config.settings_for(provider);
        if let Some(model) = &self.args.model {
            settings.model = Some(model.clone());
        }
        let model = settings.model_or_default(provider);

        let mode = if self.args.no_stream || !self.config.stream {
            TransportMode::Batch
        } else {
            TransportMode::Stream
        };

        let backend = ProviderFactory::new().create(provider).ok_or_else(|| {
            PilotError::Config(format!("No client available for provider {}", provider))
        })?;
        let instruction =
            system_instruction(self.config.persona, self.config.system_prompt.as_deref());
        let adapter = ResponseAdapter::new(backend, settings, instruction, mode);

        tracing::debug!(provider = %provider, model = %model, mode = ?mode, "session configured");
        Ok(ChatSession::new(
            ChatController::new(Box::new(adapter)),
            provider,
            model,
            mode,
        ))
    }

    pub async fn run(&mut self) -> Result<(), PilotError> {
        let context = if !io::stdin().is_terminal() {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| PilotError::Input(format!("Failed to read from stdin: {}", e)))?;
            Some(buffer)
        } else {
            None
        };

        let session = self.build_session()?;
        match compose_query(self.args.query.as_deref(), context) {
            Some(query) => Self::handle_single_query(&session, &query).await,
            None => Self::handle_chat_loop(session).await,
        }
    }

    async fn handle_single_query(session: &ChatSession, query: &str) -> Result<(), PilotError> {
        match session.controller.submit(query).await {
            SubmitOutcome::Answered(reply) => {
                display::display_response(&reply);
                Ok(())
            }
            SubmitOutcome::Failed(err) => Err(err.into()),
            SubmitOutcome::Ignored => Err(PilotError::Input("No query provided".to_string())),
        }
    }

    async fn handle_chat_loop(mut session: ChatSession) -> Result<(), PilotError> {
        let dispatcher = create_command_registry();
        let mut editor = input::create_editor(dispatcher.clone())?;

        display::display_welcome(session.provider, &session.model);

        while session.should_continue {
            let Some(line) = input::read_input(&mut editor)? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(result) = dispatcher.dispatch(line, &mut session) {
                match result {
                    Ok(Some(output)) => println!("{}", output),
                    Ok(None) => {}
                    Err(e) => display::display_error(&e.to_string()),
                }
                continue;
            }

            display::display_thinking();
            let outcome = session.controller.submit(line).await;
            display::clear_thinking();

            match outcome {
                SubmitOutcome::Answered(reply) => display::display_response(&reply),
                SubmitOutcome::Failed(err) => {
                    let message = session
                        .controller
                        .take_error()
                        .unwrap_or_else(|| err.user_message());
                    display::display_error(&message);
                }
                SubmitOutcome::Ignored => {}
            }
        }

        display::display_notice("Goodbye.");
        input::save_history(&mut editor)
    }
}

/// Combine the query argument with piped stdin. Piped text is wrapped in
/// `<context>` tags so the model can tell it apart from the question.
pub fn compose_query(query: Option<&str>, context: Option<String>) -> Option<String> {
    let query = query.map(str::trim).filter(|q| !q.is_empty());
    let context = context.filter(|c| !c.trim().is_empty());
    match (query, context) {
        (Some(q), Some(ctx)) => Some(format!("<context>{}</context>\n\n{}", ctx.trim(), q)),
        (None, Some(ctx)) => Some(ctx.trim().to_string()),
        (Some(q), None) => Some(q.to_string()),
        (None, None) => None,
    }
}
