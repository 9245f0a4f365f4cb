pub mod dispatcher;
pub mod handler;
pub mod registry;

use crate::config::Provider;
use crate::core::adapter::TransportMode;
use crate::core::controller::ChatController;
pub use dispatcher::create_command_registry;

/// Everything a slash command may look at during an interactive session.
pub struct ChatSession {
    pub controller: ChatController,
    pub provider: Provider,
    pub model: String,
    pub mode: TransportMode,
    pub should_continue: bool,
}

impl ChatSession {
    pub fn new(
        controller: ChatController,
        provider: Provider,
        model: impl Into<String>,
        mode: TransportMode,
    ) -> Self {
        Self {
            controller,
            provider,
            model: model.into(),
            mode,
            should_continue: true,
        }
    }
}
