use crate::commands::dispatcher::CommandDispatcher;
use crate::config::Config;
use crate::core::error::PilotError;

use console::style;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config as EditorConfig, Context, EditMode, Editor, Helper};
use std::borrow::Cow;

pub type LineEditor = Editor<PilotHelper, FileHistory>;

/// Completes slash commands and hints from history.
pub struct PilotHelper {
    commands: CommandDispatcher,
    history_hinter: HistoryHinter,
}

impl PilotHelper {
    pub fn new(commands: CommandDispatcher) -> Self {
        Self {
            commands,
            history_hinter: HistoryHinter {},
        }
    }
}

/// Command names starting with what follows the `/` in `line[..pos]`.
fn complete_command(names: &[String], line: &str, pos: usize) -> Option<Vec<Pair>> {
    let typed = line.get(..pos)?.strip_prefix('/')?;
    if typed.contains(char::is_whitespace) {
        return None;
    }
    let matches: Vec<Pair> = names
        .iter()
        .filter(|name| name.starts_with(typed))
        .map(|name| Pair {
            display: format!("/{}", name),
            replacement: name.clone(),
        })
        .collect();
    (!matches.is_empty()).then_some(matches)
}

impl Completer for PilotHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let names = self.commands.get_command_names();
        Ok(complete_command(&names, line, pos)
            .map(|matches| (1, matches))
            .unwrap_or((pos, Vec::new())))
    }
}

impl Hinter for PilotHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.history_hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for PilotHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(style(hint).dim().to_string())
    }
}

impl Validator for PilotHelper {}

impl Helper for PilotHelper {}

/// Creates a configured rustyline editor with the saved input history.
pub fn create_editor(commands: CommandDispatcher) -> Result<LineEditor, PilotError> {
    let config = EditorConfig::builder()
        .history_ignore_space(true)
        .auto_add_history(false)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut editor = Editor::with_config(config)
        .map_err(|e| PilotError::Input(format!("Failed to create line editor: {}", e)))?;
    editor.set_helper(Some(PilotHelper::new(commands)));

    if let Err(e) = editor.load_history(&Config::history_path()) {
        tracing::debug!(error = %e, "no input history loaded");
    }

    Ok(editor)
}

/// Reads one line. `None` means the user asked to leave (Ctrl-C / Ctrl-D).
pub fn read_input(editor: &mut LineEditor) -> Result<Option<String>, PilotError> {
    let prompt = style("> ").bold().cyan().to_string();
    match editor.readline(&prompt) {
        Ok(line) => {
            if !line.trim().is_empty() {
                editor.add_history_entry(line.as_str())?;
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub fn save_history(editor: &mut LineEditor) -> Result<(), PilotError> {
    let history_path = Config::history_path();
    if let Some(parent) = history_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    editor.save_history(&history_path)?;
    Ok(())
}
