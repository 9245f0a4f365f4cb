use crate::config::Provider;
use console::{Term, style};

/// Replies usually arrive as markdown (headings, lists, emphasis).
fn looks_like_markdown(text: &str) -> bool {
    text.contains("```")
        || text.contains('`')
        || text.contains("**")
        || text.lines().any(|line| {
            let line = line.trim_start();
            line.starts_with('#') || line.starts_with("- ") || line.starts_with("* ")
        })
}

fn terminal_width() -> usize {
    let width = Term::stdout().size().1 as usize;
    width.clamp(40, 120)
}

/// Render an assistant reply.
pub fn display_response(response: &str) {
    println!("\n{}", style("🦷 ASSISTANT").bold().blue());
    if looks_like_markdown(response) {
        let skin = termimad::MadSkin::default();
        let text = skin.text(response, Some(terminal_width()));
        println!("{}", text);
    } else {
        println!("{}", response);
    }
    println!("{}", style("─".repeat(terminal_width())).dim());
}

/// Transient banner for a failed turn.
pub fn display_error(message: &str) {
    eprintln!("\n{} {}", style("⚠").bold().red(), style(message).red());
}

pub fn display_notice(message: &str) {
    println!("{}", style(message).dim());
}

pub fn display_thinking() {
    let term = Term::stdout();
    if let Err(e) = term.write_line(&style("Thinking...").dim().italic().to_string()) {
        tracing::debug!(error = %e, "could not draw thinking indicator");
    }
}

pub fn clear_thinking() {
    if let Err(e) = Term::stdout().clear_last_lines(1) {
        tracing::debug!(error = %e, "could not clear thinking indicator");
    }
}

pub fn display_welcome(provider: Provider, model: &str) {
    println!(
        "{} {}",
        style("Dental Pilot").bold().blue(),
        style(format!("({} · {})", provider, model)).dim()
    );
    println!(
        "{}",
        style("Clinical reference answers for dental professionals. Not a substitute for clinical judgment.")
            .dim()
    );
    println!(
        "Type '/help' for available commands. Press Ctrl+D or type /quit to exit.\n"
    );
}
