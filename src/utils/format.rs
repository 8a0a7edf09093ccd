use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::session::history::{MessageRecord, Role};
use crate::session::render::Renderer;

pub fn success(msg: &str) -> String { style(msg).green().to_string() }
pub fn warn(msg: &str) -> String { style(msg).yellow().to_string() }
pub fn error(msg: &str) -> String { style(msg).red().to_string() }

pub fn speaker(role: Role) -> String {
    match role {
        Role::User => style("You").cyan().bold().to_string(),
        Role::Bot => style("Bot").magenta().bold().to_string(),
    }
}

pub fn format_record(record: &MessageRecord) -> String {
    format!("{}: {}", speaker(record.role), record.text)
}

/// Plain `role: text` lines, used for transcript export.
pub fn plain_transcript(history: &[MessageRecord]) -> String {
    let mut out = String::new();
    for record in history {
        out.push_str(record.role.as_str());
        out.push_str(": ");
        out.push_str(&record.text);
        out.push('\n');
    }
    out
}

/// Prints turns to stdout; the typing placeholder is a spinner that is
/// cleared before the reply is printed.
#[derive(Default)]
pub struct TerminalRenderer {
    typing: Option<ProgressBar>,
}

impl TerminalRenderer {
    pub fn new() -> Self { Self::default() }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, record: &MessageRecord) {
        println!("{}", format_record(record));
    }

    fn show_typing(&mut self) {
        let pb = ProgressBar::new_spinner().with_message("Bot is typing...");
        if let Ok(spinner) = ProgressStyle::with_template("{spinner} {msg}") {
            pb.set_style(spinner);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        self.typing = Some(pb);
    }

    fn hide_typing(&mut self) {
        if let Some(pb) = self.typing.take() {
            pb.finish_and_clear();
        }
    }
}
