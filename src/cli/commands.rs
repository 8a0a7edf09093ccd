use std::io::ErrorKind;
use std::path::Path;

use anyhow::{anyhow, Result};
use console::style;
use tracing::{info, warn};

use crate::api::client::HttpClient;
use crate::cli::args::{IoArgs, RuntimeArgs};
use crate::config::settings::Settings;
use crate::session::chat::ChatSession;
use crate::session::history::MessageRecord;
use crate::session::storage::FileStorage;
use crate::session::store::HistoryStore;
use crate::utils::format::{self, TerminalRenderer};

const CLOSE_COMMANDS: [&str; 3] = ["/close", "/quit", "/exit"];

fn server_url<'a>(settings: &'a Settings, runtime: &'a RuntimeArgs) -> &'a str {
    runtime.server.as_deref().unwrap_or(&settings.server_url)
}

fn open_store(settings: &Settings, runtime: &RuntimeArgs) -> Result<HistoryStore<FileStorage>> {
    let dir = settings.resolve_storage_dir()?;
    let storage = FileStorage::for_origin(&dir, server_url(settings, runtime))
        .with_quota(settings.storage_quota());
    info!(path = %storage.path().display(), "using chat history storage");
    Ok(HistoryStore::new(storage))
}

fn build_session(settings: &Settings, runtime: &RuntimeArgs) -> Result<ChatSession<FileStorage, TerminalRenderer>> {
    let http = HttpClient::new(settings.request_timeout())?;
    let history = if settings.history_enabled && !runtime.no_history {
        Some(open_store(settings, runtime)?)
    } else {
        None
    };
    Ok(ChatSession::new(http.client, server_url(settings, runtime), history, TerminalRenderer::new()))
}

pub async fn handle_interactive(settings: &Settings, runtime: &RuntimeArgs) -> Result<()> {
    use dialoguer::Input;

    let mut session = build_session(settings, runtime)?;
    println!("{}", style("Recipe Finder chat. Type /close to exit.").cyan());
    let replayed = session.open();
    if replayed > 0 {
        println!("{}", style(format!("({} earlier messages)", replayed)).dim());
    }

    loop {
        let line: String = match Input::<String>::new().with_prompt("You").allow_empty(true).interact_text() {
            Ok(line) => line,
            Err(dialoguer::Error::IO(e)) if closes_panel(e.kind()) => break,
            Err(e) => {
                warn!(error = %e, "chat prompt failed");
                return Err(e.into());
            }
        };
        let line = line.trim();
        if CLOSE_COMMANDS.contains(&line) { break; }
        if line.is_empty() { continue; }
        session.send(line).await;
    }
    Ok(())
}

pub async fn handle_chat(settings: &Settings, prompt: Option<String>, runtime: &RuntimeArgs, io: &IoArgs) -> Result<()> {
    // Prefer file input if provided
    let prompt = match (&io.input_file, &prompt) {
        (Some(path), _) => crate::utils::io::read_to_string(path)?.trim().to_string(),
        (None, Some(p)) if !p.trim().is_empty() => p.to_string(),
        _ => return Err(anyhow!("Message is empty. Provide text, --file, or use interactive mode.")),
    };
    if prompt.is_empty() {
        return Err(anyhow!("Message file is empty."));
    }

    let mut session = build_session(settings, runtime)?;
    let reply = session.send(&prompt).await;

    if let (Some(out), Some(reply)) = (&io.output_file, &reply) {
        crate::utils::io::write_string(out, &reply.text)?;
    }
    Ok(())
}

pub async fn handle_history_show(settings: &Settings, runtime: &RuntimeArgs) -> Result<()> {
    let store = open_store(settings, runtime)?;
    let mut renderer = TerminalRenderer::new();
    if store.replay(&mut renderer) == 0 {
        println!("{}", format::warn("No stored conversation."));
    }
    Ok(())
}

pub async fn handle_history_clear(settings: &Settings, runtime: &RuntimeArgs) -> Result<()> {
    let mut store = open_store(settings, runtime)?;
    store.clear();
    println!("{}", format::success("Conversation cleared."));
    Ok(())
}

pub async fn handle_history_export(settings: &Settings, runtime: &RuntimeArgs, path: &str) -> Result<()> {
    let store = open_store(settings, runtime)?;
    let history = store.load();
    export_history(&history, path)?;
    println!("{}", format::success(&format!("Exported {} messages to {}", history.len(), path)));
    Ok(())
}

/// Ctrl+C or a closed stdin.
fn closes_panel(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::Interrupted | ErrorKind::UnexpectedEof)
}

/// JSON for `*.json` paths, `role: text` lines otherwise.
pub fn export_history(history: &[MessageRecord], path: &str) -> Result<()> {
    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let content = if is_json {
        serde_json::to_string_pretty(history)?
    } else {
        format::plain_transcript(history)
    };
    crate::utils::io::write_string(path, &content)
}

pub async fn handle_config_list(settings: &Settings) -> Result<()> {
    println!("Server URL: {}", settings.server_url);
    println!("History enabled: {}", settings.history_enabled);
    match settings.resolve_storage_dir() {
        Ok(dir) => println!("Storage dir: {}", dir.display()),
        Err(e) => println!("Storage dir: {}", format::error(&e.to_string())),
    }
    match settings.storage_quota() {
        Some(q) => println!("Storage quota: {} bytes", q),
        None => println!("Storage quota: unlimited"),
    }
    match settings.request_timeout_secs {
        Some(t) => println!("Request timeout: {}s", t),
        None => println!("Request timeout: none"),
    }
    Ok(())
}

pub async fn handle_config_set(settings: &mut Settings, key: &str, value: &str, runtime: &RuntimeArgs) -> Result<()> {
    if !settings.set_value(key, value)? {
        println!("{}", format::warn(&format!("Unknown config key: {}", key)));
        return Ok(());
    }
    let explicit = runtime.config.as_deref().map(Path::new);
    settings.save_with(None, explicit)?;
    Ok(())
}

pub async fn handle_config_init(force: bool, scope: Option<&str>, runtime: &RuntimeArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let project_root = match scope {
        Some("project") => Some(cwd.as_path()),
        _ => None,
    };
    let explicit = runtime.config.as_deref().map(Path::new);
    let path = Settings::init_scoped(force, project_root, explicit)?;
    println!("{}", format::success(&format!("Wrote default config to {}", path.display())));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::history::Role;

    fn sample() -> Vec<MessageRecord> {
        vec![
            MessageRecord { role: Role::User, text: "vegan lasagne?".into(), timestamp: 10 },
            MessageRecord { role: Role::Bot, text: "Use cashew ricotta.".into(), timestamp: 20 },
        ]
    }

    #[test]
    fn test_export_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.JSON");
        let path = path.to_str().unwrap();
        export_history(&sample(), path).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        let parsed: Vec<MessageRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_export_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        let path = path.to_str().unwrap();
        export_history(&sample(), path).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "user: vegan lasagne?\nbot: Use cashew ricotta.\n");
    }

    #[test]
    fn test_only_interrupts_close_panel() {
        assert!(closes_panel(ErrorKind::Interrupted));
        assert!(closes_panel(ErrorKind::UnexpectedEof));
        assert!(!closes_panel(ErrorKind::PermissionDenied));
        assert!(!closes_panel(ErrorKind::Other));
    }
}
