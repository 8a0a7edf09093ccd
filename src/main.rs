use std::path::Path;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use recipe_chat::cli::{
    self,
    args::{Cli, Commands, ConfigAction, HistoryAction},
};
use recipe_chat::config::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let explicit = cli.runtime.config.as_deref().map(Path::new);
    let mut settings = Settings::load_with(None, explicit)?;
    let runtime = &cli.runtime;

    match &cli.command {
        Some(Commands::Interactive) => {
            cli::commands::handle_interactive(&settings, runtime).await?
        }
        Some(Commands::Chat { prompt }) => {
            let prompt = if !prompt.is_empty() {
                Some(prompt.join(" "))
            } else {
                None
            };
            cli::commands::handle_chat(&settings, prompt, runtime, &cli.io).await?
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { force, scope } => {
                cli::commands::handle_config_init(*force, scope.as_deref(), runtime).await?
            }
            ConfigAction::List => cli::commands::handle_config_list(&settings).await?,
            ConfigAction::Set { key, value } => {
                cli::commands::handle_config_set(&mut settings, key, value, runtime).await?
            }
        },
        Some(Commands::History { action }) => match action {
            HistoryAction::Show => cli::commands::handle_history_show(&settings, runtime).await?,
            HistoryAction::Clear => cli::commands::handle_history_clear(&settings, runtime).await?,
            HistoryAction::Export { path } => {
                cli::commands::handle_history_export(&settings, runtime, path).await?
            }
        },
        None => {
            if !cli.prompt.is_empty() || cli.io.input_file.is_some() {
                let prompt = (!cli.prompt.is_empty()).then(|| cli.prompt.join(" "));
                cli::commands::handle_chat(&settings, prompt, runtime, &cli.io).await?
            } else {
                // No command and no prompt: show help
                Cli::command().print_help()?;
                println!();
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
