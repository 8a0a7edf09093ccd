use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "recipe-chat", version, about = "Chat with the Recipe Finder assistant", propagate_version = true)]
pub struct Cli {
    /// One-shot message
    pub prompt: Vec<String>,

    #[command(flatten)]
    pub io: IoArgs,

    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Default)]
pub struct IoArgs {
    /// Read the message from a file
    #[arg(short = 'f', long = "file", global = true)]
    pub input_file: Option<String>,

    /// Write the reply to a file
    #[arg(short = 'o', long = "output", global = true)]
    pub output_file: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct RuntimeArgs {
    /// Override the server base URL for this run
    #[arg(long = "server", global = true)]
    pub server: Option<String>,

    /// Neither replay nor persist history for this run
    #[arg(long = "no-history", global = true)]
    pub no_history: bool,

    /// Explicit config file path
    #[arg(long = "config", global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the chat panel: replay history, then prompt until /close
    Interactive,
    /// Send a single message
    Chat {
        prompt: Vec<String>,
    },

    /// Config management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Stored conversation
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Initialize default config file (~/.recipe_chat/config.toml)
    Init {
        /// Overwrite if exists
        #[arg(long)]
        force: bool,
        /// Scope to create config: user or project (default: user)
        #[arg(long, value_parser = ["user", "project"])]
        scope: Option<String>,
    },
    Set { key: String, value: String },
    List,
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// Print the stored conversation
    Show,
    /// Delete the stored conversation
    Clear,
    /// Write the stored conversation to a file (JSON for *.json, text otherwise)
    Export { path: String },
}
