use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Backend to use, overriding the configured one (ollama or mock)
    #[arg(short, long)]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the assistant backend server
    Serve {
        /// Bind address, overriding the configured one
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overriding the configured one
        #[arg(long)]
        port: Option<u16>,

        /// Grant a tool permission for this run (repeatable)
        #[arg(long = "allow-tool")]
        allow_tools: Vec<String>,
    },
    /// Run a single chat turn and print the reply
    Chat {
        /// The prompt to send
        message: String,

        /// Optional system prompt
        #[arg(long)]
        system: Option<String>,

        /// Conversation to continue (a new one is created if omitted)
        #[arg(long)]
        conversation: Option<String>,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    Set { key: String, value: String },
}
