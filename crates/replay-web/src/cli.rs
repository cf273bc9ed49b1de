use crate::client::ClientMode;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadMode {
    /// Send a body reader that was already read to the end.
    Exhausted,
    /// Send one body under the headers of another.
    Swapped,
}

/// Serves `/upload` behind a request body replay checker, or sends traffic to one.
#[derive(Parser, Debug)]
#[command(name = "replay-web", version)]
pub struct Args {
    /// Port to listen on, or to send to.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[arg(long, default_value = "localhost")]
    pub host: String,
    /// Send one well-formed upload and exit.
    #[arg(long, conflicts_with = "bad_client")]
    pub client: bool,
    /// Send one corrupted upload and exit.
    #[arg(long)]
    pub bad_client: bool,
    #[arg(long, value_enum, default_value_t = BadMode::Exhausted)]
    pub bad_mode: BadMode,
    /// File uploaded by the clients.
    #[arg(long, default_value = "dummy.png")]
    pub file: PathBuf,
    /// Comma separated document types sent with the upload.
    #[arg(long, value_delimiter = ',')]
    pub types: Vec<String>,
    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client(ClientMode),
}

impl Args {
    pub fn role(&self) -> Role {
        match (self.client, self.bad_client, self.bad_mode) {
            (true, _, _) => Role::Client(ClientMode::Normal),
            (false, true, BadMode::Exhausted) => Role::Client(ClientMode::Exhausted),
            (false, true, BadMode::Swapped) => Role::Client(ClientMode::Swapped),
            (false, false, _) => Role::Server,
        }
    }

    /// The upload url clients send to.
    pub fn target(&self) -> String {
        format!("http://{}:{}/upload", self.host, self.port)
    }

    pub fn address(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}
