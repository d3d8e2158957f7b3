use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to launch {program} for {target}")]
    Launch {
        program: String,
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read config file {path:?}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("invalid argument `{argument}` for command `{command}`")]
    InvalidArgument { command: String, argument: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
