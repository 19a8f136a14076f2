//! Error types for saykit.

use std::io;

use thiserror::Error;

/// Everything that can go wrong between a request and the engine's exit.
#[derive(Error, Debug)]
pub enum SayError {
    #[error("must provide {0} parameter")]
    MissingParameter(&'static str),

    #[error("{engine} cannot export to .{extension} files")]
    UnsupportedFormat {
        engine: &'static str,
        extension: String,
    },

    #[error("{engine} does not support {operation}")]
    Unsupported {
        engine: &'static str,
        operation: &'static str,
    },

    #[error("invalid voice name: {0:?}")]
    InvalidVoice(String),

    #[error("engine reported an error: {0}")]
    Engine(String),

    #[error("could not talk, had an error [code: {}] [signal: {}]", fmt_opt(.code), fmt_opt(.signal))]
    AbnormalExit {
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("no speech to kill")]
    NoActiveSpeech,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("speech task ended without reporting a result")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn fmt_opt(value: &Option<i32>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "null".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, SayError>;
