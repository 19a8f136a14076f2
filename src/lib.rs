//! saykit: one speak / export / stop / pause / resume interface over the
//! operating system's text-to-speech command-line tools.
//!
//! - `platform`: per-engine command builders (`say`, festival, espeak-ng, SAPI)
//! - `speaker`: the session controller that runs one engine process at a time
//! - `completion`: exactly-once delivery of each request's outcome
//! - `config`: YAML configuration

pub mod command;
pub mod completion;
pub mod config;
pub mod error;
pub mod platform;
pub mod speaker;

pub use command::{CommandSpec, SpawnOptions, Utterance};
pub use completion::Completion;
pub use config::Config;
pub use error::{Result, SayError};
pub use platform::{Engine, Platform};
pub use speaker::{ActiveSession, Speaker};
