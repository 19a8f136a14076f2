//! macOS `say`.

use std::path::Path;

use super::{signal_session, Control, Platform};
use crate::command::{extension_of, CommandSpec, Utterance};
use crate::error::{Result, SayError};
use crate::speaker::ActiveSession;

/// Extensions `say -o` can write; the value is any extra data-format flag.
const EXPORT_FORMATS: &[(&str, Option<&str>)] = &[
    ("aiff", None),
    ("aif", None),
    ("aifc", None),
    ("caf", None),
    ("m4a", Some("--data-format=aac")),
    ("wav", Some("--data-format=LEI16@22050")),
];

pub struct MacSay {
    program: String,
}

impl MacSay {
    pub const PROGRAM: &'static str = "say";

    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn base_command(&self, utterance: &Utterance) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.program);
        if let Some(voice) = utterance.voice_name() {
            spec = spec.arg("-v").arg(voice);
        }
        if let Some(speed) = utterance.requested_speed() {
            spec = spec.arg("-r").arg(self.convert_speed(speed).to_string());
        }
        // With no message argument, say reads the text from stdin.
        spec.stdin(utterance.text.as_str())
    }
}

impl Platform for MacSay {
    fn name(&self) -> &'static str {
        "say"
    }

    fn base_speed(&self) -> f64 {
        175.0
    }

    fn build_speak_command(&self, utterance: &Utterance) -> Result<CommandSpec> {
        Ok(self.base_command(utterance))
    }

    fn build_export_command(&self, utterance: &Utterance, filename: &Path) -> Result<CommandSpec> {
        let extension = extension_of(filename);
        let Some((_, data_format)) = EXPORT_FORMATS.iter().find(|(ext, _)| *ext == extension)
        else {
            return Err(SayError::UnsupportedFormat {
                engine: self.name(),
                extension,
            });
        };

        let mut spec = self
            .base_command(utterance)
            .arg("-o")
            .arg(filename.to_string_lossy());
        if let Some(flag) = data_format {
            spec = spec.arg(*flag);
        }
        Ok(spec)
    }

    fn run_stop_command(&self, session: &ActiveSession) -> Result<()> {
        signal_session(session, Control::Stop)
    }

    fn run_pause_command(&self, session: &ActiveSession) -> Result<()> {
        signal_session(session, Control::Pause)
    }

    fn run_resume_command(&self, session: &ActiveSession) -> Result<()> {
        signal_session(session, Control::Resume)
    }

    fn build_voices_command(&self) -> Result<CommandSpec> {
        Ok(CommandSpec::new(&self.program).args(["-v", "?"]))
    }

    /// Lines look like `Bad News            en_US    # The light you see...`.
    fn parse_voices(&self, stdout: &str) -> Vec<String> {
        stdout
            .lines()
            .filter_map(|line| {
                let described = line.split('#').next().unwrap_or("").trim();
                let (name, _locale) = described.rsplit_once(char::is_whitespace)?;
                let name = name.trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn say() -> MacSay {
        MacSay::new(MacSay::PROGRAM)
    }

    #[test]
    fn speak_pipes_text_with_voice_and_rate() {
        let spec = say()
            .build_speak_command(&Utterance::new("hello world").voice("Alex").speed(0.5))
            .unwrap();
        assert_eq!(spec.program, "say");
        assert_eq!(spec.args, ["-v", "Alex", "-r", "88"]);
        assert_eq!(spec.stdin.as_deref(), Some("hello world"));
    }

    #[test]
    fn speak_without_options_uses_defaults() {
        let spec = say().build_speak_command(&Utterance::new("hi")).unwrap();
        assert!(spec.args.is_empty());
        assert!(!spec.options.process_group);
    }

    #[test]
    fn export_adds_output_and_format() {
        let spec = say()
            .build_export_command(&Utterance::new("hi"), Path::new("/tmp/out.wav"))
            .unwrap();
        assert_eq!(spec.args, ["-o", "/tmp/out.wav", "--data-format=LEI16@22050"]);

        let spec = say()
            .build_export_command(&Utterance::new("hi"), Path::new("out.AIFF"))
            .unwrap();
        assert_eq!(spec.args, ["-o", "out.AIFF"]);
    }

    #[test]
    fn export_rejects_unknown_extension() {
        let err = say()
            .build_export_command(&Utterance::new("hello"), Path::new("out.unsupportedext"))
            .unwrap_err();
        match err {
            SayError::UnsupportedFormat { engine, extension } => {
                assert_eq!(engine, "say");
                assert_eq!(extension, "unsupportedext");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn voices_keep_multi_word_names() {
        let out = "Alex                en_US    # Most people recognize me by my voice.\n\
                   Bad News            en_US    # The light you see at the end of the tunnel.\n\
                   \n\
                   Thomas              fr_FR    # Bonjour\n";
        assert_eq!(say().parse_voices(out), ["Alex", "Bad News", "Thomas"]);
    }
}
