//! Windows speech through PowerShell and `System.Speech`.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use super::{check_voice, Platform};
use crate::command::{extension_of, CommandSpec, Utterance};
use crate::error::{Result, SayError};
use crate::speaker::ActiveSession;

/// Stdin carries UTF-8; without the encoding line PowerShell decodes it with
/// the console code page.
const SYNTH_PRELUDE: &str = "[Console]::InputEncoding = [Text.Encoding]::UTF8;\
Add-Type -AssemblyName System.Speech;\
$speak = New-Object System.Speech.Synthesis.SpeechSynthesizer;";

pub struct WindowsSapi {
    program: String,
}

impl WindowsSapi {
    pub const PROGRAM: &'static str = "powershell";

    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn script(&self, utterance: &Utterance, filename: Option<&Path>) -> Result<String> {
        let mut script = String::from(SYNTH_PRELUDE);
        if let Some(voice) = utterance.voice_name() {
            let voice = check_voice(voice, true)?;
            script.push_str(&format!("$speak.SelectVoice('{voice}');"));
        }
        if let Some(speed) = utterance.requested_speed() {
            script.push_str(&format!("$speak.Rate = {};", self.convert_speed(speed)));
        }
        if let Some(path) = filename {
            let path = path.to_string_lossy().replace('\'', "''");
            script.push_str(&format!("$speak.SetOutputToWaveFile('{path}');"));
        }
        script.push_str("$speak.Speak([Console]::In.ReadToEnd())");
        Ok(script)
    }

    fn powershell(&self, script: String) -> CommandSpec {
        CommandSpec::new(&self.program).args(["-NoProfile", "-NonInteractive", "-Command"]).arg(script)
    }
}

impl Platform for WindowsSapi {
    fn name(&self) -> &'static str {
        "sapi"
    }

    fn base_speed(&self) -> f64 {
        0.0
    }

    /// SAPI rates run from -10 to 10 on a log scale around 0.
    fn convert_speed(&self, speed: f64) -> i64 {
        let rate = (9.0686 * speed.ln() - 0.1806).round();
        (rate as i64).clamp(-10, 10)
    }

    fn build_speak_command(&self, utterance: &Utterance) -> Result<CommandSpec> {
        let script = self.script(utterance, None)?;
        Ok(self.powershell(script).stdin(utterance.text.as_str()))
    }

    fn build_export_command(&self, utterance: &Utterance, filename: &Path) -> Result<CommandSpec> {
        let extension = extension_of(filename);
        if extension != "wav" {
            return Err(SayError::UnsupportedFormat {
                engine: self.name(),
                extension,
            });
        }
        let script = self.script(utterance, Some(filename))?;
        Ok(self.powershell(script).stdin(utterance.text.as_str()))
    }

    /// Kill the whole tree; taskkill on a pid that has already exited
    /// just fails quietly.
    fn run_stop_command(&self, session: &ActiveSession) -> Result<()> {
        debug!("taskkill /pid {} /T /F", session.pid);
        let spawned = Command::new("taskkill")
            .args(["/pid", &session.pid.to_string(), "/T", "/F"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(e) = spawned {
            warn!("Failed to run taskkill: {e}");
            return Err(SayError::Spawn {
                program: "taskkill".into(),
                source: e,
            });
        }
        Ok(())
    }

    fn run_pause_command(&self, _session: &ActiveSession) -> Result<()> {
        Err(SayError::Unsupported {
            engine: self.name(),
            operation: "pause",
        })
    }

    fn run_resume_command(&self, _session: &ActiveSession) -> Result<()> {
        Err(SayError::Unsupported {
            engine: self.name(),
            operation: "resume",
        })
    }

    fn build_voices_command(&self) -> Result<CommandSpec> {
        let script = format!(
            "{SYNTH_PRELUDE}$speak.GetInstalledVoices() | % {{$_.VoiceInfo.Name}}"
        );
        Ok(self.powershell(script))
    }

    fn parse_voices(&self, stdout: &str) -> Vec<String> {
        stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sapi() -> WindowsSapi {
        WindowsSapi::new(WindowsSapi::PROGRAM)
    }

    #[test]
    fn rate_is_logarithmic_and_clamped() {
        assert_eq!(sapi().convert_speed(1.0), 0);
        assert_eq!(sapi().convert_speed(2.0), 6);
        assert_eq!(sapi().convert_speed(0.5), -6);
        assert_eq!(sapi().convert_speed(100.0), 10);
        assert_eq!(sapi().convert_speed(0.001), -10);
    }

    #[test]
    fn speak_reads_text_from_stdin() {
        let spec = sapi()
            .build_speak_command(&Utterance::new("it's fine").voice("Microsoft Zira Desktop"))
            .unwrap();
        assert_eq!(spec.program, "powershell");
        assert_eq!(&spec.args[..3], ["-NoProfile", "-NonInteractive", "-Command"]);
        let script = &spec.args[3];
        assert!(script.contains("$speak.SelectVoice('Microsoft Zira Desktop');"));
        assert!(script.ends_with("$speak.Speak([Console]::In.ReadToEnd())"));
        assert!(!script.contains("it's fine"));
        assert_eq!(spec.stdin.as_deref(), Some("it's fine"));
    }

    #[test]
    fn stdin_is_decoded_as_utf8() {
        let spec = sapi()
            .build_speak_command(&Utterance::new("naïve café"))
            .unwrap();
        let script = &spec.args[3];
        assert!(script.starts_with("[Console]::InputEncoding = [Text.Encoding]::UTF8;"));
        let decode = script.find("InputEncoding").unwrap();
        let read = script.find("[Console]::In.ReadToEnd()").unwrap();
        assert!(decode < read);
        assert_eq!(spec.stdin.as_deref(), Some("naïve café"));

        let export = sapi()
            .build_export_command(&Utterance::new("naïve"), Path::new("out.wav"))
            .unwrap();
        assert!(export.args[3].starts_with("[Console]::InputEncoding = [Text.Encoding]::UTF8;"));
    }

    #[test]
    fn export_escapes_quotes_in_path() {
        let spec = sapi()
            .build_export_command(&Utterance::new("hi").speed(2.0), Path::new("C:\\o'brien.wav"))
            .unwrap();
        let script = &spec.args[3];
        assert!(script.contains("$speak.Rate = 6;"));
        assert!(script.contains("SetOutputToWaveFile('C:\\o''brien.wav')"));
    }

    #[test]
    fn export_rejects_non_wav() {
        assert!(sapi()
            .build_export_command(&Utterance::new("hi"), Path::new("out.mp3"))
            .is_err());
    }

    #[test]
    fn pause_is_unsupported() {
        let session = ActiveSession {
            id: 1,
            pid: 1234,
            process_group: false,
        };
        assert!(matches!(
            sapi().run_pause_command(&session),
            Err(SayError::Unsupported { operation: "pause", .. })
        ));
    }

    #[test]
    fn voices_one_per_line() {
        let out = "Microsoft David Desktop\r\nMicrosoft Zira Desktop\r\n\r\n";
        assert_eq!(
            sapi().parse_voices(out),
            ["Microsoft David Desktop", "Microsoft Zira Desktop"]
        );
    }
}
