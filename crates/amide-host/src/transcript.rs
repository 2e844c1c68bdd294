//! Command transcript for replay
//!
//! Records every command sent to the host so a run can be replayed
//! interactively in the host application.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::HostResult;

/// Transcript file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptFormat {
    /// Host command script (.cxc)
    #[default]
    Cxc,
    /// Python script (.py)
    Python,
}

impl TranscriptFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") => TranscriptFormat::Python,
            _ => TranscriptFormat::Cxc,
        }
    }
}

/// Writer appending host commands to a file
#[derive(Debug)]
pub struct CommandTranscript {
    writer: BufWriter<File>,
    format: TranscriptFormat,
}

impl CommandTranscript {
    /// Create (truncate) a transcript file
    ///
    /// The format is chosen from the extension: `.py` gives a Python
    /// script, anything else a plain command script.
    pub fn create(path: &Path) -> HostResult<Self> {
        let format = TranscriptFormat::from_extension(path);
        let mut writer = BufWriter::new(File::create(path)?);

        match format {
            TranscriptFormat::Cxc => {
                writeln!(writer, "# amide host transcript")?;
            }
            TranscriptFormat::Python => {
                writeln!(writer, "# amide host transcript")?;
                writeln!(writer, "from chimerax.core.commands import run")?;
                writeln!(writer)?;
            }
        }

        log::info!("Writing host transcript to {:?} ({:?} format)", path, format);
        Ok(Self { writer, format })
    }

    /// Format in use
    pub fn format(&self) -> TranscriptFormat {
        self.format
    }

    /// Append one command
    ///
    /// Write failures are logged and otherwise ignored.
    pub fn record(&mut self, command: &str) {
        let result = match self.format {
            TranscriptFormat::Cxc => writeln!(self.writer, "{}", command),
            TranscriptFormat::Python => writeln!(
                self.writer,
                "run(session, \"{}\")",
                escape_python_string(command)
            ),
        };

        if let Err(e) = result {
            log::warn!("Failed to write to transcript: {}", e);
        }
    }

    /// Flush buffered commands to disk
    pub fn flush(&mut self) -> HostResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for CommandTranscript {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

fn escape_python_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            TranscriptFormat::from_extension(Path::new("run.py")),
            TranscriptFormat::Python
        );
        assert_eq!(
            TranscriptFormat::from_extension(Path::new("run.cxc")),
            TranscriptFormat::Cxc
        );
        assert_eq!(
            TranscriptFormat::from_extension(Path::new("run")),
            TranscriptFormat::Cxc
        );
    }

    #[test]
    fn test_cxc_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.cxc");
        {
            let mut transcript = CommandTranscript::create(&path).unwrap();
            transcript.record("open 1a3n");
            transcript.record("close #1");
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "# amide host transcript\nopen 1a3n\nclose #1\n");
    }

    #[test]
    fn test_python_transcript_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.py");
        {
            let mut transcript = CommandTranscript::create(&path).unwrap();
            transcript.record("open \"/data/model.pdb\"");
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("from chimerax.core.commands import run"));
        assert!(text.ends_with("run(session, \"open \\\"/data/model.pdb\\\"\")\n"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape_python_string(r"a\b"), r"a\\b");
        assert_eq!(escape_python_string("a\nb"), "a\\nb");
    }
}
