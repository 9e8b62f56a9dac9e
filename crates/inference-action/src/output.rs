//! Step Outputs
//!
//! The response is persisted to a file and, when running under Actions,
//! exported as the `response` and `response-file` step outputs.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name used when no response file is configured
pub const RESPONSE_FILE_NAME: &str = "modelResponse.txt";

/// Default response location: the runner's temp directory, or the system one
pub fn default_response_file(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    env("RUNNER_TEMP")
        .filter(|dir| !dir.is_empty())
        .map_or_else(std::env::temp_dir, PathBuf::from)
        .join(RESPONSE_FILE_NAME)
}

/// Write the response text, creating parent directories as needed
pub fn write_response_file(path: &Path, response: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, response)
}

/// Append `response` and `response-file` to the `GITHUB_OUTPUT` file
pub fn write_step_outputs(output: &Path, response: &str, response_file: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(output)?;
    write_output(&mut file, "response", response)?;
    write_output(&mut file, "response-file", &response_file.display().to_string())
}

fn write_output(out: &mut impl Write, name: &str, value: &str) -> io::Result<()> {
    let delimiter = delimiter_for(value);
    writeln!(out, "{name}<<{delimiter}")?;
    writeln!(out, "{value}")?;
    writeln!(out, "{delimiter}")
}

fn delimiter_for(value: &str) -> String {
    loop {
        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        if !value.contains(&delimiter) {
            return delimiter;
        }
    }
}

/// Surface a failure as a workflow error annotation
pub fn error_annotation(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{escaped}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_response_file() {
        let path = default_response_file(|_| Some("/runner/tmp".into()));
        assert_eq!(path, PathBuf::from("/runner/tmp/modelResponse.txt"));

        let path = default_response_file(|_| None);
        assert_eq!(path, std::env::temp_dir().join("modelResponse.txt"));
    }

    #[test]
    fn test_write_response_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/response.txt");

        write_response_file(&path, "hello").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_step_outputs_use_heredoc() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("github_output");
        fs::write(&output, "earlier=1\n").unwrap();

        write_step_outputs(&output, "line one\nline two", Path::new("/tmp/modelResponse.txt"))
            .unwrap();

        let written = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "earlier=1");

        let delimiter = lines[1].strip_prefix("response<<").unwrap();
        assert!(delimiter.starts_with("ghadelimiter_"));
        assert_eq!(lines[2], "line one");
        assert_eq!(lines[3], "line two");
        assert_eq!(lines[4], delimiter);

        let delimiter = lines[5].strip_prefix("response-file<<").unwrap();
        assert_eq!(lines[6], "/tmp/modelResponse.txt");
        assert_eq!(lines[7], delimiter);
    }

    #[test]
    fn test_error_annotation_escapes_newlines() {
        assert_eq!(
            error_annotation("failed: 100%\nsee logs"),
            "::error::failed: 100%25%0Asee logs"
        );
    }
}
