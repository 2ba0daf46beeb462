//! Invocation of the external binaries the hub is built with.

use anyhow::Context;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Fails naming every binary in `tools` that is not on `PATH`.
pub fn require(tools: &[&str]) -> anyhow::Result<()> {
    let missing: Vec<&str> = tools
        .iter()
        .copied()
        .filter(|t| which::which(t).is_err())
        .collect();

    if !missing.is_empty() {
        anyhow::bail!(
            "{} not found in PATH. Please install the HAL and UCSC tools first.",
            missing.join(", ")
        );
    }
    Ok(())
}

/// Shell-like rendering of a command line, for logs and error messages.
///
/// ```
/// let args = vec!["-type=bed6".to_string(), "a b.bed".to_string()];
/// assert_eq!(hal2hub::libs::tools::command_line("bedToBigBed", &args), "bedToBigBed -type=bed6 'a b.bed'");
/// ```
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    for arg in args {
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            parts.push(format!("'{}'", arg));
        } else {
            parts.push(arg.to_string());
        }
    }
    parts.join(" ")
}

fn command(program: &str, args: &[String]) -> Command {
    log::debug!("run: {}", command_line(program, args));
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd
}

fn check_status(program: &str, args: &[String], status: std::process::ExitStatus) -> anyhow::Result<()> {
    if !status.success() {
        anyhow::bail!(
            "Command failed with {}: {}",
            status,
            command_line(program, args)
        );
    }
    Ok(())
}

/// Runs to completion, stdout and stderr inherited.
pub fn run(program: &str, args: &[String]) -> anyhow::Result<()> {
    let status = command(program, args)
        .status()
        .with_context(|| format!("Failed to execute {}", program))?;
    check_status(program, args, status)
}

/// Runs with stdout redirected into `outfile`.
pub fn run_to_file(program: &str, args: &[String], outfile: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(outfile)
        .with_context(|| format!("Failed to create {}", outfile.display()))?;
    let status = command(program, args)
        .stdout(file)
        .status()
        .with_context(|| format!("Failed to execute {}", program))?;
    check_status(program, args, status)
}

/// Runs with stdout gzip-compressed into `outfile`.
pub fn run_to_gz(program: &str, args: &[String], outfile: &Path) -> anyhow::Result<()> {
    let mut child = command(program, args)
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to execute {}", program))?;

    let file = std::fs::File::create(outfile)
        .with_context(|| format!("Failed to create {}", outfile.display()))?;
    let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    if let Some(mut stdout) = child.stdout.take() {
        std::io::copy(&mut stdout, &mut encoder)?;
    }
    encoder.finish()?.flush()?;

    let status = child.wait()?;
    check_status(program, args, status)
}

/// Runs and returns stdout as text.
pub fn capture(program: &str, args: &[String]) -> anyhow::Result<String> {
    let output = command(program, args)
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| format!("Failed to execute {}", program))?;
    check_status(program, args, output.status)?;
    Ok(String::from_utf8(output.stdout)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        assert!(require(&["sh"]).is_ok());
        let err = require(&["sh", "no-such-tool-xyz"]).unwrap_err();
        assert!(err.to_string().starts_with("no-such-tool-xyz not found"));
    }

    #[test]
    fn test_capture_and_failure() {
        let out = capture("sh", &["-c".to_string(), "echo hello".to_string()]).unwrap();
        assert_eq!(out, "hello\n");

        let err = run("sh", &["-c".to_string(), "exit 3".to_string()]).unwrap_err();
        assert!(err.to_string().contains("sh -c 'exit 3'"));
    }

    #[test]
    fn test_run_to_gz() {
        let tmp = tempfile::TempDir::new().unwrap();
        let gz = tmp.path().join("out.gz");
        run_to_gz("sh", &["-c".to_string(), "printf 'a\\nb\\n'".to_string()], &gz).unwrap();

        let mut text = String::new();
        std::io::Read::read_to_string(&mut crate::reader(gz.to_str().unwrap()).unwrap(), &mut text)
            .unwrap();
        assert_eq!(text, "a\nb\n");
    }
}
