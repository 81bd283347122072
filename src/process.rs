// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Blocking execution of external tools.
//!
//! No timeout is applied; the tools' own behavior decides how long a step takes.

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::process::{Command, Output, Stdio};

/// Run `program` with `args` to completion and capture its output.
///
/// Fails only if the process could not be started. The exit status is left to the caller.
pub fn run_command<S: AsRef<OsStr>>(program: &str, args: &[S]) -> Result<Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::CommandNotFound {
                    command: program.to_string(),
                    hint: get_install_hint(program),
                }
            } else {
                Error::Command {
                    command: program.to_string(),
                    stderr: e.to_string(),
                }
            }
        })
}

/// Run a command and turn a non-zero exit status into [`Error::Command`].
pub fn run_checked<S: AsRef<OsStr>>(program: &str, args: &[S]) -> Result<Output> {
    let output = run_command(program, args)?;
    if !output.status.success() {
        return Err(Error::Command {
            command: describe(program, args),
            stderr: failure_text(&output),
        });
    }
    Ok(output)
}

/// Split an argv vector into program and arguments.
pub fn split_argv(argv: &[String]) -> Result<(&str, &[String])> {
    match argv.split_first() {
        Some((program, args)) if !program.is_empty() => Ok((program.as_str(), args)),
        _ => Err(Error::Config("command cannot be empty".into())),
    }
}

/// Render a command line for messages.
pub fn describe<S: AsRef<OsStr>>(program: &str, args: &[S]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.as_ref().to_string_lossy());
    }
    line
}

/// Diagnostic text of a finished process: stderr, or stdout if stderr is empty.
pub fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };
    match output.status.code() {
        Some(code) if text.trim().is_empty() => format!("exited with status {}", code),
        _ if text.trim().is_empty() => "terminated by signal".to_string(),
        _ => text.trim().to_string(),
    }
}

fn get_install_hint(command: &str) -> String {
    match command {
        "openssl" => "Install OpenSSL: sudo apt install openssl (or set toolchain = \"builtin\")"
            .to_string(),
        "a2ensite" | "a2dissite" | "apachectl" | "apache2ctl" => {
            "Install Apache: sudo apt install apache2".to_string()
        }
        "systemctl" => {
            "systemctl is unavailable; configure [server] restart/reload commands".to_string()
        }
        _ => format!("Please install the '{}' command", command),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_checked_success() {
        let output = run_checked("sh", &["-c", "echo hello"]).unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[test]
    fn test_run_checked_failure_reports_stderr() {
        let err = run_checked("sh", &["-c", "echo broken >&2; exit 3"]).unwrap_err();
        match err {
            Error::Command { command, stderr } => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_failure_without_output_mentions_status() {
        let err = run_checked("sh", &["-c", "exit 4"]).unwrap_err();
        assert!(err.to_string().contains("exited with status 4"));
    }

    #[test]
    fn test_missing_program() {
        let err = run_command("devhost-no-such-program", &["x"]).unwrap_err();
        assert!(matches!(err, Error::CommandNotFound { .. }));
    }

    #[test]
    fn test_split_argv() {
        let argv = vec!["systemctl".to_string(), "reload".to_string()];
        let (program, args) = split_argv(&argv).unwrap();
        assert_eq!(program, "systemctl");
        assert_eq!(args, &["reload".to_string()]);
        assert!(split_argv(&[]).is_err());
    }
}
