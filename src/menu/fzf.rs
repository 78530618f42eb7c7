use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};

use super::{indices_from_lines, numbered, Menu, PromptMenu, SelectMode};

/// Runs an fzf-compatible selector: choices on stdin, picked lines on stdout.
pub struct FzfMenu {
    command: String,
    fallback: PromptMenu,
}

impl FzfMenu {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            fallback: PromptMenu,
        }
    }
}

impl Menu for FzfMenu {
    fn present(&self, prompt: &str, choices: &[String], mode: SelectMode) -> Result<Vec<usize>> {
        let mut command = Command::new(&self.command);
        command
            .args(["--height=40%", "--border", "--reverse"])
            .arg(format!("--prompt={prompt}> "))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped());
        if mode == SelectMode::Multi {
            command.arg("--multi");
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "'{}' not found, falling back to a numbered prompt",
                    self.command
                );
                return self.fallback.present(prompt, choices, mode);
            }
            Err(e) => return Err(e).context(format!("Failed to run {}", self.command)),
        };

        {
            let mut stdin = child
                .stdin
                .take()
                .context("Failed to open selector stdin")?;
            for line in numbered(choices) {
                if writeln!(stdin, "{line}").is_err() {
                    break; // Selector closed early
                }
            }
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for {}", self.command))?;

        if !output.status.success() {
            tracing::debug!("{} exited with {}", self.command, output.status);
            return Ok(Vec::new());
        }

        Ok(indices_from_lines(
            &String::from_utf8_lossy(&output.stdout),
            choices.len(),
        ))
    }
}
