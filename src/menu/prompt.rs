use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::{numbered, Menu, SelectMode};

/// Numbered list on stdout, answer read with rustyline.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptMenu;

impl Menu for PromptMenu {
    fn present(&self, prompt: &str, choices: &[String], mode: SelectMode) -> Result<Vec<usize>> {
        println!("{prompt}:");
        for line in numbered(choices) {
            println!("  {line}");
        }

        let hint = match mode {
            SelectMode::Single => format!("Enter number (1-{}), empty to cancel: ", choices.len()),
            SelectMode::Multi => format!(
                "Enter numbers (e.g. 1 3 5-7) or 'all' (1-{}), empty to cancel: ",
                choices.len()
            ),
        };

        let mut rl = DefaultEditor::new()?;
        loop {
            let input = match rl.readline(&hint) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(Vec::new()),
                Err(err) => return Err(err.into()),
            };
            if input.trim().is_empty() {
                return Ok(Vec::new());
            }
            match parse_selection(&input, choices.len(), mode) {
                Some(picked) => return Ok(picked),
                None => println!("Invalid selection, try again."),
            }
        }
    }
}

/// Parses `3`, `1,4`, `2 5-7` or `all` into 0-based indices. Multiple
/// numbers are rejected in single mode.
pub fn parse_selection(input: &str, count: usize, mode: SelectMode) -> Option<Vec<usize>> {
    let input = input.trim().to_lowercase();
    if mode == SelectMode::Multi && input == "all" {
        return Some((0..count).collect());
    }

    let mut picked = Vec::new();
    for part in input.split(|c: char| c == ',' || c.is_whitespace()) {
        if part.is_empty() {
            continue;
        }
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (start.parse::<usize>().ok()?, end.parse::<usize>().ok()?),
            None => {
                let n = part.parse::<usize>().ok()?;
                (n, n)
            }
        };
        if start < 1 || end > count || start > end {
            return None;
        }
        picked.extend((start - 1)..end);
    }

    match (mode, picked.len()) {
        (_, 0) => None,
        (SelectMode::Single, 1) => Some(picked),
        (SelectMode::Single, _) => None,
        (SelectMode::Multi, _) => Some(picked),
    }
}
