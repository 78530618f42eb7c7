use anyhow::Result;

use crate::error::Error;

pub mod fzf;
pub mod prompt;

pub use fzf::FzfMenu;
pub use prompt::PromptMenu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    Single,
    Multi,
}

/// An interactive choice among labeled options.
pub trait Menu {
    /// Returns indices into `choices`, in the order they were picked. An empty
    /// result means the user backed out.
    fn present(&self, prompt: &str, choices: &[String], mode: SelectMode) -> Result<Vec<usize>>;

    fn select_one(&self, prompt: &str, choices: &[String]) -> Result<usize, Error> {
        self.select(prompt, choices, SelectMode::Single)?
            .first()
            .copied()
            .ok_or(Error::SelectionCancelled)
    }

    fn select(&self, prompt: &str, choices: &[String], mode: SelectMode) -> Result<Vec<usize>, Error> {
        if choices.is_empty() {
            return Err(Error::SelectionCancelled);
        }
        let picked = match self.present(prompt, choices, mode) {
            Ok(picked) => picked,
            Err(e) => {
                tracing::warn!("Selection menu failed: {e:#}");
                return Err(Error::SelectionCancelled);
            }
        };
        let mut valid: Vec<usize> = Vec::with_capacity(picked.len());
        for index in picked {
            if index < choices.len() && !valid.contains(&index) {
                valid.push(index);
            }
        }
        if mode == SelectMode::Single {
            valid.truncate(1);
        }
        if valid.is_empty() {
            return Err(Error::SelectionCancelled);
        }
        Ok(valid)
    }
}

/// Prefixes each choice with its 1-based position so duplicate labels stay
/// distinguishable.
pub fn numbered(choices: &[String]) -> Vec<String> {
    choices
        .iter()
        .enumerate()
        .map(|(i, choice)| format!("{}. {}", i + 1, choice.replace('\n', " ")))
        .collect()
}

/// Maps lines produced by [`numbered`] back to 0-based indices.
pub fn indices_from_lines(output: &str, count: usize) -> Vec<usize> {
    output
        .lines()
        .filter_map(|line| {
            let (number, _) = line.trim().split_once(". ")?;
            let number: usize = number.parse().ok()?;
            (1..=count).contains(&number).then(|| number - 1)
        })
        .collect()
}
