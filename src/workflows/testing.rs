//! In-memory collaborators for workflow tests.

use anyhow::{anyhow, bail, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::models::{CatalogEntry, SubtitleCandidate, SubtitleEntry};
use crate::infra::{CatalogSearch, SubtitleHost};
use crate::media::ffsubsync::SyncTool;
use crate::menu::{Menu, SelectMode};

pub struct FakeCatalog {
    candidates: Option<Vec<CatalogEntry>>,
    queries: RefCell<Vec<String>>,
}

impl FakeCatalog {
    /// Answers every query with `candidates`.
    pub fn new(candidates: Vec<CatalogEntry>) -> Self {
        Self {
            candidates: Some(candidates),
            queries: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            candidates: None,
            queries: RefCell::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl CatalogSearch for FakeCatalog {
    fn search(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        self.queries.borrow_mut().push(query.to_string());
        self.candidates
            .clone()
            .ok_or_else(|| anyhow!("Error querying AniList API: HTTP 404 Not Found"))
    }
}

/// Replays one answer per `present` call; an exhausted script cancels.
pub struct ScriptedMenu {
    answers: RefCell<Vec<Vec<usize>>>,
    seen: RefCell<Vec<(Vec<String>, SelectMode)>>,
}

impl ScriptedMenu {
    pub fn new(answers: Vec<Vec<usize>>) -> Self {
        Self {
            answers: RefCell::new(answers),
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.borrow().len()
    }

    pub fn last_choices(&self) -> Vec<String> {
        self.seen
            .borrow()
            .last()
            .map(|(choices, _)| choices.clone())
            .unwrap_or_default()
    }

    pub fn modes(&self) -> Vec<SelectMode> {
        self.seen.borrow().iter().map(|(_, mode)| *mode).collect()
    }
}

impl Menu for ScriptedMenu {
    fn present(&self, _prompt: &str, choices: &[String], mode: SelectMode) -> Result<Vec<usize>> {
        self.seen.borrow_mut().push((choices.to_vec(), mode));
        let mut answers = self.answers.borrow_mut();
        if answers.is_empty() {
            return Ok(Vec::new());
        }
        Ok(answers.remove(0))
    }
}

#[derive(Default)]
pub struct FakeHost {
    entries: HashMap<u64, Vec<SubtitleEntry>>,
    files: HashMap<u64, Vec<SubtitleCandidate>>,
    bodies: HashMap<String, Vec<u8>>,
    truncated: HashMap<String, Vec<u8>>,
    downloads: RefCell<Vec<String>>,
}

impl FakeHost {
    pub fn with_entry(mut self, catalog_id: u64, entry_id: u64, label: &str) -> Self {
        self.entries.entry(catalog_id).or_default().push(SubtitleEntry {
            entry_id,
            label: label.to_string(),
        });
        self
    }

    pub fn with_file(mut self, entry_id: u64, file_name: &str, body: &str) -> Self {
        let url = format!("https://example.com/{entry_id}/{file_name}");
        self.files.entry(entry_id).or_default().push(SubtitleCandidate {
            entry_id,
            file_name: file_name.to_string(),
            download_url: url.clone(),
        });
        self.bodies.insert(url, body.as_bytes().to_vec());
        self
    }

    /// A file whose transfer writes `partial` and then fails.
    pub fn with_broken_file(mut self, entry_id: u64, file_name: &str, partial: &str) -> Self {
        let url = format!("https://example.com/{entry_id}/{file_name}");
        self.files.entry(entry_id).or_default().push(SubtitleCandidate {
            entry_id,
            file_name: file_name.to_string(),
            download_url: url.clone(),
        });
        self.truncated.insert(url, partial.as_bytes().to_vec());
        self
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.borrow().clone()
    }
}

impl SubtitleHost for FakeHost {
    fn entries(&self, catalog_id: u64) -> Result<Vec<SubtitleEntry>> {
        Ok(self.entries.get(&catalog_id).cloned().unwrap_or_default())
    }

    fn files(&self, entry_id: u64) -> Result<Vec<SubtitleCandidate>> {
        Ok(self.files.get(&entry_id).cloned().unwrap_or_default())
    }

    fn download(&self, candidate: &SubtitleCandidate, out: &mut dyn Write) -> Result<u64> {
        self.downloads
            .borrow_mut()
            .push(candidate.file_name.clone());
        if let Some(partial) = self.truncated.get(&candidate.download_url) {
            out.write_all(partial)?;
            bail!("connection reset");
        }
        let body = self
            .bodies
            .get(&candidate.download_url)
            .ok_or_else(|| anyhow!("HTTP 404 Not Found"))?;
        out.write_all(body)?;
        Ok(body.len() as u64)
    }
}

pub enum FakeSync {
    Writes(String),
    /// Writes the body a few bytes at a time, pausing between chunks.
    Chunked(String, usize),
    Empty,
    Fails,
}

pub struct FakeSyncTool {
    behavior: FakeSync,
    calls: AtomicUsize,
}

impl FakeSyncTool {
    pub fn new(behavior: FakeSync) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SyncTool for FakeSyncTool {
    fn synchronize(&self, _video: &Path, _input: &Path, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            FakeSync::Writes(body) => fs::write(output, body)?,
            FakeSync::Chunked(body, size) => {
                let mut file = File::create(output)?;
                for chunk in body.as_bytes().chunks(*size) {
                    file.write_all(chunk)?;
                    file.flush()?;
                    std::thread::sleep(Duration::from_millis(5));
                }
            }
            FakeSync::Empty => {
                File::create(output)?;
            }
            FakeSync::Fails => bail!("ffsubsync exited with exit status: 1"),
        }
        Ok(())
    }
}
