use anyhow::Result;
use std::io::Write;

use crate::domain::models::{CatalogEntry, SubtitleCandidate, SubtitleEntry};

pub mod anilist;
pub mod cache;
pub mod jimaku;

/// Title search against the anime catalog. An empty result is a valid answer.
pub trait CatalogSearch {
    /// Candidates in the catalog's relevance order.
    fn search(&self, query: &str) -> Result<Vec<CatalogEntry>>;
}

/// Subtitle hosting service keyed by catalog ID.
pub trait SubtitleHost {
    fn entries(&self, catalog_id: u64) -> Result<Vec<SubtitleEntry>>;

    fn files(&self, entry_id: u64) -> Result<Vec<SubtitleCandidate>>;

    /// Streams the file body into `out`, returning the number of bytes written.
    fn download(&self, candidate: &SubtitleCandidate, out: &mut dyn Write) -> Result<u64>;
}
