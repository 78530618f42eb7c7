use anyhow::{bail, Result};
use serde::Deserialize;

use super::CatalogSearch;
use crate::domain::models::CatalogEntry;

const ANILIST_API_BASE: &str = "https://graphql.anilist.co";

const SEARCH_QUERY: &str = r#"
query ($search: String) {
  Page(page: 1, perPage: 15) {
    media(search: $search, type: ANIME) {
      id
      title { romaji english native }
      format
      seasonYear
    }
  }
}
"#;

#[derive(Debug, Clone)]
pub struct AnilistClient {
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(rename = "Page")]
    page: Page,
}

#[derive(Debug, Deserialize)]
struct Page {
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    id: u64,
    title: MediaTitle,
    format: Option<String>,
    #[serde(rename = "seasonYear")]
    season_year: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MediaTitle {
    romaji: Option<String>,
    english: Option<String>,
    native: Option<String>,
}

impl Media {
    fn display_title(&self) -> String {
        let main = self
            .title
            .english
            .as_deref()
            .or(self.title.romaji.as_deref())
            .unwrap_or("Unknown");

        let mut label = main.to_string();
        if let Some(native) = &self.title.native {
            label.push_str(&format!(" - {native}"));
        }
        match (&self.format, self.season_year) {
            (Some(format), Some(year)) => label.push_str(&format!(" [{format}, {year}]")),
            (Some(format), None) => label.push_str(&format!(" [{format}]")),
            (None, Some(year)) => label.push_str(&format!(" [{year}]")),
            (None, None) => {}
        }
        label
    }
}

impl AnilistClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl CatalogSearch for AnilistClient {
    fn search(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        tracing::debug!("Searching AniList for '{query}'");
        let body = serde_json::json!({
            "query": SEARCH_QUERY,
            "variables": { "search": query },
        });
        let response = self
            .client
            .post(ANILIST_API_BASE)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(body.to_string())
            .send()?;

        if !response.status().is_success() {
            bail!("Error querying AniList API: HTTP {}", response.status());
        }

        parse_search_response(&response.text()?)
    }
}

fn parse_search_response(text: &str) -> Result<Vec<CatalogEntry>> {
    let search_resp: SearchResponse = serde_json::from_str(text)?;
    let Some(data) = search_resp.data else {
        bail!("Error querying AniList API: response has no data");
    };
    Ok(data
        .page
        .media
        .iter()
        .map(|media| CatalogEntry {
            id: media.id,
            display_title: media.display_title(),
        })
        .collect())
}
