use anyhow::{bail, Result};
use serde::Deserialize;
use std::io::Write;

use super::SubtitleHost;
use crate::domain::models::{SubtitleCandidate, SubtitleEntry};

const JIMAKU_API_BASE: &str = "https://jimaku.cc/api";

#[derive(Debug, Clone)]
pub struct JimakuClient {
    api_token: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: u64,
    name: String,
    english_name: Option<String>,
    japanese_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    name: String,
    url: String,
}

impl RawEntry {
    fn label(&self) -> String {
        let main = self
            .english_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name);
        match self.japanese_name.as_deref().filter(|n| !n.is_empty()) {
            Some(japanese) => format!("{main} - {japanese}"),
            None => main.to_string(),
        }
    }
}

impl JimakuClient {
    pub fn new(api_token: String) -> Self {
        Self {
            api_token,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn get(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        self.client
            .get(url)
            .header("Authorization", &self.api_token)
            .header("Accept", "application/json")
    }
}

impl SubtitleHost for JimakuClient {
    fn entries(&self, catalog_id: u64) -> Result<Vec<SubtitleEntry>> {
        let response = self
            .get(&format!("{JIMAKU_API_BASE}/entries/search"))
            .query(&[("anilist_id", catalog_id.to_string()), ("anime", "true".to_string())])
            .send()?;

        if !response.status().is_success() {
            bail!("Error querying Jimaku API: HTTP {}", response.status());
        }

        parse_entries(&response.text()?)
    }

    fn files(&self, entry_id: u64) -> Result<Vec<SubtitleCandidate>> {
        let response = self
            .get(&format!("{JIMAKU_API_BASE}/entries/{entry_id}/files"))
            .send()?;

        if !response.status().is_success() {
            bail!("Error querying Jimaku API: HTTP {}", response.status());
        }

        parse_files(entry_id, &response.text()?)
    }

    fn download(&self, candidate: &SubtitleCandidate, out: &mut dyn Write) -> Result<u64> {
        let mut response = self.client.get(&candidate.download_url).send()?;

        if !response.status().is_success() {
            bail!("HTTP {}", response.status());
        }

        Ok(response.copy_to(out)?)
    }
}

fn parse_entries(text: &str) -> Result<Vec<SubtitleEntry>> {
    let raw: Vec<RawEntry> = serde_json::from_str(text)?;
    Ok(raw
        .iter()
        .map(|entry| SubtitleEntry {
            entry_id: entry.id,
            label: entry.label(),
        })
        .collect())
}

fn parse_files(entry_id: u64, text: &str) -> Result<Vec<SubtitleCandidate>> {
    let raw: Vec<RawFile> = serde_json::from_str(text)?;
    Ok(raw
        .into_iter()
        .map(|file| SubtitleCandidate {
            entry_id,
            file_name: file.name,
            download_url: file.url,
        })
        .collect())
}
