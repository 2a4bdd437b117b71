use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::models::Song;
use crate::sources::SongSource;

pub struct SaavnClient {
    client: reqwest::blocking::Client,
    base_url: String,
    limit: Option<u32>,
}

// Every field is optional on the wire; a missing array means "nothing".

#[derive(Deserialize)]
struct SearchResponse {
    data: Option<SearchData>,
}

#[derive(Deserialize)]
struct SearchData {
    results: Option<Vec<SaavnSong>>,
}

#[derive(Deserialize)]
struct SaavnSong {
    id: Option<SaavnId>,
    name: Option<String>,
    image: Option<Vec<SaavnLink>>,
    artists: Option<SaavnArtists>,
    #[serde(rename = "downloadUrl")]
    download_url: Option<Vec<SaavnLink>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SaavnId {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
struct SaavnLink {
    url: Option<String>,
}

#[derive(Deserialize)]
struct SaavnArtists {
    primary: Option<Vec<SaavnArtist>>,
}

#[derive(Deserialize)]
struct SaavnArtist {
    name: Option<String>,
}

impl SaavnClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("saavnplay/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limit: config.limit,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search/songs", self.base_url)
    }

    fn convert_song(index: usize, song: SaavnSong) -> Song {
        let id = match song.id {
            Some(SaavnId::Text(s)) if !s.is_empty() => s,
            Some(SaavnId::Number(n)) => n.to_string(),
            // Real ids never start with '#', so these cannot collide with one.
            _ => format!("#{}", index),
        };

        let artists = song
            .artists
            .and_then(|a| a.primary)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.name)
            .map(|n| unescape_html(&n))
            .collect();

        Song {
            id,
            name: unescape_html(&song.name.unwrap_or_default()),
            artists,
            image_urls: link_urls(song.image),
            audio_urls: link_urls(song.download_url),
        }
    }
}

fn link_urls(links: Option<Vec<SaavnLink>>) -> Vec<String> {
    links
        .unwrap_or_default()
        .into_iter()
        .filter_map(|l| l.url)
        .filter(|u| !u.is_empty())
        .collect()
}

/// Decodes a search response body. A body without results is an empty list,
/// a body that is not JSON (or has the wrong shape) is an error.
pub fn parse_search_response(body: &str) -> Result<Vec<Song>> {
    let resp: SearchResponse =
        serde_json::from_str(body).context("search response is not valid JSON")?;

    let results = resp
        .data
        .and_then(|d| d.results)
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, s)| SaavnClient::convert_song(i, s))
        .collect();

    Ok(results)
}

/// The API escapes a handful of HTML entities in titles.
fn unescape_html(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

impl SongSource for SaavnClient {
    fn search(&self, query: &str) -> Result<Vec<Song>> {
        let mut params = vec![("query", query.to_string())];
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }

        tracing::debug!(query, "searching songs");

        let body = self
            .client
            .get(self.search_url())
            .query(&params)
            .send()
            .context("could not reach the search server")?
            .error_for_status()
            .context("search request failed")?
            .text()
            .context("failed to read search response")?;

        parse_search_response(&body)
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "fetching file");

        let data = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to download {}", url))?
            .error_for_status()?
            .bytes()?
            .to_vec();

        Ok(data)
    }
}
