pub mod saavn;

use anyhow::Result;

use crate::models::Song;

/// Remote song catalogue.
/// Covers both the search endpoint and the plain file fetch used for
/// thumbnails, playback and downloads, so tests can swap the whole network out.
pub trait SongSource {
    /// Searches songs by free text. An empty list means nothing matched.
    fn search(&self, query: &str) -> Result<Vec<Song>>;
    /// Downloads the resource at `url` into memory.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}
