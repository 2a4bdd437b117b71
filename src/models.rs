/// A single song as returned by a search.
///
/// Image and audio variants are kept in the order the API returned them,
/// which is ascending quality; the last entry is the preferred one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Song {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub image_urls: Vec<String>,
    pub audio_urls: Vec<String>,
}

impl Song {
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.image_urls.last().map(String::as_str)
    }

    pub fn audio_url(&self) -> Option<&str> {
        self.audio_urls.last().map(String::as_str)
    }

    pub fn is_playable(&self) -> bool {
        self.audio_url().is_some()
    }

    pub fn display_artists(&self) -> String {
        if self.artists.is_empty() {
            "Unknown Artist".to_string()
        } else {
            self.artists.join(", ")
        }
    }

    pub fn summary(&self) -> String {
        format!("{} - {}", self.display_artists(), self.name)
    }
}
