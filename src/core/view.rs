use anyhow::Result;

use crate::models::Song;
use crate::sources::SongSource;

pub const EMPTY_QUERY_ERROR: &str = "Please enter a song!";
pub const NOT_FOUND_ERROR: &str = "Song Not Found!";
pub const FETCH_FAILED_ERROR: &str = "Failed to fetch songs!";

/// Identifies one issued search. Only the newest ticket may change the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub ticket: SearchTicket,
    pub query: String,
}

/// What the audio side has to do after a playback toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackCommand {
    /// Start (or resume) this track; anything else that is playing stops.
    Play(String),
    Pause,
}

/// Application state of the search-and-play view.
#[derive(Debug, Default)]
pub struct ViewState {
    /// Text of the query field, edited directly by the UI.
    pub query: String,
    songs: Vec<Song>,
    error: Option<String>,
    loading: bool,
    playing: Option<String>,
    seq: u64,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn playing(&self) -> Option<&str> {
        self.playing.as_deref()
    }

    pub fn is_playing(&self, id: &str) -> bool {
        self.playing.as_deref() == Some(id)
    }

    /// Validates the query and resets the view for a new search.
    ///
    /// Returns `None` (with the validation error set) when the query is blank;
    /// no request must be issued in that case. The returned query is the raw
    /// field text, untrimmed.
    pub fn begin_search(&mut self) -> Option<SearchRequest> {
        if self.query.trim().is_empty() {
            self.error = Some(EMPTY_QUERY_ERROR.to_string());
            return None;
        }

        self.seq += 1;
        self.error = None;
        self.songs.clear();
        self.playing = None;
        self.loading = true;

        Some(SearchRequest {
            ticket: SearchTicket(self.seq),
            query: self.query.clone(),
        })
    }

    /// Applies the outcome of a search. Returns `false` when the ticket is stale
    /// and the outcome was dropped.
    pub fn finish_search(&mut self, ticket: SearchTicket, outcome: Result<Vec<Song>>) -> bool {
        if ticket.0 != self.seq {
            tracing::debug!(ticket = ticket.0, current = self.seq, "dropping stale search response");
            return false;
        }

        match outcome {
            Ok(songs) if !songs.is_empty() => {
                tracing::info!(count = songs.len(), "search finished");
                self.songs = songs;
                self.error = None;
            }
            Ok(_) => {
                self.error = Some(NOT_FOUND_ERROR.to_string());
            }
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "API error");
                self.error = Some(FETCH_FAILED_ERROR.to_string());
            }
        }

        self.loading = false;
        true
    }

    /// Runs a whole search synchronously against `source`.
    pub fn submit_search(&mut self, source: &dyn SongSource) {
        if let Some(req) = self.begin_search() {
            let outcome = source.search(&req.query);
            self.finish_search(req.ticket, outcome);
        }
    }

    pub fn toggle_playback(&mut self, id: &str) -> PlaybackCommand {
        if self.is_playing(id) {
            self.playing = None;
            PlaybackCommand::Pause
        } else {
            self.playing = Some(id.to_string());
            PlaybackCommand::Play(id.to_string())
        }
    }

    /// The audio output stopped on its own (end of track, device loss).
    pub fn on_audio_stopped(&mut self) {
        self.playing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    use anyhow::bail;

    enum Reply {
        Songs(Vec<Song>),
        Fail,
    }

    struct MockSource {
        reply: Reply,
        queries: RefCell<Vec<String>>,
        fetches: Cell<usize>,
    }

    impl MockSource {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                queries: RefCell::new(Vec::new()),
                fetches: Cell::new(0),
            }
        }
    }

    impl SongSource for MockSource {
        fn search(&self, query: &str) -> Result<Vec<Song>> {
            self.queries.borrow_mut().push(query.to_string());
            match &self.reply {
                Reply::Songs(songs) => Ok(songs.clone()),
                Reply::Fail => bail!("network unreachable"),
            }
        }

        fn fetch_bytes(&self, _url: &str) -> Result<Vec<u8>> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(Vec::new())
        }
    }

    fn songs(ids: &[&str]) -> Vec<Song> {
        ids.iter()
            .map(|id| Song {
                id: id.to_string(),
                name: format!("Song {}", id),
                ..Default::default()
            })
            .collect()
    }

    fn view_with_query(q: &str) -> ViewState {
        let mut view = ViewState::new();
        view.query = q.to_string();
        view
    }

    #[test]
    fn test_blank_query_sets_error_without_request() {
        for q in ["", "   "] {
            let source = MockSource::new(Reply::Songs(songs(&["1"])));
            let mut view = view_with_query(q);
            view.submit_search(&source);

            assert_eq!(view.error(), Some(EMPTY_QUERY_ERROR));
            assert!(source.queries.borrow().is_empty());
            assert!(!view.is_loading());
        }
    }

    #[test]
    fn test_results_are_stored() {
        let source = MockSource::new(Reply::Songs(songs(&["1", "2", "3"])));
        let mut view = view_with_query("shape of you");
        view.submit_search(&source);

        assert_eq!(view.songs().len(), 3);
        assert_eq!(view.error(), None);
        assert!(!view.is_loading());
        assert_eq!(*source.queries.borrow(), vec!["shape of you".to_string()]);
    }

    #[test]
    fn test_raw_query_is_sent_untrimmed() {
        let source = MockSource::new(Reply::Songs(songs(&["1"])));
        let mut view = view_with_query("  tum hi ho ");
        view.submit_search(&source);
        assert_eq!(*source.queries.borrow(), vec!["  tum hi ho ".to_string()]);
    }

    #[test]
    fn test_empty_results_is_not_found() {
        let source = MockSource::new(Reply::Songs(Vec::new()));
        let mut view = view_with_query("zzzz");
        view.submit_search(&source);

        assert_eq!(view.error(), Some(NOT_FOUND_ERROR));
        assert!(view.songs().is_empty());
        assert!(!view.is_loading());
    }

    #[test]
    fn test_failure_sets_fetch_error() {
        let source = MockSource::new(Reply::Fail);
        let mut view = view_with_query("anything");
        view.submit_search(&source);

        assert_eq!(view.error(), Some(FETCH_FAILED_ERROR));
        assert!(view.songs().is_empty());
        assert!(!view.is_loading());
    }

    #[test]
    fn test_new_search_clears_previous_state() {
        let mut view = view_with_query("first");
        view.submit_search(&MockSource::new(Reply::Songs(songs(&["1", "2"]))));
        view.toggle_playback("1");

        view.query = "second".to_string();
        let req = view.begin_search().unwrap();
        assert!(view.is_loading());
        assert!(view.songs().is_empty());
        assert_eq!(view.error(), None);
        assert_eq!(view.playing(), None);
        assert_eq!(req.query, "second");
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut view = view_with_query("first");
        let first = view.begin_search().unwrap();
        view.query = "second".to_string();
        let second = view.begin_search().unwrap();

        assert!(view.finish_search(second.ticket, Ok(songs(&["b"]))));
        assert!(!view.finish_search(first.ticket, Ok(songs(&["a1", "a2"]))));

        assert_eq!(view.songs().len(), 1);
        assert_eq!(view.songs()[0].id, "b");
        assert!(!view.is_loading());
    }

    #[test]
    fn test_stale_failure_does_not_end_loading() {
        let mut view = view_with_query("first");
        let first = view.begin_search().unwrap();
        let _second = view.begin_search().unwrap();

        assert!(!view.finish_search(first.ticket, Err(anyhow::anyhow!("timeout"))));
        assert!(view.is_loading());
        assert_eq!(view.error(), None);
    }

    #[test]
    fn test_toggle_twice_is_identity() {
        let mut view = ViewState::new();
        assert_eq!(view.toggle_playback("1"), PlaybackCommand::Play("1".to_string()));
        assert_eq!(view.toggle_playback("1"), PlaybackCommand::Pause);
        assert_eq!(view.playing(), None);

        view.toggle_playback("2");
        view.toggle_playback("3");
        view.toggle_playback("3");
        assert_eq!(view.playing(), None);
    }

    #[test]
    fn test_at_most_one_track_playing() {
        let mut view = ViewState::new();
        view.toggle_playback("1");
        assert_eq!(view.toggle_playback("2"), PlaybackCommand::Play("2".to_string()));
        assert!(view.is_playing("2"));
        assert!(!view.is_playing("1"));

        view.on_audio_stopped();
        assert_eq!(view.playing(), None);
    }

    #[test]
    fn test_search_never_fetches_files() {
        let source = MockSource::new(Reply::Songs(songs(&["1"])));
        let mut view = view_with_query("x");
        view.submit_search(&source);
        assert_eq!(source.fetches.get(), 0);
    }
}
