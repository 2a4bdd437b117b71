/// Identifies one audio fetch. Only the newest fetch may start playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTicket(u64);

/// Tracks the single audio fetch that is allowed to reach the player.
///
/// Pausing, stopping or starting another fetch supersedes the pending one;
/// replies carrying an older ticket are dropped.
#[derive(Debug, Default)]
pub struct AudioLoader {
    seq: u64,
    pending: Option<(AudioTicket, String)>,
}

impl AudioLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, id: &str) -> AudioTicket {
        self.seq += 1;
        let ticket = AudioTicket(self.seq);
        self.pending = Some((ticket, id.to_string()));
        ticket
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_buffering(&self, id: &str) -> bool {
        self.pending.as_ref().is_some_and(|(_, pending)| pending == id)
    }

    /// Decides what to do with fetched audio. Returns the track to play, or
    /// `None` when the reply is stale or its track is no longer the playing one.
    pub fn accept(&mut self, ticket: AudioTicket, playing: Option<&str>) -> Option<String> {
        let (_, id) = self.take_if_current(ticket)?;
        if playing == Some(id.as_str()) {
            Some(id)
        } else {
            tracing::debug!(track = %id, "dropping audio for a track that is no longer playing");
            None
        }
    }

    /// A fetch failed. Returns the track it was for if it was the pending fetch.
    pub fn fail(&mut self, ticket: AudioTicket) -> Option<String> {
        self.take_if_current(ticket).map(|(_, id)| id)
    }

    fn take_if_current(&mut self, ticket: AudioTicket) -> Option<(AudioTicket, String)> {
        match &self.pending {
            Some((current, _)) if *current == ticket => self.pending.take(),
            _ => {
                tracing::debug!(ticket = ticket.0, "dropping stale audio reply");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_reply_is_played() {
        let mut loader = AudioLoader::new();
        let ticket = loader.begin("1");
        assert!(loader.is_buffering("1"));

        assert_eq!(loader.accept(ticket, Some("1")), Some("1".to_string()));
        assert!(!loader.is_buffering("1"));
    }

    #[test]
    fn test_reply_after_pause_is_dropped() {
        let mut loader = AudioLoader::new();
        let ticket = loader.begin("1");
        loader.cancel();

        assert_eq!(loader.accept(ticket, None), None);
    }

    #[test]
    fn test_reply_for_track_no_longer_playing_is_dropped() {
        let mut loader = AudioLoader::new();
        let ticket = loader.begin("1");

        assert_eq!(loader.accept(ticket, Some("2")), None);
        assert_eq!(loader.accept(ticket, None), None);
    }

    #[test]
    fn test_play_pause_play_plays_once() {
        let mut loader = AudioLoader::new();
        let first = loader.begin("1");
        loader.cancel();
        let second = loader.begin("1");

        // Replies may arrive in either order; only the newest fetch plays.
        assert_eq!(loader.accept(first, Some("1")), None);
        assert_eq!(loader.accept(second, Some("1")), Some("1".to_string()));
        assert_eq!(loader.accept(second, Some("1")), None);
    }

    #[test]
    fn test_superseded_by_other_track() {
        let mut loader = AudioLoader::new();
        let first = loader.begin("1");
        let second = loader.begin("2");

        assert_eq!(loader.accept(first, Some("2")), None);
        assert!(loader.is_buffering("2"));
        assert_eq!(loader.accept(second, Some("2")), Some("2".to_string()));
    }

    #[test]
    fn test_failure_only_reports_pending_fetch() {
        let mut loader = AudioLoader::new();
        let first = loader.begin("1");
        let second = loader.begin("1");

        assert_eq!(loader.fail(first), None);
        assert!(loader.is_buffering("1"));
        assert_eq!(loader.fail(second), Some("1".to_string()));
        assert!(!loader.is_buffering("1"));
    }
}
