use std::io::Cursor;
use std::time::Duration;

use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};

/// Single-sink audio output. Starting a track always stops the previous one,
/// so at most one song is audible.
pub struct Player {
    stream: OutputStream,
    sink: Option<Sink>,
    loaded: Option<String>,
    volume: f32,
}

impl Player {
    pub fn new(volume: f32) -> Result<Self> {
        let stream =
            OutputStreamBuilder::open_default_stream().context("no audio output device")?;

        Ok(Self {
            stream,
            sink: None,
            loaded: None,
            volume,
        })
    }

    /// Decodes an in-memory file and starts playing it as track `id`.
    pub fn play_bytes(&mut self, id: &str, bytes: Vec<u8>) -> Result<()> {
        self.stop();

        let source = Decoder::new(Cursor::new(bytes)).context("unsupported audio format")?;
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.volume);
        sink.append(source);

        self.sink = Some(sink);
        self.loaded = Some(id.to_string());
        tracing::debug!(track = id, "playback started");
        Ok(())
    }

    /// Resumes `id` if it is the loaded track. Returns `false` when it has to be fetched first.
    pub fn resume(&mut self, id: &str) -> bool {
        match (&self.sink, &self.loaded) {
            (Some(sink), Some(loaded)) if loaded == id && !sink.empty() => {
                sink.play();
                true
            }
            _ => false,
        }
    }

    pub fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.loaded = None;
    }

    /// Track `id` is loaded and not paused.
    pub fn is_playing(&self, id: &str) -> bool {
        self.loaded.as_deref() == Some(id)
            && self.sink.as_ref().is_some_and(|s| !s.is_paused() && !s.empty())
    }

    /// The loaded track ran to its end.
    pub fn is_finished(&self) -> bool {
        self.loaded.is_some() && self.sink.as_ref().is_some_and(|s| s.empty())
    }

    /// Playback position of `id`, if it is the loaded track.
    pub fn position(&self, id: &str) -> Option<Duration> {
        if self.loaded.as_deref() != Some(id) {
            return None;
        }
        self.sink.as_ref().map(|s| s.get_pos())
    }
}
