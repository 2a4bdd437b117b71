pub mod download;
pub mod playback;
pub mod view;
