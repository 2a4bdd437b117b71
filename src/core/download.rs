use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::sources::SongSource;

fn is_reserved(c: char) -> bool {
    match c {
        '/' | '\0' => true,
        c if c.is_control() => true,
        ':' => cfg!(any(target_os = "windows", target_os = "macos")),
        '\\' | '*' | '?' | '"' | '<' | '>' | '|' => cfg!(target_os = "windows"),
        _ => false,
    }
}

/// Replaces characters the host file system rejects (and control characters
/// such as newlines, which API titles occasionally carry) with `_`.
pub fn sanitize_filename(s: &str) -> String {
    s.chars().map(|c| if is_reserved(c) { '_' } else { c }).collect()
}

/// `"{display_name}.mp3"`, sanitized for the local file system.
/// A blank display name falls back to `track.mp3` so the file never ends up as a bare `.mp3`.
pub fn track_filename(display_name: &str) -> String {
    let name = display_name.trim();
    let name = if name.is_empty() { "track" } else { name };
    format!("{}.mp3", sanitize_filename(name))
}

/// Fetches the audio payload for a track.
/// A track without a source URL is not an error: nothing is fetched and `None` is returned.
pub fn fetch_track(source: &dyn SongSource, url: Option<&str>) -> Result<Option<Vec<u8>>> {
    let Some(url) = url else {
        tracing::warn!("no download URL available");
        return Ok(None);
    };
    let bytes = source
        .fetch_bytes(url)
        .context("failed to fetch track audio")?;
    Ok(Some(bytes))
}

/// Writes a downloaded payload to `path`, creating missing parent directories.
pub fn save_track(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

/// Downloads a track into `dir` as `{display_name}.mp3`.
///
/// Failures are reported on the log only and yield `None`; the caller's
/// state is never touched.
pub fn download_track(
    source: &dyn SongSource,
    display_name: &str,
    url: Option<&str>,
    dir: &Path,
) -> Option<PathBuf> {
    let result = (|| -> Result<Option<PathBuf>> {
        let Some(bytes) = fetch_track(source, url)? else {
            return Ok(None);
        };
        let path = dir.join(track_filename(display_name));
        save_track(&path, &bytes)?;
        Ok(Some(path))
    })();

    match result {
        Ok(Some(path)) => {
            tracing::info!(path = %path.display(), "track downloaded");
            Some(path)
        }
        Ok(None) => None,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), track = display_name, "download error");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use anyhow::bail;

    use crate::models::Song;

    struct FileServer {
        fail: bool,
        fetched: RefCell<Vec<String>>,
    }

    impl FileServer {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                fetched: RefCell::new(Vec::new()),
            }
        }
    }

    impl SongSource for FileServer {
        fn search(&self, _query: &str) -> Result<Vec<Song>> {
            Ok(Vec::new())
        }

        fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
            self.fetched.borrow_mut().push(url.to_string());
            if self.fail {
                bail!("connection reset");
            }
            Ok(b"ID3fake-audio".to_vec())
        }
    }

    #[test]
    fn test_sanitize_filename_removes_slash_and_null() {
        assert_eq!(sanitize_filename("a/b\0c"), "a_b_c");
    }

    #[test]
    fn test_sanitize_filename_removes_control_chars() {
        assert_eq!(sanitize_filename("Line\nBreak\tTab"), "Line_Break_Tab");
        assert_eq!(sanitize_filename("Tum Hi Ho – Aashiqui 2"), "Tum Hi Ho – Aashiqui 2");
    }

    #[test]
    fn test_track_filename() {
        assert_eq!(track_filename("Shape of You"), "Shape of You.mp3");
        assert_eq!(track_filename("AC/DC"), "AC_DC.mp3");
        assert_eq!(track_filename("   "), "track.mp3");
    }

    #[test]
    fn test_missing_url_fetches_nothing() {
        let server = FileServer::new(false);
        let dir = tempfile::tempdir().unwrap();

        assert!(fetch_track(&server, None).unwrap().is_none());
        assert!(download_track(&server, "Song", None, dir.path()).is_none());

        assert!(server.fetched.borrow().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_download_writes_named_file() {
        let server = FileServer::new(false);
        let dir = tempfile::tempdir().unwrap();

        let path = download_track(&server, "Shape of You", Some("https://aac/320.mp4"), dir.path())
            .expect("download should succeed");

        assert_eq!(path, dir.path().join("Shape of You.mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3fake-audio");
        assert_eq!(*server.fetched.borrow(), vec!["https://aac/320.mp4".to_string()]);
    }

    #[test]
    fn test_download_failure_is_swallowed() {
        let server = FileServer::new(true);
        let dir = tempfile::tempdir().unwrap();

        assert!(download_track(&server, "Song", Some("https://x/1.mp4"), dir.path()).is_none());
        assert_eq!(server.fetched.borrow().len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("a.mp3");
        save_track(&path, b"abc").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"abc");
    }
}
