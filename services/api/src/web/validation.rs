//! services/api/src/web/validation.rs
//!
//! Request-shape checks that belong to the HTTP surface rather than the core.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ApiError;

type Pattern = LazyLock<Result<Regex, regex::Error>>;

static VIDEO_URL_RE: Pattern = LazyLock::new(|| {
    Regex::new(
        r"^https?://(www\.)?(youtube\.com/watch\?v=[\w-]+|youtu\.be/[\w-]+|vimeo\.com/\d+)(\S*)$",
    )
});

fn compiled(pattern: &'static Pattern) -> Result<&'static Regex, ApiError> {
    pattern
        .as_ref()
        .map_err(|e| ApiError::Internal(format!("bad validation pattern: {}", e)))
}

/// Only YouTube and Vimeo links are accepted. An empty string clears the link.
pub fn video_url(raw: Option<String>) -> Result<Option<String>, ApiError> {
    let Some(url) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if compiled(&VIDEO_URL_RE)?.is_match(&url) {
        Ok(Some(url))
    } else {
        Err(ApiError::Validation(
            "Video URL must be a YouTube or Vimeo link".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_video_hosts_only() {
        for ok in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://vimeo.com/76979871",
        ] {
            assert_eq!(video_url(Some(ok.into())).unwrap().as_deref(), Some(ok));
        }
        assert!(video_url(Some("https://example.com/clip.mp4".into())).is_err());
        assert_eq!(video_url(Some("   ".into())).unwrap(), None);
        assert_eq!(video_url(None).unwrap(), None);
    }
}
