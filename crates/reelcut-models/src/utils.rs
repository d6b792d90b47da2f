//! URL parsing helpers.

use thiserror::Error;

/// Errors that can occur during YouTube ID extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YoutubeIdError {
    #[error("URL is not a valid YouTube URL")]
    InvalidYoutubeUrl,

    #[error("Video ID has invalid format")]
    InvalidVideoId,

    #[error("Video ID not found in URL")]
    VideoIdNotFound,
}

/// Result type for YouTube ID extraction.
pub type YoutubeIdResult<T> = Result<T, YoutubeIdError>;

/// Markers preceding the video id, in order of preference.
const ID_MARKERS: &[&str] = &["?v=", "&v=", "youtu.be/", "/embed/", "/v/", "/shorts/", "/live/"];

/// Extract the 11-character YouTube video ID from a URL.
///
/// Supports `watch?v=`, `youtu.be/`, `/embed/`, `/v/`, `/shorts/` and `/live/`
/// forms, with or without query parameters and fragments.
pub fn extract_youtube_id(url: &str) -> YoutubeIdResult<String> {
    let url = url.trim();

    let lower = url.to_ascii_lowercase();
    if !lower.contains("youtube.com") && !lower.contains("youtu.be") {
        return Err(YoutubeIdError::InvalidYoutubeUrl);
    }

    for marker in ID_MARKERS {
        if let Some(pos) = url.find(marker) {
            let remaining = &url[pos + marker.len()..];
            let id = take_id_segment(remaining);
            if id.is_empty() {
                continue;
            }
            return validate_youtube_id(id);
        }
    }

    Err(YoutubeIdError::VideoIdNotFound)
}

fn take_id_segment(segment: &str) -> &str {
    let end = segment
        .find(['&', '#', '?', '/'])
        .unwrap_or(segment.len());
    segment[..end].trim()
}

fn validate_youtube_id(id: &str) -> YoutubeIdResult<String> {
    if id.len() != 11 {
        return Err(YoutubeIdError::InvalidVideoId);
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(YoutubeIdError::InvalidVideoId);
    }
    Ok(id.to_string())
}

/// Whether a URL points at a platform yt-dlp is commonly used with.
pub fn is_supported_url(url: &str) -> bool {
    const SUPPORTED_DOMAINS: &[&str] = &[
        "youtube.com",
        "youtu.be",
        "vimeo.com",
        "twitter.com",
        "x.com",
        "twitch.tv",
        "tiktok.com",
    ];

    SUPPORTED_DOMAINS.iter().any(|domain| url.contains(domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_youtube_id_success_cases() {
        for url in [
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLrAXtmRdnEQy4qtr",
            "https://youtu.be/dQw4w9WgXcQ?t=30",
            "https://youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/v/dQw4w9WgXcQ",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_youtube_id(url).unwrap(), "dQw4w9WgXcQ", "{url}");
        }
    }

    #[test]
    fn test_extract_youtube_id_failures() {
        assert_eq!(
            extract_youtube_id("https://example.com"),
            Err(YoutubeIdError::InvalidYoutubeUrl)
        );
        assert_eq!(
            extract_youtube_id("https://youtube.com/watch"),
            Err(YoutubeIdError::VideoIdNotFound)
        );
        assert_eq!(
            extract_youtube_id("https://youtu.be/"),
            Err(YoutubeIdError::VideoIdNotFound)
        );
        assert_eq!(
            extract_youtube_id("https://youtube.com/watch?v=abc123"),
            Err(YoutubeIdError::InvalidVideoId)
        );
        assert_eq!(
            extract_youtube_id("https://youtube.com/watch?v=abc123def!!"),
            Err(YoutubeIdError::InvalidVideoId)
        );
    }

    #[test]
    fn test_is_supported_url() {
        assert!(is_supported_url("https://youtube.com/watch?v=abc"));
        assert!(is_supported_url("https://vimeo.com/123"));
        assert!(!is_supported_url("https://example.com/video"));
    }
}
