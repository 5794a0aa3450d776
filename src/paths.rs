use std::path::{Path, PathBuf};
use url::Url;

pub const FALLBACK_TITLE: &str = "downloaded";
const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Where a run writes: one folder per post title under `base_dir`.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub base_dir: PathBuf,
}

impl OutputPaths {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn from_current_dir() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn title_dir(&self, title: &str) -> PathBuf {
        self.base_dir.join(sanitize_title(title))
    }

    pub fn ensure_title_dir(&self, title: &str) -> std::io::Result<PathBuf> {
        let dir = self.title_dir(title);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// Replaces characters Windows and most Unix filesystems reject, then trims whitespace.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ILLEGAL_FILENAME_CHARS.contains(&ch) {
                '_'
            } else {
                ch
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn sanitize_title(title: &str) -> String {
    let safe = sanitize_filename(title);
    if is_usable_name(&safe) {
        safe
    } else {
        FALLBACK_TITLE.to_string()
    }
}

/// Local filename for the `index`-th (1-based) image of a post.
///
/// Uses the percent-decoded last path segment; segments without an extension get
/// `image_{index}.jpg`.
pub fn image_filename(url: &str, index: usize) -> String {
    let fallback = || format!("image_{index}.jpg");

    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or("").to_string(),
    };
    let segment = path.rsplit('/').next().unwrap_or("");
    let decoded = String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes())).into_owned();
    if decoded.is_empty() || !decoded.contains('.') {
        return fallback();
    }

    let name = decoded.split('?').next().unwrap_or("");
    let safe = sanitize_filename(name);
    if is_usable_name(&safe) {
        safe
    } else {
        fallback()
    }
}

fn is_usable_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

pub fn file_exists(dir: &Path, filename: &str) -> bool {
    dir.join(filename).is_file()
}
