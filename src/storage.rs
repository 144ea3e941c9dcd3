use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::WriteError;

/// Create `directory` (and parents) unless it already exists as a directory.
pub fn ensure_directory(directory: &Path) -> Result<(), WriteError> {
    if directory.exists() && !directory.is_dir() {
        return Err(WriteError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }

    fs::create_dir_all(directory).map_err(|source| {
        if directory.exists() && !directory.is_dir() {
            WriteError::NotADirectory {
                path: directory.to_path_buf(),
            }
        } else {
            WriteError::Io {
                path: directory.to_path_buf(),
                source,
            }
        }
    })
}

/// Split at the last `.` that is not the leading character.
///
/// `archive.tar.gz` -> (`archive.tar`, `.gz`), `README` -> (`README`, ``),
/// `.hidden` -> (`.hidden`, ``).
pub fn split_name(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}

fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Return a path inside `directory` that no file currently occupies.
///
/// Tries `filename` itself first, then `{stem}_1{suffix}`, `{stem}_2{suffix}`, ...
/// in order and returns the first free one, so gaps in an existing sequence get
/// filled. Only reads the directory; nothing is created.
pub fn unique_path(directory: &Path, filename: &str) -> PathBuf {
    let candidate = directory.join(filename);
    if !is_occupied(&candidate) {
        return candidate;
    }

    let (stem, suffix) = split_name(filename);
    let mut counter: u64 = 1;
    loop {
        let candidate = directory.join(format!("{stem}_{counter}{suffix}"));
        if !is_occupied(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

pub fn save_image(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    fs::write(path, bytes).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Filename for a downloaded image: the last non-empty segment of the URL path,
/// or `image_{index}.jpg` when the path has none.
pub fn filename_from_url(url: &str, index: usize) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| last_segment(&parsed))
        .unwrap_or_else(|| format!("image_{}.jpg", index))
}

fn last_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .map(|segment| segment.to_string())
}
