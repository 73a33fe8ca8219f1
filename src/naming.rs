//! File naming for downloaded images.
//!
//! Every managed file is called `DOWN-<stem>.jpg`. The prefix is what
//! pruning matches on, so files the user drops into the same directory are
//! never touched.

use std::path::{Path, PathBuf};

/// Prefix of every managed file.
pub const PREFIX: &str = "DOWN-";

/// Extension of every managed file.
pub const SUFFIX: &str = ".jpg";

/// Titles longer than this are shortened.
pub const MAX_TITLE_LENGTH: usize = 30;

/// Characters kept in file names besides ASCII letters and digits.
const EXTRA_CHARS: &[char] = &['-', '_', '.', '(', ')'];

/// Characters trimmed from both ends of a file name.
const TRIM_CHARS: &[char] = &[' ', '_', '.', '-', '(', ')'];

/// Shorten a title to its head and tail joined by `...`.
pub fn shorten_title(title: &str) -> String {
    let chars: Vec<char> = title.chars().collect();
    if chars.len() <= MAX_TITLE_LENGTH {
        return title.to_string();
    }

    let half = MAX_TITLE_LENGTH / 2;
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Stem identifying a thread's image: `<id>_<shortened title>`.
pub fn image_stem(id: &str, title: &str) -> String {
    format!("{}_{}", id, shorten_title(title))
}

/// Reduce a string to a portable file name.
pub fn safe_filename(name: &str) -> String {
    name.replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || EXTRA_CHARS.contains(c))
        .collect::<String>()
        .trim_matches(TRIM_CHARS)
        .to_string()
}

/// Full path of the image for `stem` inside `dest`.
pub fn image_path(dest: &Path, stem: &str) -> PathBuf {
    dest.join(format!("{}{}{}", PREFIX, safe_filename(stem), SUFFIX))
}

/// Whether a file name belongs to a managed image.
pub fn is_managed(file_name: &str) -> bool {
    file_name.starts_with(PREFIX) && file_name.ends_with(SUFFIX)
}
