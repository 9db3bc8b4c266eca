//! Text helpers shared by prompt building, storage and the terminal surface.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Largest study-material file accepted (10 MiB).
pub const MAX_MATERIAL_BYTES: u64 = 10 * 1024 * 1024;

/// Extensions treated as plain-text study material. No extension is also accepted.
const MATERIAL_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// Marker appended to text cut to a budget.
pub const ELLIPSIS: &str = "...";

const MARKUP_PATTERNS: [&str; 3] = [r"[<>]", r"(?i)javascript:", r"(?i)on\w+="];

fn markup_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        MARKUP_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// Strip angle brackets, `javascript:` and inline `on<event>=` handlers, then trim.
pub fn sanitize_input(input: &str) -> String {
    let mut cleaned = input.to_string();
    for pattern in markup_patterns() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

/// Truncate a string to `max_chars` characters (Unicode-safe).
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Cut `content` to `max_chars` characters and append `...` when anything was removed.
pub fn truncate_with_ellipsis(content: &str, max_chars: usize) -> String {
    let cut = truncate_str(content, max_chars);
    if cut.len() == content.len() {
        content.to_string()
    } else {
        format!("{}{}", cut, ELLIPSIS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaterialRejection {
    #[error("File is {bytes} bytes; study material must be 10 MiB or smaller")]
    TooLarge { bytes: u64 },
    #[error("Unsupported file type '.{extension}'; use a plain text or markdown file")]
    UnsupportedType { extension: String },
}

/// Check a study-material file by name and size before reading it.
pub fn check_material_file(path: &Path, size_bytes: u64) -> Result<(), MaterialRejection> {
    if size_bytes > MAX_MATERIAL_BYTES {
        return Err(MaterialRejection::TooLarge { bytes: size_bytes });
    }
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let lower = ext.to_ascii_lowercase();
        if !MATERIAL_EXTENSIONS.contains(&lower.as_str()) {
            return Err(MaterialRejection::UnsupportedType { extension: lower });
        }
    }
    Ok(())
}
