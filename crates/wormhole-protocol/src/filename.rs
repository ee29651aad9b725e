//! Sanitization of peer-supplied filenames

use std::path::{Component, Path};

/// Fallback name used when the sender-supplied filename is unusable
const FALLBACK_NAME: &str = "download";

/// Reduce an untrusted offer filename to a bare, safe file name.
///
/// The sender controls the `filename` field of an offer, so it must never be
/// joined onto a local directory as-is. This keeps only the final path
/// component, drops parent-directory references, NUL bytes and separator
/// characters, and falls back to a fixed name when nothing usable remains.
pub fn sanitized_filename(untrusted: &str) -> String {
    let cleaned: String = untrusted
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    let name = Path::new(&cleaned)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .next_back()
        .unwrap_or("")
        .trim()
        .to_string();

    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_passes_through() {
        assert_eq!(sanitized_filename("photo.jpg"), "photo.jpg");
    }

    #[test]
    fn test_separators_are_neutralized() {
        assert_eq!(sanitized_filename("a/b/c.txt"), "a_b_c.txt");
        assert_eq!(sanitized_filename("..\\evil.exe"), ".._evil.exe");
    }

    #[test]
    fn test_traversal_and_empty_fall_back() {
        assert_eq!(sanitized_filename(""), "download");
        assert_eq!(sanitized_filename(".."), "download");
        assert_eq!(sanitized_filename("   "), "download");
    }

    #[test]
    fn test_nul_bytes_are_stripped() {
        assert_eq!(sanitized_filename("a\0.txt"), "a.txt");
    }
}
