//! Slash-delimited tree paths.
//!
//! Descriptor files record a document's location as the slash-joined names
//! of its ancestor folders, with no leading slash. These helpers keep that
//! convention in one place.

/// Joins a child segment onto a parent path, tolerating an empty parent.
#[must_use]
pub fn append_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}/{child}")
    }
}

/// Splits a path into its non-empty segments.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
