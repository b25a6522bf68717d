//! Filesystem-safe names for exported files.

use driftpack_types::DocRef;

/// Longest sanitized name emitted for any path segment or file prefix.
pub const MAX_FILE_NAME_LENGTH: usize = 100;

/// Makes a document name safe to use on any filesystem: characters outside
/// `[A-Za-z0-9 _.-]` become `_`, and the result is capped at `max`
/// characters. The replacement is stable, so exporting and re-importing a
/// document lands on the same prefix.
#[must_use]
pub fn to_safe_file_name(name: &str, max: usize) -> String {
    name.chars()
        .map(|ch| match ch {
            'A'..='Z' | 'a'..='z' | '0'..='9' | ' ' | '_' | '.' | '-' => ch,
            _ => '_',
        })
        .take(max)
        .collect()
}

/// The filename prefix shared by a document's descriptor and companion
/// files: `safe-name.type.uuid`.
#[must_use]
pub fn file_prefix(doc_ref: &DocRef) -> String {
    format!(
        "{}.{}.{}",
        to_safe_file_name(doc_ref.name_or_uuid(), MAX_FILE_NAME_LENGTH),
        doc_ref.doc_type,
        doc_ref.uuid
    )
}
