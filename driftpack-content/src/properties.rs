//! Key/value descriptor codec.
//!
//! Descriptor files use the classic properties format: ISO-8859-1 text, one
//! `key=value` pair per line, `#`/`!` comment lines, backslash escapes for
//! separators, line breaks, and non-Latin-1 characters. Keys are written
//! sorted and no timestamp header is emitted, so output is deterministic.

use std::collections::BTreeMap;

/// Parses properties text.
///
/// Tolerant by design: lines without a separator or with an empty key are
/// skipped rather than rejected, matching the permissive reader this format
/// traditionally has.
pub fn read(bytes: &[u8]) -> BTreeMap<String, String> {
    let text: String = bytes.iter().map(|&b| b as char).collect();
    let mut properties = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        if let Some((key, value)) = split_pair(line) {
            let key = unescape(&key);
            if !key.is_empty() {
                properties.insert(key, unescape(&value));
            }
        }
    }

    properties
}

/// Serializes properties with sorted keys.
pub fn write(properties: &BTreeMap<String, String>) -> Vec<u8> {
    let mut out = Vec::new();
    for (key, value) in properties {
        push_latin1(&mut out, &escape(key, true));
        out.push(b'=');
        push_latin1(&mut out, &escape(value, false));
        out.push(b'\n');
    }
    out
}

/// Splits a line at the first unescaped `=` or `:`.
fn split_pair(line: &str) -> Option<(String, String)> {
    let mut escaped = false;
    for (index, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '=' | ':' => {
                return Some((
                    line[..index].trim_end().to_string(),
                    line[index + 1..].trim_start().to_string(),
                ));
            }
            _ => {}
        }
    }
    None
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let code: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&code);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '=' => out.push_str("\\="),
            ':' => out.push_str("\\:"),
            ' ' if is_key => out.push_str("\\ "),
            ch if (ch as u32) > 0xFF => {
                out.push_str(&format!("\\u{:04x}", ch as u32));
            }
            ch => out.push(ch),
        }
    }
    out
}

fn push_latin1(out: &mut Vec<u8>, text: &str) {
    // Non-Latin-1 characters were already escaped to \uXXXX.
    out.extend(text.chars().map(|ch| ch as u32 as u8));
}
