//! JSON Pointer (RFC 6901) helpers.
//!
//! The builder uses pointers twice: to name the schema node an error is about,
//! and to resolve `$ref` fragments such as `#/definitions/Address`.
//! Segments are `/`-separated, with `~` escaped as `~0` and `/` escaped as `~1`.

/// Appends a segment to a JSON Pointer path, applying RFC 6901 escaping.
pub fn push_segment(path: &mut String, segment: &str) {
    path.push('/');
    for c in segment.chars() {
        match c {
            '~' => path.push_str("~0"),
            '/' => path.push_str("~1"),
            other => path.push(other),
        }
    }
}

/// Returns `path` extended by `segment`.
#[must_use]
pub fn format(path: &str, segment: &str) -> String {
    let mut result: String = path.to_string();
    push_segment(&mut result, segment);
    result
}

/// Splits a pointer into unescaped segments.
///
/// Returns `None` when the pointer is neither empty nor starts with `/`.
/// The empty pointer addresses the whole document and has no segments.
#[must_use]
pub fn segments(pointer: &str) -> Option<Vec<String>> {
    if pointer.is_empty() {
        return Some(Vec::new());
    }
    let rest: &str = pointer.strip_prefix('/')?;
    Some(rest.split('/').map(unescape).collect())
}

fn unescape(segment: &str) -> String {
    // RFC 6901 order: `~1` before `~0`, so `~01` decodes to `~1`.
    segment.replace("~1", "/").replace("~0", "~")
}
