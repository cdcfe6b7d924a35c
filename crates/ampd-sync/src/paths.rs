//! Directory arithmetic on slash-delimited library paths.
//!
//! Browse paths travel percent-encoded.  `parent_of` and `browse_parent_of`
//! split on literal `/`, decode each segment, drop the last one and re-encode
//! what is left, so their output is in the same form as their input and can
//! be fed back in.  An encoded `/` (`%2F`) stays inside its segment.
//!
//! Two notions of "top" are kept apart on purpose: going up from a track's
//! directory ends at `""`, going up in the browse view ends at `"/"`.

use std::borrow::Cow;

fn decode_segment(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

fn drop_last_segment(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').collect();
    while matches!(segments.last(), Some(s) if s.is_empty()) {
        segments.pop();
    }
    segments.pop();
    segments
        .into_iter()
        .map(|segment| urlencoding::encode(&decode_segment(segment)).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parent of `path`; the library root is `""`.
pub fn parent_of(path: &str) -> String {
    drop_last_segment(path)
}

/// Parent of a browsed directory; the browse root is `"/"`.
pub fn browse_parent_of(dir: &str) -> String {
    let parent = drop_last_segment(dir);
    if parent.is_empty() {
        "/".to_string()
    } else {
        parent
    }
}

/// Directory part of a file path, `""` when the file sits at the root.
///
/// The path is split as given: library file names are not encoded, and an
/// encoded path keeps its encoding.
pub fn directory_of(file_path: &str) -> String {
    match file_path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}

/// Percent-encode every segment, keeping `/` as the separator.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// The backend addresses directories relative to the library root.
pub fn relative_to_root(dir: &str) -> &str {
    dir.strip_prefix('/').unwrap_or(dir)
}
