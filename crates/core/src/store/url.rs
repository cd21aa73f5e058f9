//! Document identity keys.

/// Reduce a raw URL to the key documents are stored under.
///
/// Drops everything from the first `#`, then everything from the first `?`
/// of what remains. No parsing is done, so any input is accepted and two
/// URLs that differ only in query or fragment map to the same key.
pub fn normalize(url: &str) -> &str {
    let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
    without_fragment.split_once('?').map_or(without_fragment, |(head, _)| head)
}
