//! Content fingerprinting for duplicate detection.

/// Fast 32-bit rolling hash of `content` as 8 hex digits.
///
/// Not collision resistant. Only used to spot repeated payloads; never use it
/// for anything security relevant, use [`hash`](crate::service::hash) there.
#[must_use]
pub fn fingerprint(content: &str) -> String {
    let h = content
        .bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)));
    format!("{h:08x}")
}
