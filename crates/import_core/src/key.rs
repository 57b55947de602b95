use std::fmt;

/// Identity used to decide whether two import requests are "the same".
///
/// Built from the trimmed, lower-cased url followed by the user id. Only this
/// normalization decides deduplication; the raw payload sent to the queue is
/// not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalRequestKey(String);

impl LogicalRequestKey {
    pub fn new(url: &str, user_id: &str) -> Self {
        let mut key = url.trim().to_lowercase();
        key.push_str(user_id);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalRequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
