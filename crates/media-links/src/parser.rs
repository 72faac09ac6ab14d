use crate::link::{MediaHost, MediaLink};

/// Extracts direct media links for a single host from arbitrary HTML or text.
///
/// Implementations are pure: no I/O, no interior mutability. Input without a
/// match yields an empty vector.
pub trait MediaLinkParser: Send + Sync {
    fn host(&self) -> MediaHost;

    fn extract(&self, text: &str) -> Vec<MediaLink>;
}
