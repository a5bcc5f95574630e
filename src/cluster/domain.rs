// Domain extraction for search result URLs.
//
// A URL is split on '/' and the third segment is taken as the domain:
// "https://example.com/page" -> ["https:", "", "example.com", "page"].
// No scheme validation is done; ports and credentials stay part of the domain.

use crate::error::MalformedUrlError;

/// Return the host segment of `url`.
pub fn extract_domain(url: &str) -> Result<&str, MalformedUrlError> {
    url.split('/').nth(2).ok_or_else(|| MalformedUrlError {
        url: url.to_string(),
    })
}

/// Like [`extract_domain`], but an empty host (e.g. `"file:///tmp"`) is
/// also rejected, since it cannot be a ranking domain.
pub fn extract_nonempty_domain(url: &str) -> Result<&str, MalformedUrlError> {
    match extract_domain(url)? {
        "" => Err(MalformedUrlError {
            url: url.to_string(),
        }),
        domain => Ok(domain),
    }
}
