//! Scheme check applied to every URL before it can reach the frontier.

/// Schemes the crawler is willing to fetch
const CRAWLABLE_SCHEMES: [&str; 2] = ["http://", "https://"];

/// A URL is crawlable when it is non-empty and starts with an approved scheme.
pub fn is_crawlable(url: &str) -> bool {
    !url.is_empty() && CRAWLABLE_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
}

/// Keep the crawlable entries of a sequence of optional hrefs, in order.
///
/// `None` stands for an anchor without an `href` attribute.
pub fn crawlable<'a, I>(hrefs: I) -> impl Iterator<Item = &'a str>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    hrefs
        .into_iter()
        .flatten()
        .filter(|href| is_crawlable(href))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_crawlable() {
        assert!(is_crawlable("http://example.com"));
        assert!(is_crawlable("https://example.com/page?q=1"));

        assert!(!is_crawlable(""));
        assert!(!is_crawlable("ftp://example.com"));
        assert!(!is_crawlable("/relative/path"));
        assert!(!is_crawlable("mailto:someone@example.com"));
        // Prefix match only, no case folding
        assert!(!is_crawlable("HTTP://example.com"));
    }

    #[test]
    fn test_crawlable_filters_mixed_hrefs() {
        let hrefs = vec![
            Some(""),
            None,
            Some("ftp://x"),
            Some("/relative"),
            Some("http://a.com"),
            Some("https://b.com"),
        ];

        let kept: Vec<&str> = crawlable(hrefs).collect();

        assert_eq!(kept, vec!["http://a.com", "https://b.com"]);
    }
}
