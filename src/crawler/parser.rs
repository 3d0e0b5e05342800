use scraper::{Html, Selector};
use tracing::warn;

use super::admission;

/// Extract the crawlable outbound links of an HTML document, in document order.
///
/// Relative hrefs are dropped rather than resolved against the page URL.
pub fn extract_links(html: &str) -> Vec<String> {
    let selector = match Selector::parse("a") {
        Ok(selector) => selector,
        Err(e) => {
            warn!("Invalid anchor selector: {:?}", e);
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    let hrefs = document
        .select(&selector)
        .map(|element| element.value().attr("href"));

    admission::crawlable(hrefs).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links_keeps_absolute_http_links_in_order() {
        let html = r#"
            <html><body>
              <a href="https://b.com/second">b</a>
              <a>no href</a>
              <a href="">empty</a>
              <a href="/relative">relative</a>
              <a href="ftp://files.example.com">ftp</a>
              <a href="http://a.com/first">a</a>
              <a href="https://b.com/second">again</a>
            </body></html>
        "#;

        assert_eq!(
            extract_links(html),
            vec![
                "https://b.com/second".to_string(),
                "http://a.com/first".to_string(),
                "https://b.com/second".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_links_from_page_without_anchors() {
        assert!(extract_links("<p>nothing to follow</p>").is_empty());
    }
}
