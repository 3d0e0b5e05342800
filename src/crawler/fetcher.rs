use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::parser;
use super::task::FetchedPage;
use crate::cli::config::CrawlerSettings;

/// Errors for a single fetch. These never reach the frontier.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with status {status}")]
    Status { status: u16 },

    #[error("not an HTML page (content type {content_type})")]
    NotHtml { content_type: String },
}

/// Fetches a page and extracts its outbound links
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// HTTP fetcher backed by a shared reqwest client
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build the client from crawler settings
    pub fn new(settings: &CrawlerSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let target = Url::parse(url)?;

        debug!("Fetching {}", url);

        let response = self.client.get(target).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        // A missing content type is given the benefit of the doubt
        if let Some(content_type) = &content_type {
            if !content_type.contains("html") {
                return Err(FetchError::NotHtml {
                    content_type: content_type.clone(),
                });
            }
        }

        let body = response.text().await?;
        let links = parser::extract_links(&body);

        debug!(links = links.len(), bytes = body.len(), "Fetched {}", url);

        Ok(FetchedPage {
            url: url.to_string(),
            content_type,
            body,
            links,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&CrawlerSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn fetches_body_and_crawlable_links() {
        let server = MockServer::start().await;
        let html = r#"<a href="https://a.test/x">x</a><a href="/local">l</a><a href="http://b.test/">b</a>"#;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"))
            .mount(&server)
            .await;

        let url = format!("{}/index.html", server.uri());
        let page = fetcher().fetch(&url).await.unwrap();

        assert_eq!(page.url, url);
        assert_eq!(page.body, html);
        assert_eq!(page.links, vec!["https://a.test/x".to_string(), "http://b.test/".to_string()]);
        assert!(page.content_type.unwrap().starts_with("text/html"));
    }

    #[tokio::test]
    async fn error_status_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher().fetch(&format!("{}/missing", server.uri())).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404 }));
    }

    #[tokio::test]
    async fn non_html_content_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.7", "application/pdf"))
            .mount(&server)
            .await;

        let err = fetcher().fetch(&format!("{}/doc.pdf", server.uri())).await.unwrap_err();

        assert!(matches!(err, FetchError::NotHtml { content_type } if content_type == "application/pdf"));
    }

    #[tokio::test]
    async fn malformed_url_fails_before_any_request() {
        let err = fetcher().fetch("http://").await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
