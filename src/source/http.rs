//! Page source backed by plain HTTP fetches
//!
//! Pages are fetched once per navigation and kept as HTML text; every query
//! re-parses the document. Static documents never grow, so the scroll-height
//! probe reports the document length and scrolling is a no-op.

use crate::source::{
    fetch_page, query_all, query_first, Element, PageSource, PageSourceFactory, SourceError,
    SourceResult, SCROLL_HEIGHT_SCRIPT, SCROLL_TO_END_SCRIPT,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

#[derive(Debug)]
struct LoadedPage {
    url: Url,
    html: String,
}

/// Page source that loads pages with `reqwest` and queries them with CSS selectors
#[derive(Debug)]
pub struct HttpPageSource {
    client: Client,
    current: Option<LoadedPage>,
}

impl HttpPageSource {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            current: None,
        }
    }

    fn page(&self) -> SourceResult<&LoadedPage> {
        self.current.as_ref().ok_or(SourceError::NoPage)
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn navigate(&mut self, url: &str) -> SourceResult<()> {
        self.current = None;
        let fetched = fetch_page(&self.client, url).await?;

        let final_url = Url::parse(&fetched.final_url).map_err(|e| SourceError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(
            "Loaded {} ({} bytes, HTTP {})",
            final_url,
            fetched.body.len(),
            fetched.status_code
        );

        self.current = Some(LoadedPage {
            url: final_url,
            html: fetched.body,
        });
        Ok(())
    }

    async fn find_first(&self, locator: &str) -> SourceResult<Element> {
        let page = self.page()?;
        query_first(&page.html, &page.url, locator)
    }

    async fn find_all(&self, locator: &str) -> SourceResult<Vec<Element>> {
        let page = self.page()?;
        query_all(&page.html, &page.url, locator)
    }

    async fn evaluate_script(&mut self, script: &str) -> SourceResult<Value> {
        let page = self.page()?;
        match script {
            SCROLL_HEIGHT_SCRIPT => Ok(Value::from(page.html.len() as u64)),
            SCROLL_TO_END_SCRIPT => Ok(Value::Null),
            other => Err(SourceError::Script(format!("Unsupported script: {}", other))),
        }
    }

    fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|page| page.url.as_str())
    }

    async fn close(&mut self) -> SourceResult<()> {
        self.current = None;
        Ok(())
    }
}

/// Opens `HttpPageSource`s sharing one connection pool
#[derive(Debug, Clone)]
pub struct HttpSourceFactory {
    client: Client,
}

impl HttpSourceFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl PageSourceFactory for HttpSourceFactory {
    fn open(&self) -> SourceResult<Box<dyn PageSource>> {
        Ok(Box::new(HttpPageSource::new(self.client.clone())))
    }
}
