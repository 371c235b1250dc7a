//! Element queries over a loaded HTML document
//!
//! Elements are copied out of the parsed document into owned `Element`
//! snapshots, with link-like attributes resolved the way a browser exposes
//! them: `href` and `src` become absolute URLs, and links that can never be
//! followed lose their `href` entirely.

use crate::source::{Element, SourceError, SourceResult};
use crate::url::resolve_href;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Returns every element of `html` matching the CSS selector `locator`
pub fn query_all(html: &str, base_url: &Url, locator: &str) -> SourceResult<Vec<Element>> {
    let selector = parse_selector(locator)?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .map(|element| snapshot(element, base_url))
        .collect())
}

/// Returns the first element of `html` matching the CSS selector `locator`
pub fn query_first(html: &str, base_url: &Url, locator: &str) -> SourceResult<Element> {
    let selector = parse_selector(locator)?;
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .next()
        .map(|element| snapshot(element, base_url))
        .ok_or_else(|| SourceError::NotFound {
            locator: locator.to_string(),
        })
}

fn parse_selector(locator: &str) -> SourceResult<Selector> {
    Selector::parse(locator).map_err(|e| SourceError::InvalidLocator {
        locator: locator.to_string(),
        message: format!("{:?}", e),
    })
}

fn snapshot(element: ElementRef<'_>, base_url: &Url) -> Element {
    let value = element.value();
    let is_download = value.attr("download").is_some();

    let attributes = value
        .attrs()
        .filter_map(|(name, raw)| match name {
            "href" if is_download => None,
            "href" | "src" => resolve_href(raw, base_url).map(|url| (name.to_string(), url)),
            _ => Some((name.to_string(), raw.to_string())),
        })
        .collect();

    Element {
        tag: value.name().to_string(),
        text: collapse_whitespace(&element.text().collect::<String>()),
        attributes,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
