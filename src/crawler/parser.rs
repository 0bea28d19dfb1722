//! HTML parser for directory pages
//!
//! This module extracts from the three page kinds of the directory:
//! - Batch links from the directory root
//! - Company detail links from a listing page
//! - Company name and email from a detail page, decoding obfuscated emails

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Name and email found on a company detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyDetails {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Site-specific extraction rules
///
/// Links are returned exactly as they appear in the markup; the frontier
/// resolves them against the base URL.
pub trait DirectoryParser: Send + Sync {
    /// Links to the top-level batches on the directory root page
    fn batch_links(&self, html: &str) -> Vec<String>;

    /// Links to company detail pages on one listing page
    fn company_links(&self, html: &str) -> Vec<String>;

    /// Company fields on a detail page; absent fields are `None`
    fn company_details(&self, html: &str) -> CompanyDetails;
}

/// Extraction rules for the construction.co.uk directory layout
#[derive(Debug, Clone, Default)]
pub struct ConstructionDirectoryParser;

impl ConstructionDirectoryParser {
    pub fn new() -> Self {
        Self
    }
}

impl DirectoryParser for ConstructionDirectoryParser {
    fn batch_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let (Some(batch_div), Some(anchor)) = (
            selector("div.col-md-4.d-flex.no-wrap.align-items-center"),
            selector("a[href]"),
        ) else {
            return Vec::new();
        };

        document
            .select(&batch_div)
            .filter_map(|div| first_href(div, &anchor))
            .collect()
    }

    fn company_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let (Some(block), Some(listing_anchor)) = (
            selector("div.col.companyListButtons"),
            selector("div.companyListListingLink a[href]"),
        ) else {
            return Vec::new();
        };

        document
            .select(&block)
            .filter_map(|b| first_href(b, &listing_anchor))
            .collect()
    }

    fn company_details(&self, html: &str) -> CompanyDetails {
        let document = Html::parse_document(html);
        CompanyDetails {
            name: extract_name(&document),
            email: extract_email(&document),
        }
    }
}

/// Decodes an email hidden in an `emrp('...')` script call
///
/// `'/'` becomes `'.'`, `'A'` becomes `'@'`, every other character is
/// shifted one codepoint down.
///
/// # Example
///
/// ```
/// use dir_harvest::crawler::decode_obfuscated_email;
///
/// assert_eq!(decode_obfuscated_email("uftu/dpn"), "test.com");
/// ```
pub fn decode_obfuscated_email(encoded: &str) -> String {
    encoded
        .chars()
        .map(|c| match c {
            '/' => '.',
            'A' => '@',
            other => (other as u32)
                .checked_sub(1)
                .and_then(char::from_u32)
                .unwrap_or(other),
        })
        .collect()
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn first_href(element: ElementRef<'_>, anchor: &Selector) -> Option<String> {
    element
        .select(anchor)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn extract_name(document: &Html) -> Option<String> {
    let title = selector("h2.listingTitle span")?;
    document
        .select(&title)
        .next()
        .map(|span| span.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
}

fn extract_email(document: &Html) -> Option<String> {
    let email_span = selector("span#cphMain_lblCLEmail")?;
    let span = document.select(&email_span).next()?;

    if let Some(mailto) = selector("a[href]").and_then(|a| {
        span.select(&a)
            .filter_map(|el| el.value().attr("href"))
            .find(|href| href.starts_with("mailto:"))
    }) {
        let address = mailto
            .trim_start_matches("mailto:")
            .split('?')
            .next()
            .unwrap_or_default()
            .trim();
        if !address.is_empty() {
            return Some(address.to_string());
        }
    }

    let script = selector("script")?;
    span.select(&script).find_map(|s| {
        let code = s.text().collect::<String>();
        emrp_pattern()?
            .captures(&code)
            .and_then(|caps| caps.get(1))
            .map(|m| decode_obfuscated_email(m.as_str()))
    })
}

fn emrp_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"emrp\('([^']+)'").ok())
        .as_ref()
}
