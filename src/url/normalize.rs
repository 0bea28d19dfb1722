use crate::UrlError;
use url::Url;

/// Resolves a link found on a directory page to an absolute URL
///
/// # Resolution Steps
///
/// 1. Trim whitespace; reject empty links
/// 2. Repair a base URL glued in front of an already absolute link
///    (`https://hosthttps://host/x` becomes `https://host/x`)
/// 3. Join relative links onto the base URL
/// 4. Require an http or https scheme and a host
/// 5. Drop the fragment
///
/// # Examples
///
/// ```
/// use dir_harvest::url::absolutize;
/// use url::Url;
///
/// let base = Url::parse("https://www.construction.co.uk").unwrap();
/// let url = absolutize(&base, "/builders/").unwrap();
/// assert_eq!(url.as_str(), "https://www.construction.co.uk/builders/");
/// ```
pub fn absolutize(base: &Url, link: &str) -> Result<Url, UrlError> {
    let link = link.trim();
    if link.is_empty() {
        return Err(UrlError::Parse("empty link".to_string()));
    }

    let link = repair_double_prefix(link);

    let mut url = base
        .join(link)
        .map_err(|e| UrlError::Parse(format!("{}: {}", link, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Drops a base URL glued directly in front of a second scheme
fn repair_double_prefix(link: &str) -> &str {
    let Some(scheme_end) = link.find("://") else {
        return link;
    };
    let rest_start = scheme_end + 3;
    let authority_len = link[rest_start..]
        .find(['/', '?', '#'])
        .unwrap_or(link.len() - rest_start);
    let authority = &link[rest_start..rest_start + authority_len];

    for scheme in ["https:", "http:"] {
        if authority.len() > scheme.len() && authority.ends_with(scheme) {
            return &link[rest_start + authority_len - scheme.len()..];
        }
    }
    link
}

/// Builds the URL of one listing page of a batch
///
/// Page 1 is the batch URL itself; later pages carry the page number in
/// `page_param`.
pub fn page_url(batch_url: &str, page_param: &str, page_number: u32) -> String {
    if page_number <= 1 {
        return batch_url.to_string();
    }

    let separator = if batch_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", batch_url, separator, page_param, page_number)
}
