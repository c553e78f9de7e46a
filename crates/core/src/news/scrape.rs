use regex::Regex;
use reqwest::{header, Client, StatusCode, Url};
use std::sync::LazyLock;

static COMMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static META_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").unwrap());

static ATTR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// Attributes of every `<meta>` tag outside HTML comments, lowercased names.
fn meta_tags(html: &str) -> Vec<Vec<(String, String)>> {
    let html = COMMENT_REGEX.replace_all(html, "");
    META_REGEX
        .find_iter(&html)
        .map(|tag| {
            ATTR_REGEX
                .captures_iter(tag.as_str())
                .map(|caps| {
                    let value = caps
                        .get(2)
                        .or_else(|| caps.get(3))
                        .or_else(|| caps.get(4))
                        .map(|m| m.as_str())
                        .unwrap_or_default();
                    (caps[1].to_ascii_lowercase(), value.to_string())
                })
                .collect()
        })
        .collect()
}

/// `content` of the first meta tag whose `property` or `name` equals `key`.
fn meta_content(tags: &[Vec<(String, String)>], key: &str) -> Option<String> {
    tags.iter().find_map(|attrs| {
        let matches = attrs
            .iter()
            .any(|(name, value)| (name == "property" || name == "name") && value.eq_ignore_ascii_case(key));
        if !matches {
            return None;
        }
        attrs
            .iter()
            .find(|(name, _)| name == "content")
            .map(|(_, value)| super::text::unescape_html(value.trim()))
            .filter(|v| !v.is_empty())
    })
}

/// Preview image declared by a page: `og:image`, else `twitter:image`,
/// resolved against `page_url`.
pub fn find_preview_image(html: &str, page_url: &str) -> Option<String> {
    let tags = meta_tags(html);
    let content = meta_content(&tags, "og:image").or_else(|| meta_content(&tags, "twitter:image"))?;

    match Url::parse(page_url) {
        Ok(base) => base.join(&content).ok().map(String::from),
        Err(_) => Some(content),
    }
}

/// Fetch an article page and look for its preview image.
///
/// Anything but a 200 `text/html` answer, or any transport error, yields `None`.
pub async fn scrape_preview_image(client: &Client, page_url: &str) -> Option<String> {
    let resp = match client.get(page_url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::debug!(url = page_url, error = %e, "Preview image fetch failed");
            return None;
        }
    };
    if resp.status() != StatusCode::OK {
        return None;
    }
    let is_html = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("text/html"));
    if !is_html {
        return None;
    }

    let body = resp.text().await.ok()?;
    find_preview_image(&body, page_url)
}
