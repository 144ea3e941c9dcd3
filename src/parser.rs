use std::collections::HashSet;

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Extensions (lowercase, without the dot) accepted as image URLs.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp"];

/// Pull every downloadable `<img src>` out of `html`.
///
/// Relative sources are resolved against `base_url`. Sources that do not end
/// up as `http`/`https` (`data:`, `javascript:`, `mailto:`...) are dropped, as
/// are paths without a supported image extension. Exact duplicates are removed,
/// keeping document order. Unparseable input yields an empty list.
pub fn extract_image_urls(html: &str, base_url: &str) -> Vec<String> {
    if html.trim().is_empty() {
        return Vec::new();
    }

    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for element in document.select(&selector) {
        let src = match element.value().attr("src").map(str::trim) {
            Some(src) if !src.is_empty() => src,
            _ => {
                debug!("Skipping <img> without src");
                continue;
            }
        };

        let resolved = match &base {
            Some(base) => base.join(src),
            None => Url::parse(src),
        };
        let Ok(absolute) = resolved else {
            debug!("Skipping unresolvable image source: {}", src);
            continue;
        };

        if !matches!(absolute.scheme(), "http" | "https") {
            debug!("Skipping non-fetchable image source: {}", truncate(src));
            continue;
        }

        if !has_image_extension(&absolute) {
            debug!("Skipping source without image extension: {}", absolute);
            continue;
        }

        let absolute = absolute.to_string();
        if seen.insert(absolute.clone()) {
            urls.push(absolute);
        }
    }

    urls
}

fn has_image_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    let file = path.rsplit('/').next().unwrap_or("");
    match file.rsplit_once('.') {
        Some((_, ext)) => SUPPORTED_EXTENSIONS.contains(&ext),
        None => false,
    }
}

// data: URIs can be huge
fn truncate(s: &str) -> &str {
    match s.char_indices().nth(64) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
