use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use tracing::{debug, info, warn};
use url::Url;

use crate::dimensions::{probe_dimensions, Dimensions};
use crate::error::{FetchError, RequestFailure};
use crate::source::{CapturedImage, PageRenderer};
use crate::storage::split_name;

/// Screenshots are always PNG, so every saved name ends up `.png`.
const CAPTURE_EXTENSION: &str = ".png";

/// True once the document and every `<img>` in it have finished loading.
const IMAGES_SETTLED_JS: &str = "document.readyState === 'complete' && \
    Array.from(document.images).every(img => img.complete)";

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Upper bound on the post-load wait, on top of navigation.
const SETTLE_MAX_WAIT: Duration = Duration::from_secs(5);

/// The parts of a rendered `<img>` element the capture loop needs.
pub trait ImageElement {
    fn attribute(&self, name: &str) -> Result<Option<String>>;
    fn screenshot_png(&self) -> Result<Vec<u8>>;
}

impl ImageElement for Element<'_> {
    fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.get_attribute_value(name)
    }

    fn screenshot_png(&self) -> Result<Vec<u8>> {
        self.capture_screenshot(CaptureScreenshotFormatOption::Png)
    }
}

/// Rendered-mode acquisition via headless Chrome.
///
/// The browser is launched per call and dropped (closing it) on return.
pub struct ChromeRenderer {
    timeout: Duration,
}

impl ChromeRenderer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn launch(&self) -> Result<Browser> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .idle_browser_timeout(self.timeout.max(Duration::from_secs(30)))
            .build()
            .map_err(|e| anyhow!("invalid launch options: {}", e))?;
        Browser::new(options)
    }
}

impl PageRenderer for ChromeRenderer {
    fn capture_images(&self, url: &str) -> Result<Vec<CapturedImage>, FetchError> {
        let render_err = |e: anyhow::Error| FetchError::new(url, RequestFailure::Render(e.to_string()));

        let browser = self.launch().map_err(render_err)?;
        let tab = browser.new_tab().map_err(render_err)?;
        tab.set_default_timeout(self.timeout);

        tab.navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(render_err)?;
        wait_for_images(&tab, self.timeout.min(SETTLE_MAX_WAIT));

        let elements = match tab.find_elements("img") {
            Ok(elements) => elements,
            Err(e) => {
                debug!("No image elements found: {}", e);
                Vec::new()
            }
        };
        info!("Found {} image elements on page", elements.len());

        let base = Url::parse(url).ok();
        Ok(capture_all(&elements, base.as_ref()))
    }
}

/// Poll until the page's images have loaded or `max_wait` runs out.
fn wait_for_images(tab: &Tab, max_wait: Duration) {
    let settled = poll_until(max_wait, SETTLE_POLL_INTERVAL, || {
        let result = tab.evaluate(IMAGES_SETTLED_JS, false)?;
        Ok(result.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false))
    });
    if !settled {
        debug!("Images still loading after {:?}, capturing anyway", max_wait);
    }
}

/// Call `check` every `interval` until it yields `true` or `max_wait` has
/// passed. Errors from `check` count as "not yet".
fn poll_until(
    max_wait: Duration,
    interval: Duration,
    mut check: impl FnMut() -> Result<bool>,
) -> bool {
    let deadline = Instant::now() + max_wait;
    loop {
        match check() {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => debug!("Load check failed: {}", e),
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(interval);
    }
}

/// Capture every element in order, numbering them from 1.
///
/// Elements without a `src` are skipped quietly. An element whose capture
/// fails is logged and left out; the rest are still captured.
fn capture_all<E: ImageElement>(elements: &[E], base: Option<&Url>) -> Vec<CapturedImage> {
    let total = elements.len();
    let mut captured = Vec::with_capacity(total);

    for (i, element) in elements.iter().enumerate() {
        let index = i + 1;
        match capture_element(element, index, base) {
            Ok(Some(image)) => {
                debug!(
                    "Captured image {}/{}: {} ({})",
                    index,
                    total,
                    image.source_url,
                    image
                        .dimensions
                        .map_or_else(|| "unknown size".to_string(), |d| d.to_string())
                );
                captured.push(image);
            }
            Ok(None) => debug!("Image {}: no src attribute, skipping", index),
            Err(e) => warn!("Failed to capture image {}: {}", index, e),
        }
    }

    captured
}

fn capture_element<E: ImageElement>(
    element: &E,
    index: usize,
    base: Option<&Url>,
) -> Result<Option<CapturedImage>> {
    let src = match element.attribute("src")? {
        Some(src) if !src.trim().is_empty() => src.trim().to_string(),
        _ => return Ok(None),
    };

    let bytes = element.screenshot_png()?;

    let declared = declared_dimensions(
        element.attribute("width")?.as_deref(),
        element.attribute("height")?.as_deref(),
    );
    let dimensions = match declared {
        Some(dims) => dims,
        None => probe_dimensions(&bytes)
            .ok_or_else(|| anyhow!("could not decode screenshot of {}", src))?,
    };

    let resolved = resolve_source(&src, base);
    let filename = capture_filename(resolved.as_ref(), index);

    Ok(Some(CapturedImage {
        source_url: resolved.map_or(src, |u| u.to_string()),
        bytes,
        dimensions: Some(dimensions),
        filename,
    }))
}

/// Size from the element's `width`/`height` attributes, only when both are
/// present and numeric. Takes precedence over the captured raster size.
pub fn declared_dimensions(width: Option<&str>, height: Option<&str>) -> Option<Dimensions> {
    let width = width?.trim().parse().ok()?;
    let height = height?.trim().parse().ok()?;
    Some(Dimensions::new(width, height))
}

fn resolve_source(src: &str, base: Option<&Url>) -> Option<Url> {
    match base {
        Some(base) => base.join(src).ok(),
        None => Url::parse(src).ok(),
    }
}

/// Stem of the source path's last segment with a `.png` extension, or
/// `image_{index}.png` when the source has no usable path.
pub fn capture_filename(source: Option<&Url>, index: usize) -> String {
    let segment = source
        .filter(|u| matches!(u.scheme(), "http" | "https" | "file"))
        .and_then(|u| u.path_segments()?.next_back().map(str::to_string))
        .filter(|s| !s.is_empty());

    match segment {
        Some(name) => {
            let (stem, _) = split_name(&name);
            format!("{stem}{CAPTURE_EXTENSION}")
        }
        None => format!("image_{index}{CAPTURE_EXTENSION}"),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;

    use super::*;
    use crate::dimensions::encode_png;

    /// In-memory element: fixed attributes and either PNG bytes or a failure.
    struct FakeElement {
        attrs: HashMap<&'static str, &'static str>,
        screenshot: Option<Vec<u8>>,
    }

    impl FakeElement {
        fn new(attrs: &[(&'static str, &'static str)], screenshot: Option<Vec<u8>>) -> Self {
            Self {
                attrs: attrs.iter().copied().collect(),
                screenshot,
            }
        }
    }

    impl ImageElement for FakeElement {
        fn attribute(&self, name: &str) -> Result<Option<String>> {
            Ok(self.attrs.get(name).map(|v| v.to_string()))
        }

        fn screenshot_png(&self) -> Result<Vec<u8>> {
            self.screenshot
                .clone()
                .ok_or_else(|| anyhow!("node is detached from document"))
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn one_bad_element_does_not_stop_the_rest() {
        let base = url("https://example.com/gallery/");
        let elements = vec![
            FakeElement::new(&[("src", "first.jpg")], Some(encode_png(40, 30))),
            FakeElement::new(&[("src", "broken.jpg")], None),
            FakeElement::new(&[("alt", "no source")], Some(encode_png(5, 5))),
            FakeElement::new(&[("src", " ")], Some(encode_png(5, 5))),
            FakeElement::new(
                &[("src", "/"), ("width", "200"), ("height", "100")],
                Some(encode_png(8, 8)),
            ),
        ];

        let captured = capture_all(&elements, Some(&base));

        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].source_url, "https://example.com/gallery/first.jpg");
        assert_eq!(captured[0].filename, "first.png");
        assert_eq!(captured[0].dimensions, Some(Dimensions::new(40, 30)));
        // numbering follows element position, not capture count
        assert_eq!(captured[1].filename, "image_5.png");
        assert_eq!(captured[1].dimensions, Some(Dimensions::new(200, 100)));
    }

    #[test]
    fn undecodable_screenshot_without_declared_size_is_dropped() {
        let elements = vec![
            FakeElement::new(&[("src", "https://example.com/a.png")], Some(b"garbage".to_vec())),
            FakeElement::new(
                &[("src", "https://example.com/b.png"), ("width", "10"), ("height", "20")],
                Some(b"garbage".to_vec()),
            ),
        ];

        let captured = capture_all(&elements, None);

        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].filename, "b.png");
        assert_eq!(captured[0].dimensions, Some(Dimensions::new(10, 20)));
    }

    #[test]
    fn empty_page_captures_nothing() {
        assert!(capture_all::<FakeElement>(&[], None).is_empty());
    }

    #[test]
    fn polling_stops_as_soon_as_the_check_passes() {
        let calls = Cell::new(0);
        let settled = poll_until(Duration::from_secs(5), Duration::from_millis(1), || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                return Err(anyhow!("context not ready"));
            }
            Ok(calls.get() >= 3)
        });

        assert!(settled);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn polling_gives_up_at_the_deadline() {
        let start = Instant::now();
        let settled = poll_until(Duration::from_millis(30), Duration::from_millis(5), || Ok(false));

        assert!(!settled);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn declared_size_needs_both_numeric_attributes() {
        assert_eq!(
            declared_dimensions(Some("200"), Some(" 300 ")),
            Some(Dimensions::new(200, 300))
        );
        assert_eq!(declared_dimensions(Some("200"), None), None);
        assert_eq!(declared_dimensions(None, Some("300")), None);
        assert_eq!(declared_dimensions(Some("100%"), Some("300")), None);
        assert_eq!(declared_dimensions(Some("-5"), Some("300")), None);
    }

    #[test]
    fn filenames_are_forced_to_png() {
        assert_eq!(
            capture_filename(Some(&url("https://example.com/img/photo.jpg")), 1),
            "photo.png"
        );
        assert_eq!(
            capture_filename(Some(&url("https://example.com/a/archive.tar.gz?x=1")), 1),
            "archive.tar.png"
        );
        assert_eq!(
            capture_filename(Some(&url("https://example.com/img/noext")), 1),
            "noext.png"
        );
    }

    #[test]
    fn filenames_fall_back_to_index() {
        assert_eq!(capture_filename(Some(&url("https://example.com/")), 4), "image_4.png");
        assert_eq!(
            capture_filename(Some(&url("data:image/png;base64,AAAA")), 2),
            "image_2.png"
        );
        assert_eq!(capture_filename(None, 7), "image_7.png");
    }

    #[test]
    fn relative_sources_resolve_against_page() {
        let base = url("https://example.com/gallery/index.html");
        let resolved = resolve_source("thumbs/cat.webp", Some(&base)).unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/gallery/thumbs/cat.webp");
        assert_eq!(capture_filename(Some(&resolved), 1), "cat.png");
    }
}
