use std::fmt;
use std::io::Cursor;

use image::ImageReader;

/// Pixel size of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Decode just enough of `bytes` to learn the image size.
///
/// Returns `None` for empty input, truncated headers, unsupported codecs
/// (SVG included) or anything else the decoder rejects. Never panics.
pub fn probe_dimensions(bytes: &[u8]) -> Option<Dimensions> {
    if bytes.is_empty() {
        return None;
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;

    Some(Dimensions::new(width, height))
}

/// Optional min/max pixel constraints. A field left as `None` is not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeBounds {
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl SizeBounds {
    /// True when at least one bound is set.
    pub fn is_active(&self) -> bool {
        self.min_width.is_some()
            || self.min_height.is_some()
            || self.max_width.is_some()
            || self.max_height.is_some()
    }

    /// Check a probed size against every set bound (all must hold).
    ///
    /// With no bounds set this passes even for unknown dimensions. With any
    /// bound set, unknown dimensions are rejected since they cannot be verified.
    /// Equality passes on both the min and max side.
    pub fn passes(&self, dimensions: Option<Dimensions>) -> bool {
        if !self.is_active() {
            return true;
        }

        let Some(dims) = dimensions else {
            return false;
        };

        self.min_width.map_or(true, |min| dims.width >= min)
            && self.min_height.map_or(true, |min| dims.height >= min)
            && self.max_width.map_or(true, |max| dims.width <= max)
            && self.max_height.map_or(true, |max| dims.height <= max)
    }

    /// Human-readable requirement for log lines, e.g. `min 800xany`.
    pub fn describe(&self) -> String {
        let part = |v: Option<u32>| v.map_or_else(|| "any".to_string(), |v| v.to_string());

        let mut out = format!("min {}x{}", part(self.min_width), part(self.min_height));
        if self.max_width.is_some() || self.max_height.is_some() {
            out.push_str(&format!(
                ", max {}x{}",
                part(self.max_width),
                part(self.max_height)
            ));
        }
        out
    }
}

#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::new(width, height);
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}
