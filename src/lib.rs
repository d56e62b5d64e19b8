//! svgclip
//!
//! Exports every SVG image embedded in an HTML document as an individually
//! clipped PNG file. The document is loaded in a headless browser, each
//! embedded image's rendered bounding box is measured in the page's own
//! execution context, and the exact region is rasterized to a PNG named after
//! the image's source reference.
//!
//! # Features
//!
//! - **CDP Backend** (default): drives headless Chrome via the Chrome
//!   DevTools Protocol
//! - **Trait seam**: the pipeline talks to the browser through the [`Page`]
//!   trait, so tests run against a mock and backends stay swappable
//!
//! # Example
//!
//! ```no_run
//! use svgclip::{ConversionRequest, PageConfig};
//!
//! # fn main() -> svgclip::Result<()> {
//! let request = ConversionRequest::new("page.html", "out", "@2x", 2.0)?;
//! let mut page = svgclip::new_page(PageConfig::default())?;
//! let regions = svgclip::convert(&mut page, &request)?;
//! println!("rendered {} images", regions.len());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

pub mod error;
pub use error::{Error, Result, StackFrame};

#[cfg(feature = "cdp")]
pub mod cdp;

pub mod pipeline;
pub use pipeline::{convert, discover_regions, export_regions, ConversionRequest, ImageRegion};

/// Configuration for the page backend
///
/// Defaults are conservative: a desktop-sized viewport, a 30 second bound on
/// page load, and a 500 ms settling delay between load completion and
/// geometry measurement. The delay exists because the load event fires once
/// resources are fetched, while layout of embedded vector images may still be
/// in flight; measuring too early yields unstable bounding boxes.
#[derive(Debug, Clone)]
pub struct PageConfig {
    /// Viewport dimensions
    pub viewport: Viewport,
    /// Upper bound on page load in milliseconds; expiry is a load failure
    pub load_timeout_ms: u64,
    /// Delay between load completion and geometry measurement, in milliseconds
    pub settle_ms: u64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            load_timeout_ms: 30000,
            settle_ms: 500,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// A clip rectangle in output-device pixels, plus the device scale that
/// produced it.
///
/// `left`/`top`/`width`/`height` are the region's unscaled viewport bounding
/// box multiplied by `scale`. Backends that clip in CSS pixels divide the
/// rectangle back by `scale` and apply the scale on the render side, so the
/// output resolution matches the device-pixel rectangle without applying the
/// scale twice.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

/// Core trait for page backends
///
/// This is the seam between the conversion pipeline and the rendering
/// engine. The pipeline needs exactly three capabilities: load a document and
/// learn whether it succeeded, evaluate a script inside the document, and
/// render a rectangular clip of the current page to a file.
pub trait Page {
    /// Load a document and wait for it to reach a stable rendered state.
    ///
    /// Returns `Err(Error::LoadFailed)` if the document does not reach a
    /// successful loaded state within the configured bound. Implementations
    /// must not return before the settle point: geometry measured after a
    /// successful `load` has to reflect finished layout.
    fn load(&mut self, source: &str) -> Result<()>;

    /// Evaluate a script in the page's own execution context and return its
    /// result as a JSON value. A thrown in-page error surfaces as
    /// `Error::ScriptFault` carrying whatever stack the engine reported.
    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Render the given clip of the current page to a PNG file at `path`.
    /// Synchronous: the file is fully written when this returns.
    fn render_clip(&mut self, clip: &ClipRect, path: &Path) -> Result<()>;

    /// Close the page and clean up backend resources
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Create a page backed by the default rendering engine (headless Chrome).
#[cfg(feature = "cdp")]
pub fn new_page(config: PageConfig) -> Result<impl Page> {
    cdp::CdpPage::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PageConfig::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 720);
        assert_eq!(config.load_timeout_ms, 30000);
        assert_eq!(config.settle_ms, 500);
    }

    #[test]
    fn test_viewport() {
        let viewport = Viewport {
            width: 1920,
            height: 1080,
        };
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
    }
}
