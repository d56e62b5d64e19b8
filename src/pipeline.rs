//! Region discovery and clipped export
//!
//! The core of the converter: after a page loads, enumerate its embedded
//! images in document order, derive each one's output filename and
//! scale-adjusted clip rectangle, and drive one clipped render per region
//! against the single loaded page.

use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::{ClipRect, Page};

/// Raster extension every output file carries
const RASTER_EXT: &str = ".png";

/// In-page query over every embedded image, in document order. Returns the
/// image's source reference plus its rendered bounding box in viewport
/// coordinates at the page's current zoom.
const DISCOVERY_SCRIPT: &str = r#"(function () {
    var images = document.documentElement.querySelectorAll("img");
    var boxes = [];
    for (var i = 0; i < images.length; i++) {
        var bbox = images[i].getBoundingClientRect();
        boxes.push({
            src: images[i].getAttribute("src"),
            top: bbox.top,
            left: bbox.left,
            width: bbox.width,
            height: bbox.height
        });
    }
    return boxes;
})()"#;

/// One invocation's immutable inputs
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Path or URL of the HTML document to load
    pub source: String,
    /// Existing directory the PNG files are written into
    pub dest: PathBuf,
    /// String inserted immediately before the `.png` extension; may be empty
    pub suffix: String,
    /// Device scale factor applied to every region's geometry
    pub scale: f64,
}

impl ConversionRequest {
    /// Build a request, rejecting non-positive or non-finite scales.
    pub fn new(
        source: impl Into<String>,
        dest: impl Into<PathBuf>,
        suffix: impl Into<String>,
        scale: f64,
    ) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::ConfigError(format!(
                "scale must be a positive number, got {}",
                scale
            )));
        }
        Ok(Self {
            source: source.into(),
            dest: dest.into(),
            suffix: suffix.into(),
            scale,
        })
    }
}

/// One embedded image's render target.
///
/// `output_name` is the image's source reference with its extension replaced
/// by `.png` (suffix inserted before the extension when configured). The
/// geometry is the image's unscaled viewport bounding box multiplied by the
/// request's scale, in output-device pixels. The multiplication happens
/// exactly once, here at derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRegion {
    pub output_name: String,
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl ImageRegion {
    /// Clip rectangle for this region at the given device scale
    pub fn clip(&self, scale: f64) -> ClipRect {
        ClipRect {
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
            scale,
        }
    }
}

/// Shape of one entry returned by [`DISCOVERY_SCRIPT`]
#[derive(Debug, Deserialize)]
struct RawImageBox {
    src: Option<String>,
    top: f64,
    left: f64,
    width: f64,
    height: f64,
}

/// Derive an output filename from an image's source reference.
///
/// The trailing extension of the reference's final path component is replaced
/// by `.png`; a non-empty suffix lands immediately before it. Directory
/// components are preserved, so `img/a.svg` with suffix `@2x` becomes
/// `img/a@2x.png`.
pub fn output_name(reference: &str, suffix: &str) -> String {
    let component_start = reference.rfind('/').map_or(0, |i| i + 1);
    let stem_end = match reference[component_start..].rfind('.') {
        Some(dot) => component_start + dot,
        None => reference.len(),
    };
    format!("{}{}{}", &reference[..stem_end], suffix, RASTER_EXT)
}

/// Measure every embedded image on the loaded page and derive its region.
///
/// Must only be called after [`Page::load`] has returned success; the
/// backend guarantees layout has settled by then. Regions come back in
/// document order. An empty document yields an empty sequence, which is
/// valid. Images with no usable `src` are skipped with a warning.
pub fn discover_regions(
    page: &mut dyn Page,
    suffix: &str,
    scale: f64,
) -> Result<Vec<ImageRegion>> {
    let value = page.evaluate(DISCOVERY_SCRIPT)?;
    let boxes: Vec<RawImageBox> = serde_json::from_value(value)
        .map_err(|e| Error::script_fault(format!("geometry query returned malformed data: {}", e)))?;

    let mut regions = Vec::with_capacity(boxes.len());
    for raw in boxes {
        let src = match raw.src {
            Some(s) if !s.is_empty() => s,
            _ => {
                warn!("skipping an img element with no src attribute");
                continue;
            }
        };
        regions.push(ImageRegion {
            output_name: output_name(&src, suffix),
            top: raw.top * scale,
            left: raw.left * scale,
            width: raw.width * scale,
            height: raw.height * scale,
        });
    }
    Ok(regions)
}

/// Render each region's clip to `dest/output_name`, strictly in order.
///
/// Each render completes before the next clip is set, so no render observes
/// another region's clip state. The first render error propagates out and
/// ends the pipeline; files already written stay on disk.
pub fn export_regions(
    page: &mut dyn Page,
    dest: &Path,
    regions: &[ImageRegion],
    scale: f64,
) -> Result<()> {
    for region in regions {
        let target = dest.join(&region.output_name);
        println!("Rendering to {}", target.display());
        page.render_clip(&region.clip(scale), &target)?;
    }
    Ok(())
}

/// Run the whole pipeline: load, discover, export. Returns the rendered
/// regions so callers can report what was produced.
pub fn convert(page: &mut dyn Page, request: &ConversionRequest) -> Result<Vec<ImageRegion>> {
    page.load(&request.source)?;
    let regions = discover_regions(page, &request.suffix, request.scale)?;
    export_regions(page, &request.dest, &regions, request.scale)?;
    Ok(regions)
}
