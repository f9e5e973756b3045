//! Selection-region geometry: drag normalization, scale-to-fit image
//! placement, and the display-to-image-pixel mapping that scopes OCR to a
//! user-selected area.

use serde::{Deserialize, Serialize};

/// Selections narrower or shorter than this (in display units) are discarded.
pub const MIN_SELECTION_SPAN: f64 = 10.0;

/// A rectangle in surface display coordinates. Width/height may be negative
/// until [`SelectionRegion::normalized`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRegion {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SelectionRegion {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Build a region from a drag gesture. The end point may lie above or
    /// left of the start, producing negative dimensions.
    pub fn from_drag(start: (f64, f64), end: (f64, f64)) -> Self {
        Self {
            left: start.0,
            top: start.1,
            width: end.0 - start.0,
            height: end.1 - start.1,
        }
    }

    /// Fold negative dimensions back into the origin so that width and
    /// height are non-negative. Applied once, before any consumer reads the
    /// region.
    pub fn normalized(self) -> Self {
        let (left, width) = if self.width < 0.0 {
            (self.left + self.width, -self.width)
        } else {
            (self.left, self.width)
        };
        let (top, height) = if self.height < 0.0 {
            (self.top + self.height, -self.height)
        } else {
            (self.top, self.height)
        };
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Whether the region spans at least [`MIN_SELECTION_SPAN`] in both
    /// dimensions.
    pub fn meets_minimum(&self) -> bool {
        self.width.abs() >= MIN_SELECTION_SPAN && self.height.abs() >= MIN_SELECTION_SPAN
    }
}

/// Where a background image sits on its surface: top-left offset plus the
/// uniform displayed scale chosen at load time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImagePlacement {
    pub left: f64,
    pub top: f64,
    pub scale: f64,
}

impl ImagePlacement {
    /// Scale-to-fit placement: the image is shrunk (or grown) uniformly to
    /// fit the display area and centered.
    pub fn fit(display: (f64, f64), image_px: (u32, u32)) -> Self {
        let (dw, dh) = display;
        let (iw, ih) = (image_px.0 as f64, image_px.1 as f64);
        if iw <= 0.0 || ih <= 0.0 || dw <= 0.0 || dh <= 0.0 {
            return Self {
                left: 0.0,
                top: 0.0,
                scale: 1.0,
            };
        }
        let scale = (dw / iw).min(dh / ih);
        Self {
            left: (dw - iw * scale) / 2.0,
            top: (dh - ih * scale) / 2.0,
            scale,
        }
    }
}

/// A rectangle in source-image pixel coordinates, guaranteed in bounds with
/// non-negative (possibly zero) dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionMapError {
    NoBackgroundImage,
}

impl std::fmt::Display for RegionMapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionMapError::NoBackgroundImage => write!(f, "no background image to extract from"),
        }
    }
}

/// Map a display-space selection onto source-image pixels.
///
/// The display size is the surface's logical size; the interactive zoom is a
/// view transform and does not enter the mapping. X and Y carry independent
/// scale factors. The result is clamped to the image bounds and may have zero
/// area when the selection lies outside the image.
pub fn map_to_image_pixels(
    region: &SelectionRegion,
    placement: Option<&ImagePlacement>,
    display: (f64, f64),
    image_px: (u32, u32),
) -> Result<PixelRect, RegionMapError> {
    let placement = placement.ok_or(RegionMapError::NoBackgroundImage)?;
    let region = region.normalized();
    let (display_w, display_h) = display;
    let (image_w, image_h) = image_px;

    if display_w <= 0.0 || display_h <= 0.0 {
        return Ok(PixelRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        });
    }

    let scale_x = image_w as f64 / display_w;
    let scale_y = image_h as f64 / display_h;

    let img_x = (region.left - placement.left) * scale_x;
    let img_y = (region.top - placement.top) * scale_y;
    let img_w = region.width * scale_x;
    let img_h = region.height * scale_y;

    let safe_x = (img_x.round().max(0.0) as u32).min(image_w);
    let safe_y = (img_y.round().max(0.0) as u32).min(image_h);
    let safe_w = (img_w.round() as i64)
        .min(image_w as i64 - safe_x as i64)
        .max(0) as u32;
    let safe_h = (img_h.round() as i64)
        .min(image_h as i64 - safe_y as i64)
        .max(0) as u32;

    Ok(PixelRect {
        x: safe_x,
        y: safe_y,
        width: safe_w,
        height: safe_h,
    })
}
