use std::io::Cursor;

use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{ImageFormat, Rgba as Pixel, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tracing::warn;

use crate::symbology::{Gradient, Rgba};

pub const LEGEND_WIDTH: u32 = 150;
pub const LEGEND_HEIGHT: u32 = 150;
pub const BAR_WIDTH: u32 = 32;
pub const BAR_HEIGHT: u32 = 128;
const TEXT_MARGIN: i32 = 5;
const TEXT_BASELINE: i32 = 15;
const UNDEFINED_TEXT: &str = "und.";
const FONT_SIZE: f32 = 12.0;
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Drawing surface a legend is painted on.
pub trait LegendSurface {
    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba);

    /// Fills a rectangle with `gradient`, offset 0 along the bottom edge and 1 along the top.
    fn fill_vertical_gradient(&mut self, x: i32, y: i32, width: u32, height: u32, gradient: &Gradient);

    /// `y` is the text baseline.
    fn fill_text(&mut self, text: &str, x: i32, y: i32, color: Rgba);
}

/// Text the legend places on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendText<'a> {
    pub variable: Option<&'a str>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Paints a color-bar legend: minimum at the bottom, maximum at the top,
/// variable name in the top-left corner.
pub fn draw_legend<S: LegendSurface + ?Sized>(surface: &mut S, gradient: &Gradient, text: &LegendText<'_>) {
    surface.fill_rect(0, 0, LEGEND_WIDTH, LEGEND_HEIGHT, Rgba::WHITE);

    let bar_top = (LEGEND_HEIGHT - BAR_HEIGHT) as i32;
    surface.fill_vertical_gradient(0, bar_top, BAR_WIDTH, BAR_HEIGHT, gradient);

    let label_x = BAR_WIDTH as i32 + TEXT_MARGIN;
    surface.fill_text(text.variable.unwrap_or(""), TEXT_MARGIN, TEXT_BASELINE, Rgba::BLACK);
    surface.fill_text(
        &value_text(text.max),
        label_x,
        TEXT_BASELINE + bar_top,
        Rgba::BLACK,
    );
    surface.fill_text(
        &value_text(text.min),
        label_x,
        LEGEND_HEIGHT as i32,
        Rgba::BLACK,
    );
}

fn value_text(value: Option<f64>) -> String {
    value.map_or_else(|| UNDEFINED_TEXT.to_string(), |v| v.to_string())
}

/// Text drawn on a [`RasterLegend`], kept for callers that lay out their own captions.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendLabel {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub color: Rgba,
}

#[derive(Debug)]
pub enum LegendError {
    Encode(image::ImageError),
}

impl std::fmt::Display for LegendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LegendError::Encode(e) => write!(f, "legend PNG encoding failed: {e}"),
        }
    }
}

impl std::error::Error for LegendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LegendError::Encode(e) => Some(e),
        }
    }
}

/// RGBA raster legend with text rendered in DejaVu Sans Mono.
#[derive(Debug, Clone)]
pub struct RasterLegend {
    image: RgbaImage,
    labels: Vec<LegendLabel>,
    font: Option<FontRef<'static>>,
}

impl RasterLegend {
    pub fn new(width: u32, height: u32) -> Self {
        let font = match FontRef::try_from_slice(FONT_DATA) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!("legend font unavailable, text is not rasterized: {e}");
                None
            }
        };
        Self {
            image: RgbaImage::new(width, height),
            labels: Vec::new(),
            font,
        }
    }

    pub fn labels(&self) -> &[LegendLabel] {
        &self.labels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        (x < self.image.width() && y < self.image.height()).then(|| Rgba(self.image.get_pixel(x, y).0))
    }

    pub fn to_png(&self) -> Result<Vec<u8>, LegendError> {
        let mut out = Cursor::new(Vec::new());
        self.image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(LegendError::Encode)?;
        Ok(out.into_inner())
    }

    /// Column and row ranges of a rectangle, clipped to the raster.
    fn clip(&self, x: i32, y: i32, width: u32, height: u32) -> (std::ops::Range<u32>, std::ops::Range<u32>) {
        let clamp = |v: i64, max: u32| v.clamp(0, max as i64) as u32;
        let xs = clamp(x as i64, self.image.width())..clamp(x as i64 + width as i64, self.image.width());
        let ys = clamp(y as i64, self.image.height())..clamp(y as i64 + height as i64, self.image.height());
        (xs, ys)
    }
}

impl Default for RasterLegend {
    fn default() -> Self {
        Self::new(LEGEND_WIDTH, LEGEND_HEIGHT)
    }
}

impl LegendSurface for RasterLegend {
    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba) {
        let (xs, ys) = self.clip(x, y, width, height);
        for py in ys {
            for px in xs.clone() {
                self.image.put_pixel(px, py, Pixel(color.0));
            }
        }
    }

    fn fill_vertical_gradient(&mut self, x: i32, y: i32, width: u32, height: u32, gradient: &Gradient) {
        if height == 0 {
            return;
        }
        let (xs, ys) = self.clip(x, y, width, height);
        let bottom = y as f64 + height as f64;
        for py in ys {
            // sample at the pixel center
            let t = (bottom - (py as f64 + 0.5)) / height as f64;
            let color = Pixel(gradient.sample(t).0);
            for px in xs.clone() {
                self.image.put_pixel(px, py, color);
            }
        }
    }

    fn fill_text(&mut self, text: &str, x: i32, y: i32, color: Rgba) {
        if text.is_empty() {
            return;
        }
        if let Some(font) = &self.font {
            let scale = PxScale::from(FONT_SIZE);
            // draw_text_mut takes the top of the line, not the baseline
            let top = y - font.as_scaled(scale).ascent().round() as i32;
            draw_text_mut(&mut self.image, Pixel(color.0), x, top, scale, font, text);
        }
        self.labels.push(LegendLabel {
            text: text.to_string(),
            x,
            y,
            color,
        });
    }
}
