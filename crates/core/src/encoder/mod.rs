//! QR code rendering into storable artifacts.

mod error;
mod options;
pub mod payload;

pub use error::EncodeError;
pub use options::{
    ErrorCorrection, MAX_BORDER, MAX_DATA_LEN, MAX_MODULE_SIZE, ModuleStyle, QrFormat, QrOptions,
    hex_color, parse_color,
};

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use qrcode::QrCode;
use qrcode::render::svg;
use tracing::debug;

use crate::artifact::Artifact;

/// Renders QR codes as PNG or SVG artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrEncoder;

impl QrEncoder {
    /// Create an encoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Encode `options.data` into a fresh artifact.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError` for invalid options, data that does not fit a
    /// symbol, or a rendering failure.
    pub fn encode(&self, options: &QrOptions) -> Result<Artifact, EncodeError> {
        options.validate()?;
        let code = QrCode::with_error_correction_level(
            options.data.as_bytes(),
            options.error_correction.into(),
        )?;
        let fill = parse_color(&options.fill_color)?;
        let back = parse_color(&options.back_color)?;

        let bytes = match options.format {
            QrFormat::Png => render_png(&code, options, fill, back)?,
            QrFormat::Svg => render_svg(&code, options, fill, back).into_bytes(),
        };

        let artifact = Artifact::new(
            bytes,
            options.format.content_type(),
            options.format.extension(),
        );
        debug!(
            artifact_id = %artifact.id(),
            format = options.format.extension(),
            size = artifact.len(),
            "QR code rendered"
        );
        Ok(artifact)
    }
}

fn render_png(
    code: &QrCode,
    options: &QrOptions,
    fill: [u8; 3],
    back: [u8; 3],
) -> Result<Vec<u8>, EncodeError> {
    let image = match options.style {
        ModuleStyle::Square => code
            .render::<Rgb<u8>>()
            .quiet_zone(options.border > 0)
            .module_dimensions(options.size, options.size)
            .dark_color(Rgb(fill))
            .light_color(Rgb(back))
            .build(),
        style => render_styled(code, options, style, Rgb(fill), Rgb(back))?,
    };

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Quiet zone width in modules, matching the renderer's default.
const QUIET_ZONE: u32 = 4;

/// Rasterize with non-square modules, same geometry as the plain renderer.
fn render_styled(
    code: &QrCode,
    options: &QrOptions,
    style: ModuleStyle,
    fill: Rgb<u8>,
    back: Rgb<u8>,
) -> Result<RgbImage, EncodeError> {
    let width = u32::try_from(code.width())
        .map_err(|_| EncodeError::invalid("symbol too large to render"))?;
    let quiet = if options.border > 0 { QUIET_ZONE } else { 0 };
    let size = options.size;
    let side = (width + 2 * quiet) * size;

    let mut image = RgbImage::from_pixel(side, side, back);
    let colors = code.to_colors();
    for y in 0..width {
        for x in 0..width {
            if colors[(y * width + x) as usize] != qrcode::Color::Dark {
                continue;
            }
            let (ox, oy) = ((x + quiet) * size, (y + quiet) * size);
            for dy in 0..size {
                for dx in 0..size {
                    if module_covers(style, dx, dy, size) {
                        image.put_pixel(ox + dx, oy + dy, fill);
                    }
                }
            }
        }
    }
    Ok(image)
}

/// Whether pixel `(dx, dy)` of a `size`-pixel module is painted.
fn module_covers(style: ModuleStyle, dx: u32, dy: u32, size: u32) -> bool {
    let s = f64::from(size);
    let (px, py) = (f64::from(dx) + 0.5, f64::from(dy) + 0.5);
    match style {
        ModuleStyle::Square => true,
        ModuleStyle::Circle => {
            let r = s / 2.0;
            (px - r).powi(2) + (py - r).powi(2) <= r * r
        }
        ModuleStyle::Rounded => {
            let r = s / 3.0;
            let (cx, cy) = (px.clamp(r, s - r), py.clamp(r, s - r));
            (px - cx).powi(2) + (py - cy).powi(2) <= r * r
        }
    }
}

fn render_svg(code: &QrCode, options: &QrOptions, fill: [u8; 3], back: [u8; 3]) -> String {
    let fill = hex_color(fill);
    let back = hex_color(back);
    code.render::<svg::Color<'_>>()
        .quiet_zone(options.border > 0)
        .module_dimensions(options.size, options.size)
        .dark_color(svg::Color(&fill))
        .light_color(svg::Color(&back))
        .build()
}
