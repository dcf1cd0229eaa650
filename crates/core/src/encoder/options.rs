//! QR rendering options.

use serde::{Deserialize, Serialize};

use super::error::EncodeError;

/// Largest payload accepted, in characters.
pub const MAX_DATA_LEN: usize = 4296;
/// Largest module size in pixels.
pub const MAX_MODULE_SIZE: u32 = 40;
/// Largest border accepted.
pub const MAX_BORDER: u32 = 20;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrFormat {
    /// Raster PNG.
    #[default]
    #[serde(alias = "PNG")]
    Png,
    /// Vector SVG.
    #[serde(alias = "SVG")]
    Svg,
}

impl QrFormat {
    /// MIME type of the rendered output.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Svg => "image/svg+xml",
        }
    }

    /// File extension of the rendered output.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

/// Error correction level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// ~7% recovery.
    L,
    /// ~15% recovery.
    #[default]
    M,
    /// ~25% recovery.
    Q,
    /// ~30% recovery.
    H,
}

impl From<ErrorCorrection> for qrcode::EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => Self::L,
            ErrorCorrection::M => Self::M,
            ErrorCorrection::Q => Self::Q,
            ErrorCorrection::H => Self::H,
        }
    }
}

/// Shape of dark modules in raster output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStyle {
    /// Plain squares.
    #[default]
    Square,
    /// Squares with rounded corners.
    Rounded,
    /// Dots.
    Circle,
}

/// What to encode and how it should look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrOptions {
    /// Payload.
    pub data: String,
    /// Output format.
    #[serde(default)]
    pub format: QrFormat,
    /// Module size in pixels.
    #[serde(default = "default_size")]
    pub size: u32,
    /// Quiet zone around the symbol; any value above zero enables it.
    #[serde(default = "default_border")]
    pub border: u32,
    /// Error correction level.
    #[serde(default)]
    pub error_correction: ErrorCorrection,
    /// Dark module colour.
    #[serde(default = "default_fill")]
    pub fill_color: String,
    /// Light module colour.
    #[serde(default = "default_back")]
    pub back_color: String,
    /// Module shape; only PNG supports non-square modules.
    #[serde(default)]
    pub style: ModuleStyle,
}

fn default_size() -> u32 {
    10
}

fn default_border() -> u32 {
    4
}

fn default_fill() -> String {
    "black".to_string()
}

fn default_back() -> String {
    "white".to_string()
}

impl QrOptions {
    /// Options with defaults for `data`.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            format: QrFormat::default(),
            size: default_size(),
            border: default_border(),
            error_correction: ErrorCorrection::default(),
            fill_color: default_fill(),
            back_color: default_back(),
            style: ModuleStyle::default(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: QrFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the module size.
    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Set the border.
    #[must_use]
    pub fn with_border(mut self, border: u32) -> Self {
        self.border = border;
        self
    }

    /// Set the error correction level.
    #[must_use]
    pub fn with_error_correction(mut self, level: ErrorCorrection) -> Self {
        self.error_correction = level;
        self
    }

    /// Set the module style.
    #[must_use]
    pub fn with_style(mut self, style: ModuleStyle) -> Self {
        self.style = style;
        self
    }

    /// Set both colours.
    #[must_use]
    pub fn with_colors(mut self, fill: impl Into<String>, back: impl Into<String>) -> Self {
        self.fill_color = fill.into();
        self.back_color = back.into();
        self
    }

    /// Check ranges and colours.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError::InvalidOptions` naming the first bad field.
    pub fn validate(&self) -> Result<(), EncodeError> {
        let len = self.data.chars().count();
        if len == 0 {
            return Err(EncodeError::invalid("data must not be empty"));
        }
        if len > MAX_DATA_LEN {
            return Err(EncodeError::invalid(format!(
                "data is {len} characters, maximum is {MAX_DATA_LEN}"
            )));
        }
        if !(1..=MAX_MODULE_SIZE).contains(&self.size) {
            return Err(EncodeError::invalid(format!(
                "size must be between 1 and {MAX_MODULE_SIZE}"
            )));
        }
        if self.border > MAX_BORDER {
            return Err(EncodeError::invalid(format!(
                "border must be between 0 and {MAX_BORDER}"
            )));
        }
        if self.style != ModuleStyle::Square && self.format != QrFormat::Png {
            return Err(EncodeError::invalid("styled modules require png output"));
        }
        parse_color(&self.fill_color)?;
        parse_color(&self.back_color)?;
        Ok(())
    }
}

/// Resolve a colour name or `#rrggbb` to RGB.
///
/// # Errors
///
/// Returns `EncodeError::InvalidOptions` for unknown names and bad hex.
pub fn parse_color(color: &str) -> Result<[u8; 3], EncodeError> {
    let color = color.trim().to_ascii_lowercase();
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(EncodeError::invalid(format!("bad colour '#{hex}'")));
        }
        let mut rgb = [0u8; 3];
        for (i, channel) in rgb.iter_mut().enumerate() {
            *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| EncodeError::invalid(format!("bad colour '#{hex}'")))?;
        }
        return Ok(rgb);
    }

    let rgb = match color.as_str() {
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "blue" => [0, 0, 255],
        "yellow" => [255, 255, 0],
        "cyan" => [0, 255, 255],
        "magenta" => [255, 0, 255],
        "gray" | "grey" => [128, 128, 128],
        "orange" => [255, 165, 0],
        "purple" => [128, 0, 128],
        "navy" => [0, 0, 128],
        other => return Err(EncodeError::invalid(format!("unknown colour '{other}'"))),
    };
    Ok(rgb)
}

/// `#rrggbb` form of an RGB triple.
#[must_use]
pub fn hex_color([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}
