use crate::foundation::error::{MapflowError, MapflowResult};

pub use kurbo::Point;

/// Raster dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Create a validated size with both axes `> 0`.
    pub fn new(width: u32, height: u32) -> MapflowResult<Self> {
        if width == 0 || height == 0 {
            return Err(MapflowError::validation(format!(
                "pixel size must be non-empty, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels covered.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Fit an aspect ratio (`width / height`) inside `bounds`.
    ///
    /// The longer axis takes the bound, the shorter one is rounded and never below 1 px.
    pub fn fit_aspect(aspect: f64, bounds: PixelSize) -> Self {
        if !aspect.is_finite() || aspect <= 0.0 {
            return bounds;
        }
        let bounds_aspect = f64::from(bounds.width) / f64::from(bounds.height);
        if aspect >= bounds_aspect {
            let h = (f64::from(bounds.width) / aspect).round().max(1.0) as u32;
            Self {
                width: bounds.width,
                height: h,
            }
        } else {
            let w = (f64::from(bounds.height) * aspect).round().max(1.0) as u32;
            Self {
                width: w,
                height: bounds.height,
            }
        }
    }
}

impl std::fmt::Display for PixelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for PixelSize {
    type Err = MapflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| MapflowError::validation(format!("size '{s}' must be WxH")))?;
        let w = w
            .trim()
            .parse::<u32>()
            .map_err(|e| MapflowError::validation(format!("size width '{w}': {e}")))?;
        let h = h
            .trim()
            .parse::<u32>()
            .map_err(|e| MapflowError::validation(format!("size height '{h}': {e}")))?;
        Self::new(w, h)
    }
}

impl<'de> serde::Deserialize<'de> for PixelSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Arr([u32; 2]),
            Obj { width: u32, height: u32 },
        }

        let (w, h) = match Repr::deserialize(deserializer)? {
            Repr::Arr([w, h]) => (w, h),
            Repr::Obj { width, height } => (width, height),
        };
        Self::new(w, h).map_err(serde::de::Error::custom)
    }
}

/// Straight-alpha RGBA color with channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Rgba {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

impl Rgba {
    /// Build a color, clamping every channel into `[0, 1]`.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Convert to premultiplied `[r, g, b, a]`.
    pub fn premultiplied(self) -> [f32; 4] {
        [self.r * self.a, self.g * self.a, self.b * self.a, self.a]
    }

    /// Recover a straight-alpha color from premultiplied channels.
    pub fn from_premultiplied(px: [f32; 4]) -> Self {
        let a = px[3];
        if a <= 0.0 {
            return Self::transparent();
        }
        Self::new(px[0] / a, px[1] / a, px[2] / a, a)
    }
}

impl<'de> serde::Deserialize<'de> for Rgba {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Rgba([f32; 4]),
            Rgb([f32; 3]),
            Obj {
                r: f32,
                g: f32,
                b: f32,
                #[serde(default = "opaque")]
                a: f32,
            },
        }

        fn opaque() -> f32 {
            1.0
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Rgba([r, g, b, a]) => Self::new(r, g, b, a),
            Repr::Rgb([r, g, b]) => Self::new(r, g, b, 1.0),
            Repr::Obj { r, g, b, a } => Self::new(r, g, b, a),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
