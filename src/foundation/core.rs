pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Width of the logical canvas space instructions are authored against.
pub const LOGICAL_WIDTH: f64 = 1024.0;
/// Height of the logical canvas space instructions are authored against.
pub const LOGICAL_HEIGHT: f64 = 768.0;

/// Fixed aspect ratio of the logical canvas (`1024 / 768`).
pub const LOGICAL_ASPECT: f64 = LOGICAL_WIDTH / LOGICAL_HEIGHT;

/// On-screen display size derived from a container by the resize policy.
///
/// Display scaling never changes the logical coordinate space; it only
/// controls how the fixed 1024x768 surface is presented.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DisplaySize {
    /// Display width in container units.
    pub width: f64,
    /// Display height in container units.
    pub height: f64,
}

impl DisplaySize {
    /// Fit a container while preserving the fixed logical aspect ratio.
    ///
    /// Containers wider than 4:3 fit to height and derive width; containers
    /// taller than 4:3 fit to width and derive height.
    pub fn fit(container_width: f64, container_height: f64) -> Self {
        let container_aspect = container_width / container_height;
        if container_aspect > LOGICAL_ASPECT {
            Self {
                width: container_height * LOGICAL_ASPECT,
                height: container_height,
            }
        } else {
            Self {
                width: container_width,
                height: container_width / LOGICAL_ASPECT,
            }
        }
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque color from RGB channels.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Return the same color with a replaced alpha channel.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self {
            r: self.r,
            g: self.g,
            b: self.b,
            a,
        }
    }
}

/// Raw frame readback: premultiplied RGBA8, row-major.
#[derive(Clone, Debug)]
pub struct FrameRgba8 {
    /// Width in physical pixels.
    pub width: u32,
    /// Height in physical pixels.
    pub height: u32,
    /// Pixel bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_container_fits_to_height() {
        let d = DisplaySize::fit(2000.0, 750.0);
        assert_eq!(d.height, 750.0);
        assert!((d.width - 750.0 * LOGICAL_ASPECT).abs() < 1e-9);
    }

    #[test]
    fn tall_container_fits_to_width() {
        let d = DisplaySize::fit(640.0, 900.0);
        assert_eq!(d.width, 640.0);
        assert!((d.height - 640.0 / LOGICAL_ASPECT).abs() < 1e-9);
    }

    #[test]
    fn exact_aspect_keeps_container_size() {
        let d = DisplaySize::fit(1024.0, 768.0);
        assert!((d.width - 1024.0).abs() < 1e-9);
        assert!((d.height - 768.0).abs() < 1e-9);
    }

    #[test]
    fn with_alpha_replaces_only_alpha() {
        let c = Rgba8::opaque(10, 20, 30).with_alpha(64);
        assert_eq!((c.r, c.g, c.b, c.a), (10, 20, 30, 64));
    }
}
