use crate::assets::unpremultiply_rgba8_in_place;
use crate::foundation::core::{
    Affine, BezPath, DisplaySize, FrameRgba8, LOGICAL_HEIGHT, LOGICAL_WIDTH,
};
use crate::foundation::error::{InkstepError, InkstepResult};

/// Surface construction options.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceOpts {
    /// Backing-store scale factor (device-pixel-ratio analog). The physical
    /// pixmap is `1024*scale x 768*scale`; drawing stays in logical units.
    pub scale: f32,
}

impl Default for SurfaceOpts {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

/// Owns the persistent drawing surface and its display transform.
///
/// Each paint renders the new content into a scratch pixmap and
/// premul-over composites it onto the persistent backing store, so painted
/// instructions accumulate like on an immediate-mode canvas while the
/// renderer itself stays scene-based.
pub(crate) struct Surface {
    scale: f32,
    width_px: u16,
    height_px: u16,
    pixmap: vello_cpu::Pixmap,
    scratch: vello_cpu::Pixmap,
    ctx: Option<vello_cpu::RenderContext>,
    display: DisplaySize,
}

impl Surface {
    pub(crate) fn new(opts: SurfaceOpts) -> InkstepResult<Self> {
        if !opts.scale.is_finite() || opts.scale <= 0.0 {
            return Err(InkstepError::validation(
                "surface scale must be finite and > 0",
            ));
        }
        let width_px = physical_extent(LOGICAL_WIDTH, opts.scale)?;
        let height_px = physical_extent(LOGICAL_HEIGHT, opts.scale)?;

        Ok(Self {
            scale: opts.scale,
            width_px,
            height_px,
            pixmap: vello_cpu::Pixmap::new(width_px, height_px),
            scratch: vello_cpu::Pixmap::new(width_px, height_px),
            ctx: None,
            display: DisplaySize {
                width: LOGICAL_WIDTH,
                height: LOGICAL_HEIGHT,
            },
        })
    }

    /// Base affine mapping logical coordinates onto the backing store.
    pub(crate) fn base_transform(&self) -> Affine {
        Affine::scale(f64::from(self.scale))
    }

    /// Render one instruction's scene and composite it over the surface.
    pub(crate) fn paint(
        &mut self,
        f: impl FnOnce(&mut vello_cpu::RenderContext) -> InkstepResult<()>,
    ) -> InkstepResult<()> {
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == self.width_px && ctx.height() == self.height_px => ctx,
            _ => vello_cpu::RenderContext::new(self.width_px, self.height_px),
        };
        ctx.reset();

        let drawn = f(&mut ctx);
        if drawn.is_ok() {
            ctx.flush();
            clear_pixmap_to_transparent(&mut self.scratch);
            ctx.render_to_pixmap(&mut self.scratch);
            premul_over_in_place(
                self.pixmap.data_as_u8_slice_mut(),
                self.scratch.data_as_u8_slice(),
            )?;
        }
        self.ctx = Some(ctx);
        drawn
    }

    /// Erase all pixels. Leaves the log/background to the caller.
    pub(crate) fn clear_pixels(&mut self) {
        clear_pixmap_to_transparent(&mut self.pixmap);
    }

    /// Recompute the on-screen display size for a container, preserving the
    /// fixed 1024:768 aspect ratio. Never touches the logical space.
    pub(crate) fn resize(&mut self, container_width: f64, container_height: f64) -> DisplaySize {
        self.display = DisplaySize::fit(container_width, container_height);
        self.display
    }

    pub(crate) fn display_size(&self) -> DisplaySize {
        self.display
    }

    /// Premultiplied RGBA8 readback of the backing store.
    pub(crate) fn snapshot(&self) -> FrameRgba8 {
        FrameRgba8 {
            width: u32::from(self.width_px),
            height: u32::from(self.height_px),
            data: self.pixmap.data_as_u8_slice().to_vec(),
        }
    }

    /// Encode the current surface as PNG (straight alpha).
    pub(crate) fn encode_png(&self) -> InkstepResult<Vec<u8>> {
        let mut straight = self.pixmap.data_as_u8_slice().to_vec();
        unpremultiply_rgba8_in_place(&mut straight);

        let img = image::RgbaImage::from_raw(
            u32::from(self.width_px),
            u32::from(self.height_px),
            straight,
        )
        .ok_or_else(|| InkstepError::render("surface buffer has invalid size"))?;

        let mut out = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut out),
            image::ImageFormat::Png,
        )
        .map_err(|e| InkstepError::render(format!("png encode failed: {e}")))?;
        Ok(out)
    }
}

fn physical_extent(logical: f64, scale: f32) -> InkstepResult<u16> {
    let px = (logical * f64::from(scale)).round();
    if px < 1.0 || px > f64::from(u16::MAX) {
        return Err(InkstepError::validation(format!(
            "scaled surface extent {px} out of range"
        )));
    }
    Ok(px as u16)
}

fn clear_pixmap_to_transparent(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

fn premul_over_in_place(dst: &mut [u8], src: &[u8]) -> InkstepResult<()> {
    if dst.len() != src.len() || dst.len() % 4 != 0 {
        return Err(InkstepError::render(
            "premul_over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = s[3] as u16;
        if sa == 0 {
            continue;
        }
        let inv = 255u16 - sa;
        d[3] = (sa as u8).saturating_add(mul_div255_u8(d[3] as u16, inv));
        for c in 0..3 {
            let dc = mul_div255_u8(d[c] as u16, inv);
            d[c] = s[c].saturating_add(dc);
        }
    }
    Ok(())
}

fn mul_div255_u8(x: u16, y: u16) -> u8 {
    ((x * y + 127) / 255) as u8
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

pub(crate) fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}
