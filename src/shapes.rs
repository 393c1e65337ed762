use crate::foundation::core::{Affine, BezPath, Rgba8};
use crate::foundation::error::InkstepResult;
use crate::instruction::{ArrowSpec, CircleSpec, LineSpec, RectSpec, TextSpec};
use crate::palette::color_or;
use crate::surface::{affine_to_cpu, bezpath_to_cpu};
use crate::text::TextLayoutEngine;

const DEFAULT_STROKE_WIDTH: f64 = 2.0;
const TEXT_BOX_PADDING: f64 = 6.0;
const ARROWHEAD_LENGTH: f64 = 12.0;
const ARROWHEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;

const BLACK: Rgba8 = Rgba8::opaque(0, 0, 0);
// rgba(255, 255, 255, 0.95)
const TEXT_BOX_FILL: Rgba8 = Rgba8::opaque(255, 255, 255).with_alpha(242);
// rgba(52, 73, 94, 0.3)
const TEXT_BOX_BORDER: Rgba8 = Rgba8::opaque(52, 73, 94).with_alpha(77);
// Red at alpha 0.3, drawn over arrow shafts for emphasis.
const ARROW_HIGHLIGHT: Rgba8 = Rgba8::opaque(255, 0, 0).with_alpha(77);
// Indigo #4F46E5 at alpha 0.2, drawn as a ring around circles.
const CIRCLE_HIGHLIGHT: Rgba8 = Rgba8::opaque(0x4F, 0x46, 0xE5).with_alpha(51);
const RECT_FILL_ALPHA: u8 = 0x40;

/// Centered text over an opaque background box.
///
/// Glyphs are always pure black regardless of the requested color. A failed
/// font resolution skips the glyph pass but keeps the box, so the
/// instruction still succeeds.
pub(crate) fn draw_text(
    ctx: &mut vello_cpu::RenderContext,
    base: Affine,
    spec: &TextSpec,
    text: &mut TextLayoutEngine,
) -> InkstepResult<()> {
    let font_size = spec.resolved_font_size();
    let layout = text.layout_plain(&spec.content, font_size as f32, spec.is_bold())?;

    let text_width = f64::from(layout.width());
    let text_height = font_size;

    let box_x = spec.x - text_width / 2.0 - TEXT_BOX_PADDING;
    let box_y = spec.y - text_height / 2.0 - TEXT_BOX_PADDING;
    let box_w = text_width + TEXT_BOX_PADDING * 2.0;
    let box_h = text_height + TEXT_BOX_PADDING * 2.0;
    let box_rect = kurbo::Rect::new(box_x, box_y, box_x + box_w, box_y + box_h);

    ctx.set_transform(affine_to_cpu(base));
    ctx.set_paint(paint_color(TEXT_BOX_FILL));
    ctx.fill_rect(&cpu_rect(box_rect));

    ctx.set_paint(paint_color(TEXT_BOX_BORDER));
    ctx.fill_path(&bezpath_to_cpu(&stroke_outline(&rect_path(box_rect), 1.0)));

    if layout.width() <= 0.0 && !spec.content.is_empty() {
        tracing::warn!(content = %spec.content, "no usable font for text, skipping glyphs");
        return Ok(());
    }

    let origin = Affine::translate((
        spec.x - text_width / 2.0,
        spec.y - f64::from(layout.height()) / 2.0,
    ));
    ctx.set_transform(affine_to_cpu(base * origin));
    ctx.set_paint(paint_color(BLACK));
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let font_data = text.font_data_for(run.run().font());
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&font_data)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
    Ok(())
}

/// Shaft plus a filled triangular arrowhead in the picked accent color,
/// finished with a low-opacity red emphasis stroke over the shaft.
pub(crate) fn draw_arrow(
    ctx: &mut vello_cpu::RenderContext,
    base: Affine,
    spec: &ArrowSpec,
    accent: Rgba8,
) -> InkstepResult<()> {
    let width = spec.width.unwrap_or(DEFAULT_STROKE_WIDTH);
    let shaft = segment_path(spec.x1, spec.y1, spec.x2, spec.y2);

    ctx.set_transform(affine_to_cpu(base));
    ctx.set_paint(paint_color(accent));
    ctx.fill_path(&bezpath_to_cpu(&stroke_outline(&shaft, width)));

    let angle = (spec.y2 - spec.y1).atan2(spec.x2 - spec.x1);
    let mut head = BezPath::new();
    head.move_to((spec.x2, spec.y2));
    head.line_to((
        spec.x2 - ARROWHEAD_LENGTH * (angle - ARROWHEAD_ANGLE).cos(),
        spec.y2 - ARROWHEAD_LENGTH * (angle - ARROWHEAD_ANGLE).sin(),
    ));
    head.line_to((
        spec.x2 - ARROWHEAD_LENGTH * (angle + ARROWHEAD_ANGLE).cos(),
        spec.y2 - ARROWHEAD_LENGTH * (angle + ARROWHEAD_ANGLE).sin(),
    ));
    head.close_path();
    ctx.fill_path(&bezpath_to_cpu(&head));

    ctx.set_paint(paint_color(ARROW_HIGHLIGHT));
    ctx.fill_path(&bezpath_to_cpu(&stroke_outline(&shaft, 6.0)));
    Ok(())
}

/// Circle outline with optional fill, followed by an indigo highlight ring
/// at `r + 2`. Geometry must have been validated by the caller.
pub(crate) fn draw_circle(
    ctx: &mut vello_cpu::RenderContext,
    base: Affine,
    spec: &CircleSpec,
    cx: f64,
    cy: f64,
    r: f64,
) -> InkstepResult<()> {
    use kurbo::Shape as _;

    let stroke_width = spec.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH);
    let circle = kurbo::Circle::new((cx, cy), r).to_path(0.1);

    ctx.set_transform(affine_to_cpu(base));
    if let Some(fill) = spec.fill.as_deref()
        && fill != "none"
    {
        ctx.set_paint(paint_color(color_or(Some(fill), BLACK)));
        ctx.fill_path(&bezpath_to_cpu(&circle));
    }

    ctx.set_paint(paint_color(color_or(spec.stroke.as_deref(), BLACK)));
    ctx.fill_path(&bezpath_to_cpu(&stroke_outline(&circle, stroke_width)));

    let ring = kurbo::Circle::new((cx, cy), r + 2.0).to_path(0.1);
    ctx.set_paint(paint_color(CIRCLE_HIGHLIGHT));
    ctx.fill_path(&bezpath_to_cpu(&stroke_outline(&ring, 4.0)));
    Ok(())
}

/// Rectangle outline (and optional translucent fill) in one picked accent
/// color. The accent deliberately overrides the instruction's own colors.
pub(crate) fn draw_rect(
    ctx: &mut vello_cpu::RenderContext,
    base: Affine,
    spec: &RectSpec,
    accent: Rgba8,
) -> InkstepResult<()> {
    let stroke_width = spec.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH);
    let rect = kurbo::Rect::new(spec.x, spec.y, spec.x + spec.width, spec.y + spec.height);

    ctx.set_transform(affine_to_cpu(base));
    if spec.wants_fill() {
        ctx.set_paint(paint_color(accent.with_alpha(RECT_FILL_ALPHA)));
        ctx.fill_rect(&cpu_rect(rect));
    }

    ctx.set_paint(paint_color(accent));
    ctx.fill_path(&bezpath_to_cpu(&stroke_outline(&rect_path(rect), stroke_width)));
    Ok(())
}

/// Straight segment in a freshly picked accent color.
pub(crate) fn draw_line(
    ctx: &mut vello_cpu::RenderContext,
    base: Affine,
    spec: &LineSpec,
    accent: Rgba8,
) -> InkstepResult<()> {
    let width = spec.width.unwrap_or(DEFAULT_STROKE_WIDTH);
    let path = segment_path(spec.x1, spec.y1, spec.x2, spec.y2);

    ctx.set_transform(affine_to_cpu(base));
    ctx.set_paint(paint_color(accent));
    ctx.fill_path(&bezpath_to_cpu(&stroke_outline(&path, width)));
    Ok(())
}

fn segment_path(x1: f64, y1: f64, x2: f64, y2: f64) -> BezPath {
    let mut p = BezPath::new();
    p.move_to((x1, y1));
    p.line_to((x2, y2));
    p
}

fn rect_path(rect: kurbo::Rect) -> BezPath {
    use kurbo::Shape as _;
    rect.to_path(0.1)
}

/// Expand a stroke into a fillable outline with the surface's default
/// round cap/round join styling.
fn stroke_outline(path: &BezPath, width: f64) -> BezPath {
    let style = kurbo::Stroke::new(width.max(0.0))
        .with_caps(kurbo::Cap::Round)
        .with_join(kurbo::Join::Round);
    kurbo::stroke(
        path.elements().iter().copied(),
        &style,
        &kurbo::StrokeOpts::default(),
        0.1,
    )
}

fn paint_color(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn cpu_rect(r: kurbo::Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stroke_outline_produces_closed_fillable_path() {
        let outline = stroke_outline(&segment_path(0.0, 0.0, 10.0, 0.0), 2.0);
        assert!(!outline.elements().is_empty());
    }

    #[test]
    fn arrowhead_flanks_sit_behind_the_tip() {
        let angle = (0.0f64 - 0.0).atan2(100.0 - 0.0);
        let fx = 100.0 - ARROWHEAD_LENGTH * (angle - ARROWHEAD_ANGLE).cos();
        let fy = 0.0 - ARROWHEAD_LENGTH * (angle - ARROWHEAD_ANGLE).sin();
        // For a rightward arrow, both flank points lie left of the tip.
        assert!(fx < 100.0);
        assert!((fy.abs() - ARROWHEAD_LENGTH * ARROWHEAD_ANGLE.sin()).abs() < 1e-9);
    }
}
