use std::borrow::Cow;
use std::collections::HashMap;

use crate::foundation::error::{InkstepError, InkstepResult};

/// Zero-sized brush; glyph fill color is decided at paint time (always
/// black for diagram text), so the layout carries no per-range color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct NoBrush;

/// Stateful helper for shaping and measuring diagram text.
///
/// Resolves against the system font collection with a generic sans-serif
/// stack.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<NoBrush>,
    // Paint-side font handles, built once per resolved (blob, index) pair.
    font_cache: HashMap<(u64, u32), vello_cpu::peniko::FontData>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            font_cache: HashMap::new(),
        }
    }

    /// Paint-side handle for a layout run's font. The underlying blob is
    /// copied only on first use of a font; later runs reuse the cached
    /// handle.
    pub(crate) fn font_data_for(&mut self, font: &parley::Font) -> vello_cpu::peniko::FontData {
        self.font_cache
            .entry((font.data.id(), font.index))
            .or_insert_with(|| {
                vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(font.data.as_ref().to_vec()),
                    font.index,
                )
            })
            .clone()
    }

    /// Shape and lay out a single run of plain text at `size_px`.
    pub(crate) fn layout_plain(
        &mut self,
        text: &str,
        size_px: f32,
        bold: bool,
    ) -> InkstepResult<parley::Layout<NoBrush>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(InkstepError::validation(
                "text font size must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Borrowed("sans-serif")),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        if bold {
            builder.push_default(parley::style::StyleProperty::FontWeight(
                parley::style::FontWeight::BOLD,
            ));
        }

        let mut layout: parley::Layout<NoBrush> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nonpositive_size() {
        let mut engine = TextLayoutEngine::new();
        assert!(engine.layout_plain("hi", 0.0, false).is_err());
        assert!(engine.layout_plain("hi", f32::NAN, false).is_err());
    }

    #[test]
    fn layout_measures_nonempty_text() {
        let mut engine = TextLayoutEngine::new();
        let layout = engine.layout_plain("hello", 16.0, false).unwrap();
        // Width may be 0 on a machine without any system fonts; the engine
        // treats that as a paint-time skip, not an error.
        assert!(layout.width() >= 0.0);
    }

    #[test]
    fn font_data_is_built_once_per_font() {
        let mut engine = TextLayoutEngine::new();
        let layout = engine.layout_plain("hi", 16.0, false).unwrap();
        let Some(line) = layout.lines().next() else {
            // No system fonts resolved; nothing to cache.
            return;
        };
        let Some(parley::layout::PositionedLayoutItem::GlyphRun(run)) = line.items().next() else {
            return;
        };
        let font = run.run().font().clone();

        let first = engine.font_data_for(&font);
        let second = engine.font_data_for(&font);
        // Cache hits hand back the same underlying blob, not a fresh copy.
        assert_eq!(first.data.id(), second.data.id());
        assert_eq!(first.index, second.index);
    }
}
