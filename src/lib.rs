//! Inkstep is a stepwise diagram rendering engine.
//!
//! It maintains a persistent 1024x768 logical drawing surface, executes
//! small JSON drawing instructions (text boxes, arrows, circles,
//! rectangles, lines), and reveals instruction batches one step at a time
//! with a fixed inter-step delay. The public API is engine-oriented:
//!
//! - Build an [`Engine`]
//! - Feed it instruction batches via [`Engine::run`] or
//!   [`Engine::handle_diagram`]
//! - Drive animation with [`Engine::tick`] and observe progress through a
//!   [`DiagramObserver`]
//! - Read the result back with [`Engine::snapshot`] or
//!   [`Engine::export_png`]
#![forbid(unsafe_code)]

mod assets;
mod foundation;

pub(crate) mod animator;
pub(crate) mod engine;
pub(crate) mod instruction;
pub(crate) mod palette;
pub(crate) mod shapes;
pub(crate) mod surface;
pub(crate) mod text;

pub use crate::foundation::core::{
    Affine, BezPath, DisplaySize, FrameRgba8, Point, Rect, Rgba8, Vec2, LOGICAL_HEIGHT,
    LOGICAL_WIDTH,
};
pub use crate::foundation::error::{InkstepError, InkstepResult};

pub use crate::animator::{ClearPolicy, DiagramObserver, NoopObserver, STEP_DELAY};
pub use crate::engine::{DiagramBatch, Engine, EngineOpts, ExportedDiagram};
pub use crate::instruction::{
    parse_instructions, ArrowSpec, CircleSpec, Instruction, LineSpec, RectSpec, TextSpec,
};
pub use crate::palette::{
    parse_hex, ColorPicker, CyclingPicker, FixedPicker, RandomPicker, BRIGHT_PALETTE,
};
pub use crate::surface::SurfaceOpts;
