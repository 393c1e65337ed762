use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::animator::{Animator, AnimatorEvent, ClearPolicy, DiagramObserver, STEP_DELAY};
use crate::assets::{decode_image, PreparedImage};
use crate::foundation::core::{Affine, DisplaySize, FrameRgba8, LOGICAL_HEIGHT, LOGICAL_WIDTH};
use crate::foundation::error::InkstepResult;
use crate::instruction::{parse_instructions, Instruction};
use crate::palette::{ColorPicker, RandomPicker};
use crate::shapes;
use crate::surface::{affine_to_cpu, Surface, SurfaceOpts};
use crate::text::TextLayoutEngine;

/// Engine construction options.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineOpts {
    pub surface: SurfaceOpts,
    pub clear_policy: ClearPolicy,
}

/// An inbound diagram payload: a batch of instructions plus a flag set by
/// producers that already rendered the diagram through another channel.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramBatch {
    #[serde(default)]
    pub instructions: serde_json::Value,
    #[serde(default)]
    pub svg_complete: bool,
}

/// A PNG export of the current surface plus its suggested filename.
#[derive(Clone, Debug)]
pub struct ExportedDiagram {
    pub filename: String,
    pub png: Vec<u8>,
}

/// The diagram engine: a persistent 1024x768 logical surface, an
/// append-only instruction log, and a single-flight step animator.
///
/// Time is supplied by the host: [`Engine::run`] arms a batch and
/// [`Engine::tick`] executes whatever steps have come due by `now`.
pub struct Engine {
    surface: Surface,
    text: TextLayoutEngine,
    picker: Box<dyn ColorPicker>,
    background: Option<PreparedImage>,
    log: Vec<Instruction>,
    animator: Animator,
    clear_policy: ClearPolicy,
}

impl Engine {
    /// Engine with the default uniform-random accent picker.
    pub fn new(opts: EngineOpts) -> InkstepResult<Self> {
        Self::with_palette(opts, Box::new(RandomPicker))
    }

    /// Engine with an explicit accent picker. Deterministic pickers make
    /// redraws pixel-identical, which the random default does not guarantee.
    pub fn with_palette(opts: EngineOpts, picker: Box<dyn ColorPicker>) -> InkstepResult<Self> {
        Ok(Self {
            surface: Surface::new(opts.surface)?,
            text: TextLayoutEngine::new(),
            picker,
            background: None,
            log: Vec::new(),
            animator: Animator::new(STEP_DELAY),
            clear_policy: opts.clear_policy,
        })
    }

    /// Execute one instruction immediately and append it to the log.
    ///
    /// Returns `false` (and logs why) for unknown actions, circles with
    /// missing geometry, or a failed paint; the log only ever records
    /// instructions that actually reached the surface.
    pub fn execute(&mut self, instruction: &Instruction) -> bool {
        match self.paint_instruction(instruction) {
            Ok(true) => {
                self.log.push(instruction.clone());
                true
            }
            Ok(false) => false,
            Err(err) => {
                tracing::warn!(
                    action = instruction.action(),
                    error = %err,
                    "instruction failed to paint"
                );
                false
            }
        }
    }

    /// Erase the pixels and replay the log (background first), without
    /// growing the log.
    pub fn redraw(&mut self) {
        self.surface.clear_pixels();
        if let Err(err) = self.paint_background() {
            tracing::warn!(error = %err, "background repaint failed");
        }
        // Replay borrows the log while painting mutates the surface, so
        // swap it out for the duration.
        let log = std::mem::take(&mut self.log);
        for instruction in &log {
            if let Err(err) = self.paint_instruction(instruction) {
                tracing::error!(
                    action = instruction.action(),
                    error = %err,
                    "replay failed for logged instruction"
                );
            }
        }
        self.log = log;
    }

    /// Decode `bytes` as the new background image and repaint everything
    /// over it. A decode failure leaves the surface, log and previous
    /// background untouched.
    pub fn set_background(&mut self, bytes: &[u8]) -> InkstepResult<()> {
        let prepared = decode_image(bytes)?;
        tracing::debug!(
            width = prepared.width,
            height = prepared.height,
            "background image set"
        );
        self.background = Some(prepared);
        self.redraw();
        Ok(())
    }

    /// Reset to an empty diagram: no background, empty log, transparent
    /// pixels. An in-flight batch follows the configured [`ClearPolicy`].
    pub fn clear(&mut self) {
        self.background = None;
        self.log.clear();
        self.surface.clear_pixels();
        if self.clear_policy == ClearPolicy::CancelBatch {
            self.animator.cancel();
        }
    }

    /// Arm a batch for animated execution. The first step executes during
    /// this call (right after `on_start`); later steps come due on
    /// [`Engine::tick`] at 600ms intervals.
    ///
    /// Returns `false` without touching observer or surface if a batch is
    /// already in flight.
    pub fn run(
        &mut self,
        instructions: Vec<Instruction>,
        now: Instant,
        observer: &mut dyn DiagramObserver,
    ) -> bool {
        if !self.animator.start(instructions, now) {
            return false;
        }
        observer.on_start();
        self.tick(now, observer);
        true
    }

    /// Execute every step that has come due by `now`.
    pub fn tick(&mut self, now: Instant, observer: &mut dyn DiagramObserver) {
        while let Some(event) = self.animator.take_due(now) {
            match event {
                AnimatorEvent::Step {
                    instruction,
                    step,
                    total,
                } => {
                    observer.on_progress(step, total);
                    self.execute(&instruction);
                }
                AnimatorEvent::Completed => observer.on_complete(),
            }
        }
    }

    /// Entry point for a raw diagram payload: skips batches whose producer
    /// flagged them as already rendered, leniently decodes the rest, and
    /// hands them to [`Engine::run`].
    pub fn handle_diagram(
        &mut self,
        batch: &DiagramBatch,
        now: Instant,
        observer: &mut dyn DiagramObserver,
    ) -> bool {
        if batch.svg_complete {
            tracing::debug!("diagram already rendered upstream, skipping");
            return false;
        }
        self.run(parse_instructions(&batch.instructions), now, observer)
    }

    /// Fit the on-screen display size to a container, preserving the fixed
    /// 1024:768 aspect ratio. Logical coordinates and pixels are untouched.
    pub fn resize(&mut self, container_width: f64, container_height: f64) -> DisplaySize {
        self.surface.resize(container_width, container_height)
    }

    /// Encode the current surface as a timestamped PNG download.
    pub fn export_png(&self) -> InkstepResult<ExportedDiagram> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Ok(ExportedDiagram {
            filename: format!("diagram-{millis}.png"),
            png: self.surface.encode_png()?,
        })
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }

    /// Instructions that have successfully painted, in execution order.
    pub fn log(&self) -> &[Instruction] {
        &self.log
    }

    pub fn display_size(&self) -> DisplaySize {
        self.surface.display_size()
    }

    /// Premultiplied RGBA8 readback of the surface.
    pub fn snapshot(&self) -> FrameRgba8 {
        self.surface.snapshot()
    }

    /// Paint without logging. `Ok(false)` means the instruction was skipped
    /// as unpaintable (unknown action, missing circle geometry).
    fn paint_instruction(&mut self, instruction: &Instruction) -> InkstepResult<bool> {
        let base = self.surface.base_transform();
        match instruction {
            Instruction::Text(spec) => {
                let text = &mut self.text;
                self.surface
                    .paint(|ctx| shapes::draw_text(ctx, base, spec, text))?;
            }
            Instruction::Arrow(spec) => {
                let accent = self.picker.pick();
                self.surface
                    .paint(|ctx| shapes::draw_arrow(ctx, base, spec, accent))?;
            }
            Instruction::Circle(spec) => {
                let Some((cx, cy, r)) = spec.geometry() else {
                    tracing::error!("circle instruction missing cx/cy/r, skipping");
                    return Ok(false);
                };
                self.surface
                    .paint(|ctx| shapes::draw_circle(ctx, base, spec, cx, cy, r))?;
            }
            Instruction::Rectangle(spec) => {
                let accent = self.picker.pick();
                self.surface
                    .paint(|ctx| shapes::draw_rect(ctx, base, spec, accent))?;
            }
            Instruction::Line(spec) => {
                let accent = self.picker.pick();
                self.surface
                    .paint(|ctx| shapes::draw_line(ctx, base, spec, accent))?;
            }
            Instruction::Unknown { action } => {
                tracing::warn!(action = %action, "unknown instruction action, skipping");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Composite the background (if any) stretched over the full logical
    /// surface.
    fn paint_background(&mut self) -> InkstepResult<()> {
        let Some(bg) = self.background.clone() else {
            return Ok(());
        };
        let base = self.surface.base_transform();
        let stretch = Affine::scale_non_uniform(
            LOGICAL_WIDTH / f64::from(bg.width),
            LOGICAL_HEIGHT / f64::from(bg.height),
        );
        self.surface.paint(|ctx| {
            ctx.set_transform(affine_to_cpu(base * stretch));
            ctx.set_paint(bg.paint.clone());
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(bg.width),
                f64::from(bg.height),
            ));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::LineSpec;

    #[derive(Default)]
    struct Recorder {
        starts: usize,
        progress: Vec<(usize, usize)>,
        completes: usize,
    }

    impl DiagramObserver for Recorder {
        fn on_start(&mut self) {
            self.starts += 1;
        }
        fn on_progress(&mut self, step: usize, total: usize) {
            self.progress.push((step, total));
        }
        fn on_complete(&mut self) {
            self.completes += 1;
        }
    }

    fn line(x2: f64) -> Instruction {
        Instruction::Line(LineSpec {
            x1: 10.0,
            y1: 10.0,
            x2,
            y2: 200.0,
            width: None,
            color: None,
        })
    }

    #[test]
    fn run_executes_first_step_immediately() {
        let mut engine = Engine::new(EngineOpts::default()).unwrap();
        let mut obs = Recorder::default();
        let t0 = Instant::now();

        assert!(engine.run(vec![line(100.0), line(200.0)], t0, &mut obs));
        assert_eq!(obs.starts, 1);
        assert_eq!(obs.progress, vec![(1, 2)]);
        assert_eq!(engine.log().len(), 1);
        assert!(engine.is_animating());
    }

    #[test]
    fn rejected_run_fires_no_callbacks() {
        let mut engine = Engine::new(EngineOpts::default()).unwrap();
        let mut obs = Recorder::default();
        let t0 = Instant::now();

        engine.run(vec![line(100.0)], t0, &mut obs);
        assert!(!engine.run(vec![line(200.0)], t0, &mut obs));
        assert_eq!(obs.starts, 1);
        assert_eq!(obs.progress.len(), 1);
    }

    #[test]
    fn unknown_instruction_does_not_reach_log() {
        let mut engine = Engine::new(EngineOpts::default()).unwrap();
        assert!(!engine.execute(&Instruction::Unknown {
            action: "drawSparkles".into(),
        }));
        assert!(engine.log().is_empty());
    }

    #[test]
    fn svg_complete_batches_are_skipped() {
        let mut engine = Engine::new(EngineOpts::default()).unwrap();
        let mut obs = Recorder::default();
        let batch = DiagramBatch {
            instructions: serde_json::json!([{ "action": "drawLine",
                "x1": 0.0, "y1": 0.0, "x2": 5.0, "y2": 5.0 }]),
            svg_complete: true,
        };
        assert!(!engine.handle_diagram(&batch, Instant::now(), &mut obs));
        assert_eq!(obs.starts, 0);
        assert!(!engine.is_animating());
    }
}
