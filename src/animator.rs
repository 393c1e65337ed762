use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::instruction::Instruction;

/// Fixed inter-step delay of the animated reveal.
pub const STEP_DELAY: Duration = Duration::from_millis(600);

/// Lifecycle callbacks driven while a batch animates.
///
/// All methods default to no-ops; hosts override what they display.
pub trait DiagramObserver {
    /// A batch was accepted and is about to execute its first step.
    fn on_start(&mut self) {}
    /// Step `step` of `total` (1-indexed) is about to be painted.
    fn on_progress(&mut self, step: usize, total: usize) {
        let _ = (step, total);
    }
    /// The batch has retired (all steps done, or cancelled).
    fn on_complete(&mut self) {}
}

/// Observer that ignores every callback.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl DiagramObserver for NoopObserver {}

/// What `clear` does to an in-flight batch.
///
/// `ContinueBatch` lets a cleared batch keep painting into the reset log;
/// `CancelBatch` opts into stopping it instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClearPolicy {
    /// Remaining steps keep executing and append to the reset log.
    #[default]
    ContinueBatch,
    /// The in-flight batch retires at its next due tick without painting.
    CancelBatch,
}

/// One due event yielded by the scheduler.
pub(crate) enum AnimatorEvent {
    /// Execute this instruction as step `step` of `total`.
    Step {
        instruction: Instruction,
        step: usize,
        total: usize,
    },
    /// The batch has retired.
    Completed,
}

struct Batch {
    pending: VecDeque<Instruction>,
    total: usize,
    next_step: usize,
    due: Instant,
    cancelled: bool,
}

/// Single-flight step scheduler: `Idle -> Animating -> Idle`.
///
/// The host drives time by calling [`Animator::take_due`]; suspension is
/// encoded as a `due` instant rather than a blocking wait, so the caller's
/// thread stays responsive between steps.
pub(crate) struct Animator {
    step_delay: Duration,
    batch: Option<Batch>,
}

impl Animator {
    pub(crate) fn new(step_delay: Duration) -> Self {
        Self {
            step_delay,
            batch: None,
        }
    }

    pub(crate) fn is_animating(&self) -> bool {
        self.batch.is_some()
    }

    /// Arm a batch with its first step due immediately.
    ///
    /// Rejected (dropped, not queued) while another batch is in flight.
    pub(crate) fn start(&mut self, instructions: Vec<Instruction>, now: Instant) -> bool {
        if self.batch.is_some() {
            tracing::warn!("animation already in flight, dropping new batch");
            return false;
        }
        let total = instructions.len();
        tracing::debug!(total, "starting animation batch");
        self.batch = Some(Batch {
            pending: instructions.into(),
            total,
            next_step: 0,
            due: now,
            cancelled: false,
        });
        true
    }

    /// Mark the in-flight batch cancelled; it retires at the next due tick.
    pub(crate) fn cancel(&mut self) {
        if let Some(batch) = &mut self.batch {
            batch.cancelled = true;
        }
    }

    /// Yield at most one due event. Returns `None` while idle or before the
    /// inter-step delay has elapsed.
    pub(crate) fn take_due(&mut self, now: Instant) -> Option<AnimatorEvent> {
        let batch = self.batch.as_mut()?;
        if now < batch.due {
            return None;
        }
        if batch.cancelled || batch.pending.is_empty() {
            self.batch = None;
            return Some(AnimatorEvent::Completed);
        }

        let instruction = batch.pending.pop_front()?;
        batch.next_step += 1;
        batch.due = now + self.step_delay;
        Some(AnimatorEvent::Step {
            instruction,
            step: batch.next_step,
            total: batch.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::LineSpec;

    fn line(x2: f64) -> Instruction {
        Instruction::Line(LineSpec {
            x1: 0.0,
            y1: 0.0,
            x2,
            y2: 0.0,
            width: None,
            color: None,
        })
    }

    #[test]
    fn second_start_is_rejected_until_completion() {
        let mut anim = Animator::new(STEP_DELAY);
        let t0 = Instant::now();
        assert!(anim.start(vec![line(1.0)], t0));
        assert!(!anim.start(vec![line(2.0)], t0));

        assert!(matches!(
            anim.take_due(t0),
            Some(AnimatorEvent::Step { step: 1, total: 1, .. })
        ));
        assert!(matches!(
            anim.take_due(t0 + STEP_DELAY),
            Some(AnimatorEvent::Completed)
        ));
        assert!(anim.start(vec![line(2.0)], t0 + STEP_DELAY));
    }

    #[test]
    fn steps_wait_for_the_inter_step_delay() {
        let mut anim = Animator::new(STEP_DELAY);
        let t0 = Instant::now();
        anim.start(vec![line(1.0), line(2.0)], t0);

        assert!(matches!(
            anim.take_due(t0),
            Some(AnimatorEvent::Step { step: 1, .. })
        ));
        assert!(anim.take_due(t0).is_none());
        assert!(
            anim.take_due(t0 + STEP_DELAY - Duration::from_millis(1))
                .is_none()
        );
        assert!(matches!(
            anim.take_due(t0 + STEP_DELAY),
            Some(AnimatorEvent::Step { step: 2, total: 2, .. })
        ));
    }

    #[test]
    fn empty_batch_completes_on_first_tick() {
        let mut anim = Animator::new(STEP_DELAY);
        let t0 = Instant::now();
        anim.start(Vec::new(), t0);
        assert!(matches!(anim.take_due(t0), Some(AnimatorEvent::Completed)));
        assert!(!anim.is_animating());
    }

    #[test]
    fn cancel_retires_without_further_steps() {
        let mut anim = Animator::new(STEP_DELAY);
        let t0 = Instant::now();
        anim.start(vec![line(1.0), line(2.0), line(3.0)], t0);
        assert!(matches!(
            anim.take_due(t0),
            Some(AnimatorEvent::Step { step: 1, .. })
        ));

        anim.cancel();
        assert!(matches!(
            anim.take_due(t0 + STEP_DELAY),
            Some(AnimatorEvent::Completed)
        ));
        assert!(!anim.is_animating());
    }
}
