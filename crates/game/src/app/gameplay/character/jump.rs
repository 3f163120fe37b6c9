use engine::FrameTime;
use tracing::debug;

use super::CharacterController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JumpPhase {
    Idle,
    Ascending,
    Descending,
}

/// Resumable jump: rises for the first half of `jump_time`, falls for the
/// second, then snaps back to `base_y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct JumpTask {
    pub phase: JumpPhase,
    pub start_time: f32,
    pub base_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum JumpStep {
    Moved(f32),
    Landed { base_y: f32 },
}

impl JumpTask {
    fn new(start_time: f32, base_y: f32) -> Self {
        Self {
            phase: JumpPhase::Idle,
            start_time,
            base_y,
        }
    }

    fn step(&mut self, frame: FrameTime, jump_time: f32, jump_speed: f32) -> JumpStep {
        let elapsed = frame.time_seconds - self.start_time;
        let distance = jump_speed * frame.delta_seconds;
        if elapsed <= jump_time / 2.0 {
            self.phase = JumpPhase::Ascending;
            JumpStep::Moved(distance)
        } else if elapsed <= jump_time {
            self.phase = JumpPhase::Descending;
            JumpStep::Moved(-distance)
        } else {
            self.phase = JumpPhase::Idle;
            JumpStep::Landed {
                base_y: self.base_y,
            }
        }
    }
}

impl CharacterController {
    /// Starts a jump unless one is already running. Returns whether a new
    /// jump was started.
    pub(crate) fn jump(&mut self, frame: FrameTime) -> bool {
        if self.jump.is_some() {
            return false;
        }
        self.jump = Some(JumpTask::new(frame.time_seconds, self.transform.position.y));
        self.is_jumping = true;
        debug!(id = self.id.0, start_time = frame.time_seconds, "jump_started");
        true
    }

    pub(crate) fn step_jump(&mut self, frame: FrameTime) {
        let Some(task) = self.jump.as_mut() else {
            return;
        };
        match task.step(frame, self.config.jump_time, self.config.jump_speed) {
            JumpStep::Moved(dy) => self.transform.position.y += dy,
            JumpStep::Landed { base_y } => {
                self.transform.position.y = base_y;
                self.is_jumping = false;
                self.jump = None;
                debug!(id = self.id.0, "jump_landed");
            }
        }
    }

    pub(crate) fn jump_task(&self) -> Option<&JumpTask> {
        self.jump.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{CharacterConfig, JUMPING_TRIGGER};
    use super::*;

    fn jumper(jump_time: f32, jump_speed: f32) -> CharacterController {
        let (mut controller, _flag) = attached(
            CharacterConfig {
                jump_time,
                jump_speed,
                ..CharacterConfig::default()
            },
            None,
        );
        controller.transform.position.y = 1.25;
        controller
    }

    fn run_ticks(controller: &mut CharacterController, start: f32, dt: f32, ticks: usize) {
        for tick in 0..ticks {
            let now = start + tick as f32 * dt;
            controller.pre_update();
            controller.step_jump(frame(now, dt));
            controller.late_update();
        }
    }

    #[test]
    fn jump_rises_then_falls_and_lands_exactly() {
        let mut controller = jumper(0.5, 5.0);
        let dt = 1.0 / 60.0;
        assert!(controller.jump(frame(0.0, dt)));

        controller.step_jump(frame(0.0, dt));
        assert_eq!(controller.jump_task().map(|task| task.phase), Some(JumpPhase::Ascending));
        assert!(controller.position().y > 1.25);

        run_ticks(&mut controller, dt, dt, 20);
        assert_eq!(
            controller.jump_task().map(|task| task.phase),
            Some(JumpPhase::Descending)
        );

        run_ticks(&mut controller, 21.0 * dt, dt, 20);
        assert_eq!(controller.position().y, 1.25);
        assert!(controller.jump_task().is_none());
        assert!(!controller.is_jumping());
        assert!(controller.jump(frame(1.0, dt)));
    }

    #[test]
    fn lands_exactly_with_coarse_uneven_ticks() {
        let mut controller = jumper(0.7, 3.3);
        assert!(controller.jump(frame(2.0, 0.3)));
        let mut now = 2.0;
        for dt in [0.3, 0.11, 0.29, 0.07, 0.5] {
            controller.step_jump(frame(now, dt));
            now += dt;
        }
        assert_eq!(controller.position().y, 1.25);
        assert!(controller.jump_task().is_none());
    }

    #[test]
    fn second_jump_while_active_is_ignored() {
        let mut controller = jumper(0.5, 5.0);
        assert!(controller.jump(frame(0.0, 0.1)));
        let first = *controller.jump_task().expect("task");
        controller.step_jump(frame(0.0, 0.1));

        assert!(!controller.jump(frame(0.1, 0.1)));
        let task = controller.jump_task().expect("task");
        assert_eq!(task.start_time, first.start_time);
        assert_eq!(task.base_y, first.base_y);
    }

    #[test]
    fn jump_trigger_fires_on_rising_edge_only() {
        let mut controller = jumper(0.2, 5.0);
        controller.jump(frame(0.0, 0.1));
        controller.late_update();
        let animator = controller.animator_mut().expect("animator");
        assert_eq!(animator.take_triggers(), vec![JUMPING_TRIGGER.to_string()]);

        run_ticks(&mut controller, 0.0, 0.1, 5);
        assert!(!controller.is_jumping());
        let animator = controller.animator_mut().expect("animator");
        assert!(animator.take_triggers().is_empty());
    }
}
