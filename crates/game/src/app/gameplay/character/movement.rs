use engine::{FrameTime, ObstacleQuery, Vec2};

use super::{CharacterController, JUMPING_TRIGGER, WALKING_PARAM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
}

impl MoveDirection {
    pub(crate) fn unit(self) -> Vec2 {
        match self {
            MoveDirection::Up => Vec2::UP,
            MoveDirection::Down => Vec2::DOWN,
            MoveDirection::Left => Vec2::LEFT,
            MoveDirection::Right => Vec2::RIGHT,
        }
    }
}

impl CharacterController {
    pub(crate) fn pre_update(&mut self) {
        self.is_walking = false;
    }

    /// One step of `move_speed * delta` along `direction`, unless the
    /// obstacle probe reports something in the way. Facing follows the
    /// request even when the step is blocked.
    pub(crate) fn move_in(
        &mut self,
        direction: MoveDirection,
        frame: FrameTime,
        obstacles: &dyn ObstacleQuery,
    ) {
        if !self.can_move {
            return;
        }

        let step = self.config.move_speed * frame.delta_seconds;
        let current = self.transform.position;
        let next = current + direction.unit() * step;
        match direction {
            MoveDirection::Left => self.is_left = true,
            MoveDirection::Right => self.is_left = false,
            MoveDirection::Up | MoveDirection::Down => {}
        }

        let displacement = next - current;
        if displacement.length() > f32::EPSILON {
            if obstacles.raycast(current, displacement, step, self.obstacle_mask) {
                self.is_walking = false;
            } else {
                self.is_walking = true;
                self.transform.position = next;
            }
        }
    }

    /// Pushes animation parameters that changed since the last call and
    /// mirrors the transform when facing flipped.
    pub(crate) fn late_update(&mut self) {
        if let Some(animator) = self.animator.as_mut() {
            if self.is_walking != self.is_walking_last {
                animator.set_bool(WALKING_PARAM, self.is_walking);
            }
            if self.is_jumping != self.is_jumping_last && self.is_jumping {
                animator.set_trigger(JUMPING_TRIGGER);
            }
        }
        self.is_walking_last = self.is_walking;
        self.is_jumping_last = self.is_jumping;

        if self.is_left != self.is_left_last {
            self.local_scale.x = -self.local_scale.x;
            self.transform.local_scale = self.local_scale;
        }
        self.is_left_last = self.is_left;
    }
}
