use engine::{EntityId, Vec2};

use super::character::MoveDirection;

const WANDER_ARRIVAL_THRESHOLD: f32 = 0.1;

/// NPC pacing: walk between two points either side of home, jumping at
/// every turn. Even ids head right first, odd ids left.
#[derive(Debug, Clone)]
pub(crate) struct Wander {
    home: Vec2,
    offset: f32,
    heading_right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WanderStep {
    Walk(MoveDirection),
    Turned,
}

impl Wander {
    pub(crate) fn new(actor_id: EntityId, home: Vec2, offset: f32) -> Self {
        Self {
            home,
            offset: offset.abs(),
            heading_right: actor_id.0 % 2 == 0,
        }
    }

    pub(crate) fn target(&self) -> Vec2 {
        let direction = if self.heading_right { 1.0 } else { -1.0 };
        Vec2::new(self.home.x + direction * self.offset, self.home.y)
    }

    /// Used when the path ahead is blocked.
    pub(crate) fn turn(&mut self) {
        self.heading_right = !self.heading_right;
    }

    pub(crate) fn step(&mut self, position: Vec2) -> WanderStep {
        let dx = self.target().x - position.x;
        let reached = if self.heading_right {
            dx <= WANDER_ARRIVAL_THRESHOLD
        } else {
            dx >= -WANDER_ARRIVAL_THRESHOLD
        };
        if reached {
            self.turn();
            return WanderStep::Turned;
        }
        if self.heading_right {
            WanderStep::Walk(MoveDirection::Right)
        } else {
            WanderStep::Walk(MoveDirection::Left)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_picks_first_heading() {
        let even = Wander::new(EntityId(2), Vec2::ZERO, 1.5);
        let odd = Wander::new(EntityId(3), Vec2::ZERO, 1.5);
        assert_eq!(even.target(), Vec2::new(1.5, 0.0));
        assert_eq!(odd.target(), Vec2::new(-1.5, 0.0));
    }

    #[test]
    fn turns_at_target_and_heads_back() {
        let mut wander = Wander::new(EntityId(2), Vec2::new(1.0, 1.0), 1.0);
        assert_eq!(
            wander.step(Vec2::new(1.0, 1.0)),
            WanderStep::Walk(MoveDirection::Right)
        );
        assert_eq!(wander.step(Vec2::new(1.95, 1.0)), WanderStep::Turned);
        assert_eq!(wander.target(), Vec2::new(0.0, 1.0));
        assert_eq!(
            wander.step(Vec2::new(1.95, 1.0)),
            WanderStep::Walk(MoveDirection::Left)
        );
    }

    #[test]
    fn overshoot_still_counts_as_arrival() {
        let mut wander = Wander::new(EntityId(3), Vec2::ZERO, 1.0);
        assert_eq!(wander.step(Vec2::new(-3.0, 0.0)), WanderStep::Turned);
    }
}
