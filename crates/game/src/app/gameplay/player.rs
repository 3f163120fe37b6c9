use engine::{EntityId, FrameTime, InputAction, InputSnapshot, ObservableBool, ObstacleQuery, Subscribers};

use super::character::{CharacterController, MoveDirection};

const MOVE_BINDINGS: [(InputAction, MoveDirection); 4] = [
    (InputAction::MoveUp, MoveDirection::Up),
    (InputAction::MoveDown, MoveDirection::Down),
    (InputAction::MoveLeft, MoveDirection::Left),
    (InputAction::MoveRight, MoveDirection::Right),
];

/// The controllable character. Nearby NPCs listen on its pickup list and
/// react when the pickup action is pressed.
#[derive(Debug)]
pub(crate) struct Player {
    character: CharacterController,
    pickup: Subscribers<EntityId>,
}

impl Player {
    pub(crate) fn new(character: CharacterController) -> Self {
        Self {
            character,
            pickup: Subscribers::default(),
        }
    }

    pub(crate) fn id(&self) -> EntityId {
        self.character.id()
    }

    pub(crate) fn character(&self) -> &CharacterController {
        &self.character
    }

    pub(crate) fn character_mut(&mut self) -> &mut CharacterController {
        &mut self.character
    }

    pub(crate) fn set_can_move(&mut self, can_move: bool) {
        self.character.set_can_move(can_move);
    }

    pub(crate) fn can_move(&self) -> bool {
        self.character.can_move()
    }

    pub(crate) fn subscribe_pickup(&mut self, listener: EntityId) -> bool {
        self.pickup.subscribe(listener)
    }

    pub(crate) fn unsubscribe_pickup(&mut self, listener: EntityId) -> bool {
        self.pickup.unsubscribe(listener)
    }

    pub(crate) fn has_pickup_listeners(&self) -> bool {
        !self.pickup.is_empty()
    }

    pub(crate) fn pickup_listeners(&self) -> Vec<EntityId> {
        self.pickup.snapshot()
    }

    /// Held directions move one step each; a jump press starts a jump while
    /// movement is unlocked.
    pub(crate) fn apply_input(
        &mut self,
        input: &InputSnapshot,
        frame: FrameTime,
        obstacles: &dyn ObstacleQuery,
    ) {
        for (action, direction) in MOVE_BINDINGS {
            if input.is_down(action) {
                self.character.move_in(direction, frame, obstacles);
            }
        }
        if input.jump_pressed() && self.character.can_move() {
            self.character.jump(frame);
        }
    }

    pub(crate) fn detach(&mut self, in_dialogue: &mut ObservableBool) {
        self.character.detach(in_dialogue, None);
        self.pickup.clear();
    }
}

#[cfg(test)]
mod tests {
    use engine::Vec2;

    use super::*;
    use crate::app::gameplay::character::test_support::{attached, frame, NoObstacles};
    use crate::app::gameplay::character::CharacterConfig;

    fn player() -> (Player, ObservableBool) {
        let (character, flag) = attached(
            CharacterConfig {
                move_speed: 2.0,
                ..CharacterConfig::default()
            },
            None,
        );
        (Player::new(character), flag)
    }

    #[test]
    fn held_direction_moves_player() {
        let (mut player, _flag) = player();
        let input = InputSnapshot::empty().with_action_down(InputAction::MoveLeft, true);
        player.character_mut().pre_update();
        player.apply_input(&input, frame(0.0, 0.5), &NoObstacles);
        assert_eq!(player.character().position(), Vec2::new(-1.0, 0.0));
        assert!(player.character().is_facing_left());
    }

    #[test]
    fn jump_press_is_ignored_while_locked() {
        let (mut player, _flag) = player();
        player.set_can_move(false);
        let input = InputSnapshot::empty().with_jump_pressed(true);
        player.apply_input(&input, frame(0.0, 0.1), &NoObstacles);
        assert!(player.character().jump_task().is_none());

        player.set_can_move(true);
        player.apply_input(&input, frame(0.1, 0.1), &NoObstacles);
        assert!(player.character().jump_task().is_some());
    }

    #[test]
    fn detach_clears_pickup_listeners() {
        let (mut player, mut flag) = player();
        player.subscribe_pickup(EntityId(9));
        assert!(player.pickup_listeners().contains(&EntityId(9)));
        assert!(player.has_pickup_listeners());
        player.detach(&mut flag);
        assert!(!player.has_pickup_listeners());
        assert!(!flag.is_subscribed(player.id()));
    }
}
