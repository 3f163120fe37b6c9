//! Character controller shared by the player and NPCs.
//!
//! Per tick the host calls [`CharacterController::pre_update`], then any
//! movement or jump requests, then [`CharacterController::step_jump`], then
//! trigger and pickup dispatch, and finally
//! [`CharacterController::late_update`] to push animation state.

mod interaction;
mod jump;
mod movement;

use engine::{
    AnimationClip, Animator, CharacterDef, EntityId, LayerMask, LayerRegistry, ObservableBool,
    Transform, Vec2, MAP_LAYER, OBSTACLE_LAYER,
};
use tracing::debug;

use super::player::Player;
use super::rpg_event::EventTrigger;

pub(crate) use interaction::PickupOutcome;
pub(crate) use jump::JumpTask;
pub(crate) use movement::MoveDirection;

pub(crate) const PLAYER_TAG: &str = "Player";
pub(crate) const WALKING_PARAM: &str = "IsWalking";
pub(crate) const JUMPING_TRIGGER: &str = "IsJumping";
pub(crate) const IDLE_CLIP_SLOT: &str = "KnightIdle";
pub(crate) const WALKING_CLIP_SLOT: &str = "KnightWalking";
pub(crate) const JUMPING_CLIP_SLOT: &str = "KnightJumping";
pub(crate) const CLIP_SLOTS: [&str; 3] = [IDLE_CLIP_SLOT, WALKING_CLIP_SLOT, JUMPING_CLIP_SLOT];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CharacterConfig {
    pub name: String,
    pub move_speed: f32,
    pub jump_time: f32,
    pub jump_speed: f32,
    pub idle_clip: Option<AnimationClip>,
    pub walking_clip: Option<AnimationClip>,
    pub jumping_clip: Option<AnimationClip>,
    pub dialogue_bark: bool,
    pub quest_bark: bool,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            move_speed: 1.0,
            jump_time: 0.5,
            jump_speed: 5.0,
            idle_clip: None,
            walking_clip: None,
            jumping_clip: None,
            dialogue_bark: false,
            quest_bark: false,
        }
    }
}

impl CharacterConfig {
    pub(crate) fn from_def(def: &CharacterDef) -> Self {
        Self {
            name: def.label.clone(),
            move_speed: def.move_speed,
            jump_time: def.jump_time,
            jump_speed: def.jump_speed,
            idle_clip: def.idle_clip.as_deref().map(AnimationClip::new),
            walking_clip: def.walking_clip.as_deref().map(AnimationClip::new),
            jumping_clip: def.jumping_clip.as_deref().map(AnimationClip::new),
            dialogue_bark: def.dialogue_bark,
            quest_bark: def.quest_bark,
        }
    }
}

/// Small indicator above a character advertising dialogue or a quest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Bark {
    active: bool,
}

impl Bark {
    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }
}

#[derive(Debug)]
pub(crate) struct CharacterController {
    id: EntityId,
    config: CharacterConfig,
    pub(crate) transform: Transform,
    animator: Option<Animator>,
    dialogue_bark: Option<Bark>,
    quest_bark: Option<Bark>,
    event_trigger: Option<EventTrigger>,
    can_move: bool,
    is_walking: bool,
    is_walking_last: bool,
    is_jumping: bool,
    is_jumping_last: bool,
    is_left: bool,
    is_left_last: bool,
    local_scale: Vec2,
    obstacle_mask: LayerMask,
    jump: Option<JumpTask>,
    player: Option<EntityId>,
    in_range_of_player: bool,
    use_physics: bool,
}

impl CharacterController {
    pub(crate) fn new(
        id: EntityId,
        config: CharacterConfig,
        transform: Transform,
        animator: Option<Animator>,
        event_trigger: Option<EventTrigger>,
    ) -> Self {
        let dialogue_bark = config.dialogue_bark.then(Bark::default);
        let quest_bark = config.quest_bark.then(Bark::default);
        Self {
            id,
            config,
            transform,
            animator,
            dialogue_bark,
            quest_bark,
            event_trigger,
            can_move: false,
            is_walking: false,
            is_walking_last: false,
            is_jumping: false,
            is_jumping_last: false,
            is_left: false,
            is_left_last: false,
            local_scale: transform.local_scale,
            obstacle_mask: LayerMask::NONE,
            jump: None,
            player: None,
            in_range_of_player: false,
            use_physics: false,
        }
    }

    /// Scene-load wiring. Barks start hidden and only reappear for the
    /// current narrative event; an event trigger with no events is dropped.
    pub(crate) fn attach(&mut self, in_dialogue: &mut ObservableBool, layers: &LayerRegistry) {
        if let Some(bark) = self.quest_bark.as_mut() {
            bark.set_active(false);
        }
        if let Some(bark) = self.dialogue_bark.as_mut() {
            bark.set_active(false);
        }

        if self
            .event_trigger
            .as_ref()
            .is_some_and(|trigger| trigger.event_count() == 0)
        {
            self.event_trigger = None;
        }
        if let Some(trigger) = self.event_trigger.as_mut() {
            trigger.set_name(&self.config.name);
            self.update_rpg_event();
        }

        if let Some(animator) = self.animator.as_mut() {
            for (slot, clip) in [
                (IDLE_CLIP_SLOT, &self.config.idle_clip),
                (WALKING_CLIP_SLOT, &self.config.walking_clip),
                (JUMPING_CLIP_SLOT, &self.config.jumping_clip),
            ] {
                if let Some(clip) = clip {
                    animator.override_clip(slot, clip.clone());
                }
            }
        }

        self.local_scale = self.transform.local_scale;
        self.set_can_move(true);
        in_dialogue.subscribe(self.id);
        self.obstacle_mask = layers.mask_of(&[MAP_LAYER, OBSTACLE_LAYER]);
        debug!(id = self.id.0, name = %self.config.name, "character_attached");
    }

    /// Destroy hook: drops every subscription this character holds.
    pub(crate) fn detach(&mut self, in_dialogue: &mut ObservableBool, player: Option<&mut Player>) {
        in_dialogue.unsubscribe(self.id);
        if let Some(player) = player {
            player.unsubscribe_pickup(self.id);
        }
        if let Some(trigger) = self.event_trigger.as_mut() {
            trigger.unsubscribe_all(self.id);
        }
        self.player = None;
        self.in_range_of_player = false;
        self.jump = None;
        debug!(id = self.id.0, name = %self.config.name, "character_detached");
    }

    pub(crate) fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.config.name
    }

    pub(crate) fn config(&self) -> &CharacterConfig {
        &self.config
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.transform.position
    }

    pub(crate) fn set_can_move(&mut self, can_move: bool) {
        self.can_move = can_move;
    }

    pub(crate) fn can_move(&self) -> bool {
        self.can_move
    }

    pub(crate) fn is_walking(&self) -> bool {
        self.is_walking
    }

    pub(crate) fn is_jumping(&self) -> bool {
        self.is_jumping
    }

    pub(crate) fn is_facing_left(&self) -> bool {
        self.is_left
    }

    pub(crate) fn in_range_of_player(&self) -> bool {
        self.in_range_of_player
    }

    pub(crate) fn set_physics(&mut self, use_physics: bool) {
        self.use_physics = use_physics;
    }

    pub(crate) fn uses_physics(&self) -> bool {
        self.use_physics
    }

    pub(crate) fn animator(&self) -> Option<&Animator> {
        self.animator.as_ref()
    }

    pub(crate) fn animator_mut(&mut self) -> Option<&mut Animator> {
        self.animator.as_mut()
    }

    pub(crate) fn dialogue_bark(&self) -> Option<Bark> {
        self.dialogue_bark
    }

    pub(crate) fn quest_bark(&self) -> Option<Bark> {
        self.quest_bark
    }

    pub(crate) fn event_trigger(&self) -> Option<&EventTrigger> {
        self.event_trigger.as_ref()
    }

    pub(crate) fn event_trigger_mut(&mut self) -> Option<&mut EventTrigger> {
        self.event_trigger.as_mut()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::app::gameplay::rpg_event::{Dialogue, RpgEvent};

    #[test]
    fn attach_unlocks_subscribes_and_builds_obstacle_mask() {
        let (controller, flag) = attached(CharacterConfig::default(), None);
        assert!(controller.can_move());
        assert!(flag.is_subscribed(controller.id()));
        let layers = LayerRegistry::default();
        assert!(controller
            .obstacle_mask
            .contains(layers.name_to_layer(MAP_LAYER).expect("map")));
        assert!(controller
            .obstacle_mask
            .contains(layers.name_to_layer(OBSTACLE_LAYER).expect("obstacle")));
    }

    #[test]
    fn attach_drops_empty_event_trigger() {
        let (controller, _flag) = attached(
            CharacterConfig::default(),
            Some(EventTrigger::new(Vec::new())),
        );
        assert!(controller.event_trigger().is_none());
    }

    #[test]
    fn attach_names_trigger_and_shows_bark_for_current_event() {
        let config = CharacterConfig {
            name: "Elder".to_string(),
            dialogue_bark: true,
            quest_bark: true,
            ..CharacterConfig::default()
        };
        let trigger = EventTrigger::new(vec![RpgEvent::Dialogue(Dialogue {
            lines: vec!["hello".to_string()],
        })]);
        let (controller, _flag) = attached(config, Some(trigger));
        assert_eq!(controller.event_trigger().map(EventTrigger::name), Some("Elder"));
        assert_eq!(controller.dialogue_bark().map(|bark| bark.is_active()), Some(true));
        assert_eq!(controller.quest_bark().map(|bark| bark.is_active()), Some(false));
    }

    #[test]
    fn attach_overrides_configured_clips_only() {
        let config = CharacterConfig {
            walking_clip: Some(AnimationClip::new("ElderWalk")),
            ..CharacterConfig::default()
        };
        let (controller, _flag) = attached(config, None);
        let animator = controller.animator().expect("animator");
        assert_eq!(
            animator.clip(WALKING_CLIP_SLOT).map(|clip| clip.name.as_str()),
            Some("ElderWalk")
        );
        assert_eq!(
            animator.clip(IDLE_CLIP_SLOT).map(|clip| clip.name.as_str()),
            Some(IDLE_CLIP_SLOT)
        );
    }

    #[test]
    fn detach_drops_flag_subscription() {
        let (mut controller, mut flag) = attached(CharacterConfig::default(), None);
        controller.detach(&mut flag, None);
        assert!(!flag.is_subscribed(controller.id()));
    }

    #[test]
    fn config_from_def_copies_tuning() {
        let def = CharacterDef {
            id: engine::CharacterDefId(0),
            def_name: "npc.elder".to_string(),
            label: "Elder".to_string(),
            move_speed: 2.0,
            jump_time: 0.8,
            jump_speed: 3.0,
            idle_clip: None,
            walking_clip: Some("ElderWalk".to_string()),
            jumping_clip: None,
            dialogue_bark: true,
            quest_bark: false,
            events: Vec::new(),
        };
        let config = CharacterConfig::from_def(&def);
        assert_eq!(config.name, "Elder");
        assert_eq!(config.walking_clip, Some(AnimationClip::new("ElderWalk")));
        assert!(config.dialogue_bark && !config.quest_bark);
    }
}
