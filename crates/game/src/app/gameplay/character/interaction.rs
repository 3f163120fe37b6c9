use engine::EntityId;
use tracing::{debug, warn};

use super::{CharacterController, PLAYER_TAG};
use crate::app::gameplay::player::Player;
use crate::app::gameplay::rpg_event::{NoticeKind, RpgEvent, RpgEventNotice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PickupOutcome {
    /// Player out of range, no captured player, or nothing to trigger.
    Ignored,
    /// In range but the trigger was already running and nothing closed.
    NoChange,
    Fired,
    FireFailed,
    QuestClosed,
}

impl CharacterController {
    /// `player` is the object behind `other` when it is the player; a
    /// player-tagged body without one still counts as in range.
    pub(crate) fn on_trigger_enter(
        &mut self,
        other_tag: &str,
        other: EntityId,
        player: Option<&mut Player>,
    ) {
        if other_tag != PLAYER_TAG {
            return;
        }
        self.in_range_of_player = true;
        self.player = player.map(|player| {
            player.unsubscribe_pickup(self.id);
            player.subscribe_pickup(self.id);
            player.id()
        });
        debug!(id = self.id.0, other = other.0, "player_in_range");
    }

    pub(crate) fn on_trigger_exit(&mut self, other_tag: &str) {
        if other_tag != PLAYER_TAG {
            return;
        }
        self.in_range_of_player = false;
        self.player = None;
        debug!(id = self.id.0, "player_out_of_range");
    }

    /// Reaction to the player's pickup action. A dialogue locks both
    /// characters before it fires; when firing fails only the triggered
    /// flag is rolled back, the locks stay until the dialogue flag clears.
    pub(crate) fn on_pickup(&mut self, player: &mut Player) -> PickupOutcome {
        if !self.in_range_of_player || self.player != Some(player.id()) {
            return PickupOutcome::Ignored;
        }
        let Some(trigger) = self.event_trigger.as_mut() else {
            return PickupOutcome::Ignored;
        };

        let mut outcome = PickupOutcome::NoChange;
        if !trigger.is_triggered() {
            trigger.set_triggered(true);
            if trigger.has_dialogue() {
                self.can_move = false;
                player.set_can_move(false);
            }
            if trigger.trigger_event() {
                outcome = PickupOutcome::Fired;
            } else {
                warn!(
                    id = self.id.0,
                    trigger = %trigger.name(),
                    "rpg_event_trigger_failed"
                );
                trigger.set_triggered(false);
                outcome = PickupOutcome::FireFailed;
            }
        }

        if trigger.is_triggered() && trigger.has_open_quest() && trigger.try_close_quest() {
            outcome = PickupOutcome::QuestClosed;
        }
        outcome
    }

    /// Drains the trigger's notifications, runs the handlers this character
    /// is subscribed for and hands every notice back to the caller.
    pub(crate) fn flush_event_notifications(&mut self) -> Vec<RpgEventNotice> {
        let Some(trigger) = self.event_trigger.as_mut() else {
            return Vec::new();
        };
        let notices = trigger.take_notifications();
        for notice in &notices {
            let subscribed = self
                .event_trigger
                .as_ref()
                .is_some_and(|trigger| trigger.is_subscribed(notice.kind, self.id));
            if !subscribed {
                continue;
            }
            match notice.kind {
                NoticeKind::Triggered => self.on_rpg_event_triggered(&notice.event),
                NoticeKind::Completed => self.on_rpg_event_completed(&notice.event),
                NoticeKind::Closed => self.on_rpg_event_closed(&notice.event),
            }
        }
        notices
    }

    pub(crate) fn on_in_dialogue_updated(&mut self, in_dialogue: bool) {
        if !in_dialogue && !self.can_move {
            self.set_can_move(true);
            debug!(id = self.id.0, "dialogue_lock_released");
        }
    }

    fn on_rpg_event_triggered(&mut self, event: &RpgEvent) {
        match event {
            RpgEvent::Dialogue(_) => {
                if let Some(bark) = self.dialogue_bark.as_mut() {
                    bark.set_active(false);
                }
            }
            RpgEvent::Quest(_) => {
                if let Some(bark) = self.quest_bark.as_mut() {
                    bark.set_active(false);
                }
            }
        }
    }

    fn on_rpg_event_completed(&mut self, event: &RpgEvent) {
        if let RpgEvent::Quest(_) = event {
            if let Some(bark) = self.quest_bark.as_mut() {
                bark.set_active(true);
            }
        }
    }

    fn on_rpg_event_closed(&mut self, event: &RpgEvent) {
        if let RpgEvent::Quest(_) = event {
            if let Some(bark) = self.quest_bark.as_mut() {
                bark.set_active(false);
            }
        }
        if let Some(trigger) = self.event_trigger.as_mut() {
            trigger.set_triggered(false);
        }
        self.update_rpg_event();
    }

    /// Shows the bark for the current event and subscribes to the
    /// notifications that event can raise.
    pub(crate) fn update_rpg_event(&mut self) {
        let Some(trigger) = self.event_trigger.as_mut() else {
            return;
        };
        if trigger.has_dialogue() {
            if let Some(bark) = self.dialogue_bark.as_mut() {
                bark.set_active(true);
            }
            trigger.subscribe(NoticeKind::Triggered, self.id);
            trigger.subscribe(NoticeKind::Closed, self.id);
        }
        if trigger.has_quest() {
            if let Some(bark) = self.quest_bark.as_mut() {
                bark.set_active(true);
            }
            trigger.subscribe(NoticeKind::Triggered, self.id);
            trigger.subscribe(NoticeKind::Completed, self.id);
            trigger.subscribe(NoticeKind::Closed, self.id);
        }
    }
}
