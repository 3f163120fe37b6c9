use engine::{EntityId, EventDef, Subscribers};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Dialogue {
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuestStatus {
    Available,
    Active,
    Completed,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuestObjective {
    pub item_tag: String,
    pub required: u32,
    pub collected: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Quest {
    pub title: String,
    pub objective: QuestObjective,
    pub status: QuestStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RpgEvent {
    Dialogue(Dialogue),
    Quest(Quest),
}

impl RpgEvent {
    pub(crate) fn from_def(def: &EventDef) -> Self {
        match def {
            EventDef::Dialogue { lines } => RpgEvent::Dialogue(Dialogue {
                lines: lines.clone(),
            }),
            EventDef::Quest {
                title,
                item_tag,
                required,
            } => RpgEvent::Quest(Quest {
                title: title.clone(),
                objective: QuestObjective {
                    item_tag: item_tag.clone(),
                    required: *required,
                    collected: 0,
                },
                status: QuestStatus::Available,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoticeKind {
    Triggered,
    Completed,
    Closed,
}

/// Notification raised by an [`EventTrigger`], carrying the event as it was
/// when the notification fired.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RpgEventNotice {
    pub kind: NoticeKind,
    pub event: RpgEvent,
}

/// Ordered narrative events attached to one character. The first event
/// that is not a closed quest is the current one; a dialogue stays current
/// after it closes unless another event follows it.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventTrigger {
    name: String,
    events: Vec<RpgEvent>,
    cursor: usize,
    triggered: bool,
    on_triggered: Subscribers<EntityId>,
    on_completed: Subscribers<EntityId>,
    on_closed: Subscribers<EntityId>,
    outbox: Vec<RpgEventNotice>,
}

impl EventTrigger {
    pub(crate) fn new(events: Vec<RpgEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub(crate) fn from_defs(defs: &[EventDef]) -> Self {
        Self::new(defs.iter().map(RpgEvent::from_def).collect())
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn event_count(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn current_event(&self) -> Option<&RpgEvent> {
        self.events.get(self.cursor).filter(|event| {
            !matches!(
                event,
                RpgEvent::Quest(Quest {
                    status: QuestStatus::Closed,
                    ..
                })
            )
        })
    }

    pub(crate) fn has_events(&self) -> bool {
        self.current_event().is_some()
    }

    pub(crate) fn has_dialogue(&self) -> bool {
        matches!(self.current_event(), Some(RpgEvent::Dialogue(_)))
    }

    pub(crate) fn has_quest(&self) -> bool {
        matches!(self.current_event(), Some(RpgEvent::Quest(_)))
    }

    pub(crate) fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub(crate) fn set_triggered(&mut self, triggered: bool) {
        self.triggered = triggered;
    }

    pub(crate) fn has_open_quest(&self) -> bool {
        matches!(
            self.current_event(),
            Some(RpgEvent::Quest(Quest {
                status: QuestStatus::Active | QuestStatus::Completed,
                ..
            }))
        )
    }

    /// Fires the current event. A dialogue without lines, or a quest that
    /// was already accepted, cannot fire.
    pub(crate) fn trigger_event(&mut self) -> bool {
        let notice_event = match self.events.get_mut(self.cursor) {
            Some(RpgEvent::Dialogue(dialogue)) if !dialogue.lines.is_empty() => {
                RpgEvent::Dialogue(dialogue.clone())
            }
            Some(RpgEvent::Quest(quest)) if quest.status == QuestStatus::Available => {
                quest.status = QuestStatus::Active;
                info!(trigger = %self.name, quest = %quest.title, "quest_accepted");
                RpgEvent::Quest(quest.clone())
            }
            _ => return false,
        };
        self.push_notice(NoticeKind::Triggered, notice_event);
        true
    }

    /// Counts one collected item toward the active quest. Returns true when
    /// the item was needed.
    pub(crate) fn record_item_collected(&mut self, item_tag: &str) -> bool {
        let Some(RpgEvent::Quest(quest)) = self.events.get_mut(self.cursor) else {
            return false;
        };
        if quest.status != QuestStatus::Active || quest.objective.item_tag != item_tag {
            return false;
        }
        quest.objective.collected = (quest.objective.collected + 1).min(quest.objective.required);
        debug!(
            trigger = %self.name,
            quest = %quest.title,
            collected = quest.objective.collected,
            required = quest.objective.required,
            "quest_progress"
        );
        if quest.objective.collected >= quest.objective.required {
            quest.status = QuestStatus::Completed;
            let snapshot = RpgEvent::Quest(quest.clone());
            self.push_notice(NoticeKind::Completed, snapshot);
        }
        true
    }

    pub(crate) fn try_close_quest(&mut self) -> bool {
        let snapshot = match self.events.get_mut(self.cursor) {
            Some(RpgEvent::Quest(quest)) if quest.status == QuestStatus::Completed => {
                quest.status = QuestStatus::Closed;
                info!(trigger = %self.name, quest = %quest.title, "quest_closed");
                RpgEvent::Quest(quest.clone())
            }
            _ => return false,
        };
        self.advance_cursor();
        self.push_notice(NoticeKind::Closed, snapshot);
        true
    }

    pub(crate) fn close_dialogue(&mut self) -> bool {
        let snapshot = match self.events.get(self.cursor) {
            Some(RpgEvent::Dialogue(dialogue)) => RpgEvent::Dialogue(dialogue.clone()),
            _ => return false,
        };
        self.advance_cursor();
        self.push_notice(NoticeKind::Closed, snapshot);
        true
    }

    fn advance_cursor(&mut self) {
        if self.cursor + 1 < self.events.len() {
            self.cursor += 1;
        }
    }

    fn push_notice(&mut self, kind: NoticeKind, event: RpgEvent) {
        debug!(trigger = %self.name, ?kind, "rpg_event_notice_queued");
        self.outbox.push(RpgEventNotice { kind, event });
    }

    pub(crate) fn subscribe(&mut self, kind: NoticeKind, listener: EntityId) -> bool {
        self.subscribers_mut(kind).subscribe(listener)
    }

    pub(crate) fn unsubscribe(&mut self, kind: NoticeKind, listener: EntityId) -> bool {
        self.subscribers_mut(kind).unsubscribe(listener)
    }

    pub(crate) fn unsubscribe_all(&mut self, listener: EntityId) {
        for kind in [NoticeKind::Triggered, NoticeKind::Completed, NoticeKind::Closed] {
            self.unsubscribe(kind, listener);
        }
    }

    pub(crate) fn is_subscribed(&self, kind: NoticeKind, listener: EntityId) -> bool {
        match kind {
            NoticeKind::Triggered => self.on_triggered.contains(listener),
            NoticeKind::Completed => self.on_completed.contains(listener),
            NoticeKind::Closed => self.on_closed.contains(listener),
        }
    }

    fn subscribers_mut(&mut self, kind: NoticeKind) -> &mut Subscribers<EntityId> {
        match kind {
            NoticeKind::Triggered => &mut self.on_triggered,
            NoticeKind::Completed => &mut self.on_completed,
            NoticeKind::Closed => &mut self.on_closed,
        }
    }

    pub(crate) fn take_notifications(&mut self) -> Vec<RpgEventNotice> {
        std::mem::take(&mut self.outbox)
    }

    /// Quest currently in progress, for status display.
    pub(crate) fn open_quest(&self) -> Option<&Quest> {
        match self.current_event() {
            Some(RpgEvent::Quest(quest))
                if matches!(quest.status, QuestStatus::Active | QuestStatus::Completed) =>
            {
                Some(quest)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialogue(lines: &[&str]) -> RpgEvent {
        RpgEvent::Dialogue(Dialogue {
            lines: lines.iter().map(|line| line.to_string()).collect(),
        })
    }

    fn quest(item_tag: &str, required: u32) -> RpgEvent {
        RpgEvent::Quest(Quest {
            title: "Herbs".to_string(),
            objective: QuestObjective {
                item_tag: item_tag.to_string(),
                required,
                collected: 0,
            },
            status: QuestStatus::Available,
        })
    }

    fn kinds(notices: &[RpgEventNotice]) -> Vec<NoticeKind> {
        notices.iter().map(|notice| notice.kind).collect()
    }

    #[test]
    fn dialogue_fires_and_closes_into_next_event() {
        let mut trigger = EventTrigger::new(vec![dialogue(&["hi"]), quest("herb", 1)]);
        assert!(trigger.has_dialogue());
        assert!(trigger.trigger_event());
        assert!(trigger.close_dialogue());
        assert!(trigger.has_quest());
        assert_eq!(
            kinds(&trigger.take_notifications()),
            vec![NoticeKind::Triggered, NoticeKind::Closed]
        );
    }

    #[test]
    fn last_dialogue_stays_current_after_closing() {
        let mut trigger = EventTrigger::new(vec![dialogue(&["hi"])]);
        assert!(trigger.trigger_event());
        assert!(trigger.close_dialogue());
        assert!(trigger.has_dialogue());
        assert!(trigger.trigger_event());
    }

    #[test]
    fn empty_dialogue_cannot_fire() {
        let mut trigger = EventTrigger::new(vec![dialogue(&[])]);
        assert!(!trigger.trigger_event());
        assert!(trigger.take_notifications().is_empty());
    }

    #[test]
    fn quest_lifecycle_runs_available_active_completed_closed() {
        let mut trigger = EventTrigger::new(vec![quest("herb", 2)]);
        assert!(!trigger.has_open_quest());
        assert!(trigger.trigger_event());
        assert!(trigger.has_open_quest());
        assert!(!trigger.trigger_event());
        assert!(!trigger.try_close_quest());

        assert!(!trigger.record_item_collected("stone"));
        assert!(trigger.record_item_collected("herb"));
        assert_eq!(trigger.open_quest().map(|q| q.status), Some(QuestStatus::Active));
        assert!(trigger.record_item_collected("herb"));
        assert_eq!(
            trigger.open_quest().map(|q| q.status),
            Some(QuestStatus::Completed)
        );

        assert!(trigger.try_close_quest());
        assert!(!trigger.has_events());
        assert!(!trigger.has_open_quest());
        assert_eq!(
            kinds(&trigger.take_notifications()),
            vec![NoticeKind::Triggered, NoticeKind::Completed, NoticeKind::Closed]
        );
    }

    #[test]
    fn items_before_acceptance_do_not_count() {
        let mut trigger = EventTrigger::new(vec![quest("herb", 1)]);
        assert!(!trigger.record_item_collected("herb"));
        assert!(trigger.take_notifications().is_empty());
    }

    #[test]
    fn subscriptions_are_per_kind() {
        let mut trigger = EventTrigger::new(vec![dialogue(&["hi"])]);
        let id = EntityId(3);
        assert!(trigger.subscribe(NoticeKind::Triggered, id));
        assert!(!trigger.subscribe(NoticeKind::Triggered, id));
        assert!(trigger.is_subscribed(NoticeKind::Triggered, id));
        assert!(!trigger.is_subscribed(NoticeKind::Closed, id));

        trigger.subscribe(NoticeKind::Closed, id);
        trigger.unsubscribe_all(id);
        assert!(!trigger.is_subscribed(NoticeKind::Triggered, id));
        assert!(!trigger.is_subscribed(NoticeKind::Closed, id));
    }

    #[test]
    fn from_defs_starts_quests_available() {
        let trigger = EventTrigger::from_defs(&[EventDef::Quest {
            title: "Herbs".to_string(),
            item_tag: "herb".to_string(),
            required: 3,
        }]);
        assert_eq!(trigger.event_count(), 1);
        match trigger.current_event() {
            Some(RpgEvent::Quest(quest)) => {
                assert_eq!(quest.status, QuestStatus::Available);
                assert_eq!(quest.objective.required, 3);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
