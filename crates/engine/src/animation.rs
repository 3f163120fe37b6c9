use std::collections::BTreeMap;

use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationClip {
    pub name: String,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone)]
struct ClipSlot {
    slot: String,
    base: AnimationClip,
    active: AnimationClip,
}

/// Parameter store plus named clip slots. Each slot starts out playing a
/// clip with the slot's own name until overridden.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    slots: Vec<ClipSlot>,
    bools: BTreeMap<String, bool>,
    pending_triggers: Vec<String>,
    write_count: u64,
}

impl Animator {
    pub fn with_slots(slot_names: &[&str]) -> Self {
        Self {
            slots: slot_names
                .iter()
                .map(|name| ClipSlot {
                    slot: (*name).to_string(),
                    base: AnimationClip::new(*name),
                    active: AnimationClip::new(*name),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn override_clip(&mut self, slot: &str, clip: AnimationClip) -> bool {
        let Some(entry) = self.slots.iter_mut().find(|entry| entry.slot == slot) else {
            warn!(slot, clip = %clip.name, "animator_unknown_clip_slot");
            return false;
        };
        debug!(slot, base = %entry.base.name, clip = %clip.name, "animator_clip_overridden");
        entry.active = clip;
        true
    }

    pub fn clip(&self, slot: &str) -> Option<&AnimationClip> {
        self.slots
            .iter()
            .find(|entry| entry.slot == slot)
            .map(|entry| &entry.active)
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.write_count = self.write_count.saturating_add(1);
        self.bools.insert(name.to_string(), value);
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.bools.get(name).copied().unwrap_or(false)
    }

    pub fn set_trigger(&mut self, name: &str) {
        self.write_count = self.write_count.saturating_add(1);
        self.pending_triggers.push(name.to_string());
    }

    /// Hands pending triggers to whoever plays them back, clearing the queue.
    pub fn take_triggers(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_triggers)
    }

    /// Number of parameter writes so far; flags are meant to be pushed only
    /// when they change.
    pub fn write_count(&self) -> u64 {
        self.write_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_play_their_own_clip_until_overridden() {
        let mut animator = Animator::with_slots(&["Idle", "Walk"]);
        assert_eq!(animator.clip("Idle").map(|clip| clip.name.as_str()), Some("Idle"));

        assert!(animator.override_clip("Walk", AnimationClip::new("ElderWalk")));
        assert_eq!(
            animator.clip("Walk").map(|clip| clip.name.as_str()),
            Some("ElderWalk")
        );
        assert!(!animator.override_clip("Swim", AnimationClip::new("ElderSwim")));
        assert!(animator.clip("Swim").is_none());
    }

    #[test]
    fn bools_default_false_and_count_writes() {
        let mut animator = Animator::default();
        assert!(!animator.get_bool("IsWalking"));
        animator.set_bool("IsWalking", true);
        assert!(animator.get_bool("IsWalking"));
        assert_eq!(animator.write_count(), 1);
    }

    #[test]
    fn triggers_queue_until_taken() {
        let mut animator = Animator::default();
        animator.set_trigger("IsJumping");
        animator.set_trigger("IsJumping");
        assert_eq!(
            animator.take_triggers(),
            vec!["IsJumping".to_string(), "IsJumping".to_string()]
        );
        assert!(animator.take_triggers().is_empty());
    }
}
