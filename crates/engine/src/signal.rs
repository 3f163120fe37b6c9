use crate::app::EntityId;

/// Ordered, duplicate-free list of listeners. The owner of the list walks
/// a snapshot and dispatches to each listener itself.
#[derive(Debug, Clone)]
pub struct Subscribers<K> {
    listeners: Vec<K>,
}

impl<K> Default for Subscribers<K> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<K: Copy + PartialEq> Subscribers<K> {
    /// Returns false when `listener` was already subscribed.
    pub fn subscribe(&mut self, listener: K) -> bool {
        if self.contains(listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    pub fn unsubscribe(&mut self, listener: K) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|existing| *existing != listener);
        self.listeners.len() != before
    }

    pub fn contains(&self, listener: K) -> bool {
        self.listeners.contains(&listener)
    }

    pub fn snapshot(&self) -> Vec<K> {
        self.listeners.clone()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagChange {
    pub value: bool,
    pub subscribers: Vec<EntityId>,
}

/// Shared boolean with an update notification. Writes that do not change
/// the value notify nobody.
#[derive(Debug, Clone, Default)]
pub struct ObservableBool {
    value: bool,
    on_updated: Subscribers<EntityId>,
}

impl ObservableBool {
    pub fn new(value: bool) -> Self {
        Self {
            value,
            on_updated: Subscribers::default(),
        }
    }

    pub fn get(&self) -> bool {
        self.value
    }

    #[must_use]
    pub fn set(&mut self, value: bool) -> Option<FlagChange> {
        if self.value == value {
            return None;
        }
        self.value = value;
        Some(FlagChange {
            value,
            subscribers: self.on_updated.snapshot(),
        })
    }

    pub fn subscribe(&mut self, listener: EntityId) -> bool {
        self.on_updated.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, listener: EntityId) -> bool {
        self.on_updated.unsubscribe(listener)
    }

    pub fn is_subscribed(&self, listener: EntityId) -> bool {
        self.on_updated.contains(listener)
    }

    pub fn subscriber_count(&self) -> usize {
        self.on_updated.len()
    }
}
