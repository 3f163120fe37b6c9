use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacterDefId(pub u32);

/// Narrative event as authored; the game turns these into runtime events
/// with their own progress state.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDef {
    Dialogue {
        lines: Vec<String>,
    },
    Quest {
        title: String,
        item_tag: String,
        required: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterDef {
    pub id: CharacterDefId,
    pub def_name: String,
    pub label: String,
    pub move_speed: f32,
    pub jump_time: f32,
    pub jump_speed: f32,
    pub idle_clip: Option<String>,
    pub walking_clip: Option<String>,
    pub jumping_clip: Option<String>,
    pub dialogue_bark: bool,
    pub quest_bark: bool,
    pub events: Vec<EventDef>,
}

#[derive(Debug, Default, Clone)]
pub struct DefDatabase {
    character_defs: Vec<CharacterDef>,
    character_ids_by_name: HashMap<String, CharacterDefId>,
}

impl DefDatabase {
    /// Ids follow input order; callers pass defs sorted by name.
    pub(crate) fn from_character_defs(mut character_defs: Vec<CharacterDef>) -> Self {
        let mut character_ids_by_name = HashMap::with_capacity(character_defs.len());
        for (idx, def) in character_defs.iter_mut().enumerate() {
            let id = CharacterDefId(idx as u32);
            def.id = id;
            character_ids_by_name.insert(def.def_name.clone(), id);
        }
        Self {
            character_defs,
            character_ids_by_name,
        }
    }

    pub fn character_def_id_by_name(&self, name: &str) -> Option<CharacterDefId> {
        self.character_ids_by_name.get(name).copied()
    }

    pub fn character_def(&self, id: CharacterDefId) -> Option<&CharacterDef> {
        self.character_defs.get(id.0 as usize)
    }

    pub fn character_def_by_name(&self, name: &str) -> Option<&CharacterDef> {
        self.character_def_id_by_name(name)
            .and_then(|id| self.character_def(id))
    }

    pub fn character_defs(&self) -> &[CharacterDef] {
        &self.character_defs
    }
}
