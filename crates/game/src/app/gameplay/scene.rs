use std::path::PathBuf;

use engine::{
    Aabb, Animator, EntityId, EventDef, FlagChange, FrameTime, InputSnapshot, LayerRegistry,
    ObservableBool, PhysicsWorld, RenderableDesc, RenderableKind, Scene, SceneCommand, SceneWorld,
    Transform, TriggerEvent, TriggerEventKind, Vec2, MAP_LAYER,
};
use tracing::{debug, info, warn};

use super::character::{
    Bark, CharacterConfig, CharacterController, PickupOutcome, CLIP_SLOTS, PLAYER_TAG,
};
use super::dialogue::{DialogueAdvance, DialogueRunner};
use super::player::Player;
use super::rpg_event::{EventTrigger, NoticeKind, QuestStatus, RpgEvent, RpgEventNotice};
use super::scenario::{load_scenario, ItemPlacement, NpcPlacement, ObstaclePlacement, Scenario};
use super::wander::{Wander, WanderStep};

const PLAYER_COLOR: [u8; 4] = [90, 160, 255, 255];
const NPC_COLOR: [u8; 4] = [235, 200, 90, 255];
const MAP_COLOR: [u8; 4] = [70, 74, 84, 255];
const OBSTACLE_COLOR: [u8; 4] = [120, 96, 72, 255];
const ITEM_COLOR: [u8; 4] = [110, 220, 120, 255];
const DIALOGUE_BARK_COLOR: [u8; 4] = [250, 250, 250, 255];
const QUEST_BARK_COLOR: [u8; 4] = [255, 150, 40, 255];
const DIALOGUE_BARK_OFFSET: Vec2 = Vec2::new(-0.2, 0.8);
const QUEST_BARK_OFFSET: Vec2 = Vec2::new(0.2, 0.8);

#[derive(Debug)]
struct Npc {
    controller: CharacterController,
    wander: Option<Wander>,
    dialogue_bark_entity: Option<EntityId>,
    quest_bark_entity: Option<EntityId>,
}

#[derive(Debug)]
struct QuestItem {
    id: EntityId,
    tag: String,
}

pub(crate) struct GameplayScene {
    scenario_name: String,
    scenario_path: Option<PathBuf>,
    default_scenario: Scenario,
    layers: LayerRegistry,
    physics: PhysicsWorld,
    in_dialogue: ObservableBool,
    player: Option<Player>,
    npcs: Vec<Npc>,
    items: Vec<QuestItem>,
    dialogue: DialogueRunner,
}

impl GameplayScene {
    /// Loads `scenario_path` on every (re)load, falling back to a built-in
    /// yard when the file is missing or invalid.
    pub(crate) fn new(scenario_name: &str, scenario_path: Option<PathBuf>) -> Self {
        Self {
            scenario_name: scenario_name.to_string(),
            scenario_path,
            default_scenario: Scenario::fallback(),
            layers: LayerRegistry::default(),
            physics: PhysicsWorld::default(),
            in_dialogue: ObservableBool::default(),
            player: None,
            npcs: Vec::new(),
            items: Vec::new(),
            dialogue: DialogueRunner::default(),
        }
    }

    #[cfg(test)]
    fn from_scenario(scenario_name: &str, scenario: Scenario) -> Self {
        Self {
            default_scenario: scenario,
            ..Self::new(scenario_name, None)
        }
    }

    fn resolve_scenario(&self) -> Scenario {
        let Some(path) = self.scenario_path.as_ref() else {
            return self.default_scenario.clone();
        };
        match load_scenario(path, &self.layers) {
            Ok(scenario) => scenario,
            Err(error) => {
                warn!(
                    scenario = %self.scenario_name,
                    error = %error,
                    "scenario_load_failed_using_fallback"
                );
                self.default_scenario.clone()
            }
        }
    }

    fn reset_runtime(&mut self) {
        self.physics.clear();
        self.in_dialogue = ObservableBool::default();
        self.player = None;
        self.npcs.clear();
        self.items.clear();
        self.dialogue.reset();
    }

    fn spawn_obstacle(&mut self, world: &mut SceneWorld, obstacle: &ObstaclePlacement) {
        let Some(layer) = self.layers.name_to_layer(&obstacle.layer) else {
            warn!(layer = %obstacle.layer, "obstacle_layer_unknown");
            return;
        };
        let color = if obstacle.layer == MAP_LAYER {
            MAP_COLOR
        } else {
            OBSTACLE_COLOR
        };
        let id = world.spawn(
            Transform::at(obstacle.center),
            RenderableDesc {
                kind: RenderableKind::Solid {
                    half_extents: obstacle.half_extents,
                },
                color,
                debug_name: "obstacle",
            },
        );
        self.physics.add_collider(
            id,
            Aabb::from_center(obstacle.center, obstacle.half_extents),
            layer,
        );
    }

    fn spawn_item(&mut self, world: &mut SceneWorld, item: &ItemPlacement) {
        let id = world.spawn(
            Transform::at(item.position),
            RenderableDesc {
                kind: RenderableKind::Marker,
                color: ITEM_COLOR,
                debug_name: "quest_item",
            },
        );
        self.physics.add_trigger(id, item.position, item.radius);
        self.items.push(QuestItem {
            id,
            tag: item.tag.clone(),
        });
    }

    fn spawn_character(
        &mut self,
        world: &mut SceneWorld,
        def_name: &str,
        spawn: Vec2,
        color: [u8; 4],
        debug_name: &'static str,
    ) -> CharacterController {
        let (config, events) = resolve_character(world, def_name);
        let transform = Transform::at(spawn);
        let id = world.spawn(
            transform,
            RenderableDesc {
                kind: RenderableKind::Actor,
                color,
                debug_name,
            },
        );
        let mut controller = CharacterController::new(
            id,
            config,
            transform,
            Some(Animator::with_slots(&CLIP_SLOTS)),
            Some(EventTrigger::from_defs(&events)),
        );
        controller.attach(&mut self.in_dialogue, &self.layers);
        controller
    }

    fn spawn_npc(&mut self, world: &mut SceneWorld, placement: &NpcPlacement) {
        let mut controller =
            self.spawn_character(world, &placement.def, placement.spawn, NPC_COLOR, "npc");
        controller.set_physics(placement.physics);
        let id = controller.id();
        debug!(
            id = id.0,
            name = %controller.name(),
            physics = controller.uses_physics(),
            wander = placement.wander.is_some(),
            "npc_spawned"
        );
        self.physics
            .add_trigger(id, placement.spawn, placement.trigger_radius);

        let dialogue_bark_entity = controller
            .dialogue_bark()
            .map(|_| spawn_bark(world, DIALOGUE_BARK_COLOR, "dialogue_bark"));
        let quest_bark_entity = controller
            .quest_bark()
            .map(|_| spawn_bark(world, QUEST_BARK_COLOR, "quest_bark"));
        self.npcs.push(Npc {
            controller,
            wander: placement
                .wander
                .map(|offset| Wander::new(id, placement.spawn, offset)),
            dialogue_bark_entity,
            quest_bark_entity,
        });
    }

    fn for_each_character(&mut self, mut f: impl FnMut(&mut CharacterController)) {
        if let Some(player) = self.player.as_mut() {
            f(player.character_mut());
        }
        for npc in &mut self.npcs {
            f(&mut npc.controller);
        }
    }

    fn apply_movement(&mut self, frame: FrameTime, input: &InputSnapshot) {
        let physics = &self.physics;
        if let Some(player) = self.player.as_mut() {
            player.apply_input(input, frame, physics);
        }
        for npc in &mut self.npcs {
            let Some(wander) = npc.wander.as_mut() else {
                continue;
            };
            // NPCs hold still while they can talk to the player.
            if !npc.controller.can_move() || npc.controller.in_range_of_player() {
                continue;
            }
            match wander.step(npc.controller.position()) {
                WanderStep::Walk(direction) => {
                    npc.controller.move_in(direction, frame, physics);
                    if !npc.controller.is_walking() {
                        wander.turn();
                    }
                }
                WanderStep::Turned => {
                    npc.controller.jump(frame);
                }
            }
        }
    }

    fn process_triggers(&mut self, world: &mut SceneWorld) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        let player_id = player.id();
        self.physics
            .set_body_position(player_id, player.character().position());
        for npc in &self.npcs {
            self.physics
                .set_trigger_center(npc.controller.id(), npc.controller.position());
        }

        for event in self.physics.update_triggers() {
            if let Some(npc) = self
                .npcs
                .iter_mut()
                .find(|npc| npc.controller.id() == event.trigger_owner)
            {
                match event.kind {
                    TriggerEventKind::Enter => {
                        let other_player = (event.other == player_id).then_some(&mut *player);
                        npc.controller
                            .on_trigger_enter(&event.other_tag, event.other, other_player);
                    }
                    TriggerEventKind::Exit => npc.controller.on_trigger_exit(&event.other_tag),
                }
                continue;
            }
            if event.kind == TriggerEventKind::Enter && event.other == player_id {
                collect_item(&mut self.items, &mut self.npcs, &mut self.physics, world, &event);
            }
        }
    }

    /// Nearest listener first. Dispatch stops at the first dialogue that
    /// fires so no other NPC is left triggered with a dialogue nobody shows.
    fn dispatch_pickup(&mut self) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        if !player.has_pickup_listeners() {
            debug!("pickup_nobody_in_range");
            return;
        }
        let player_position = player.character().position();
        let mut listeners = player
            .pickup_listeners()
            .into_iter()
            .filter_map(|listener| {
                let npc = self.npcs.iter().find(|npc| npc.controller.id() == listener)?;
                Some((listener, npc.controller.position().distance(player_position)))
            })
            .collect::<Vec<_>>();
        listeners.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut dialogue_to_start = None;
        for (listener, _) in listeners {
            let Some(npc) = self
                .npcs
                .iter_mut()
                .find(|npc| npc.controller.id() == listener)
            else {
                continue;
            };
            let outcome = npc.controller.on_pickup(player);
            if outcome != PickupOutcome::Ignored {
                debug!(npc = listener.0, ?outcome, "pickup_dispatched");
            }
            for notice in npc.controller.flush_event_notifications() {
                if let RpgEventNotice {
                    kind: NoticeKind::Triggered,
                    event: RpgEvent::Dialogue(dialogue),
                } = notice
                {
                    dialogue_to_start =
                        Some((listener, npc.controller.name().to_string(), dialogue.lines));
                }
            }
            if dialogue_to_start.is_some() {
                break;
            }
        }

        if let Some((speaker, speaker_name, lines)) = dialogue_to_start {
            if self.dialogue.start(speaker, &speaker_name, &lines) {
                info!(speaker = %speaker_name, line_count = lines.len(), "dialogue_started");
                if let Some(change) = self.in_dialogue.set(true) {
                    self.dispatch_flag_change(change);
                }
            }
        }
    }

    fn advance_dialogue(&mut self) {
        match self.dialogue.advance() {
            DialogueAdvance::Idle => {}
            DialogueAdvance::Line(line) => debug!(line = %line, "dialogue_line"),
            DialogueAdvance::Finished { speaker } => {
                if let Some(change) = self.in_dialogue.set(false) {
                    self.dispatch_flag_change(change);
                }
                if let Some(npc) = self
                    .npcs
                    .iter_mut()
                    .find(|npc| npc.controller.id() == speaker)
                {
                    if let Some(trigger) = npc.controller.event_trigger_mut() {
                        trigger.close_dialogue();
                    }
                    npc.controller.flush_event_notifications();
                }
                info!(speaker = speaker.0, "dialogue_finished");
            }
        }
    }

    /// Delivers an `in_dialogue` change to its subscribers in the same tick.
    fn dispatch_flag_change(&mut self, change: FlagChange) {
        for listener in change.subscribers {
            if let Some(player) = self
                .player
                .as_mut()
                .filter(|player| player.id() == listener)
            {
                player.character_mut().on_in_dialogue_updated(change.value);
                continue;
            }
            if let Some(npc) = self
                .npcs
                .iter_mut()
                .find(|npc| npc.controller.id() == listener)
            {
                npc.controller.on_in_dialogue_updated(change.value);
            }
        }
    }

    fn late_update_all(&mut self) {
        self.for_each_character(|controller| {
            controller.late_update();
            let id = controller.id();
            if let Some(animator) = controller.animator_mut() {
                for trigger in animator.take_triggers() {
                    debug!(id = id.0, trigger = %trigger, "animation_trigger_played");
                }
            }
        });
    }

    fn sync_world(&self, world: &mut SceneWorld) {
        if let Some(player) = self.player.as_ref() {
            sync_actor(world, player.character());
            world.camera_mut().position = player.character().position();
        }
        for npc in &self.npcs {
            sync_actor(world, &npc.controller);
            let position = npc.controller.position();
            sync_bark(
                world,
                npc.dialogue_bark_entity,
                npc.controller.dialogue_bark(),
                position + DIALOGUE_BARK_OFFSET,
            );
            sync_bark(
                world,
                npc.quest_bark_entity,
                npc.controller.quest_bark(),
                position + QUEST_BARK_OFFSET,
            );
        }
    }

    fn quest_status_text(&self) -> Option<String> {
        let parts = self
            .npcs
            .iter()
            .filter_map(|npc| {
                let quest = npc.controller.event_trigger()?.open_quest()?;
                Some(match quest.status {
                    QuestStatus::Completed => {
                        format!("{} done, see {}", quest.title, npc.controller.name())
                    }
                    _ => format!(
                        "{} {}/{}",
                        quest.title, quest.objective.collected, quest.objective.required
                    ),
                })
            })
            .collect::<Vec<_>>();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

impl Scene for GameplayScene {
    fn load(&mut self, world: &mut SceneWorld) {
        let scenario = self.resolve_scenario();
        self.reset_runtime();

        for obstacle in &scenario.obstacles {
            self.spawn_obstacle(world, obstacle);
        }
        for item in &scenario.items {
            self.spawn_item(world, item);
        }
        let player_character = self.spawn_character(
            world,
            &scenario.player.def,
            scenario.player.spawn,
            PLAYER_COLOR,
            "player",
        );
        self.physics
            .add_body(player_character.id(), scenario.player.spawn, PLAYER_TAG);
        self.player = Some(Player::new(player_character));
        for npc in &scenario.npcs {
            self.spawn_npc(world, npc);
        }

        world.apply_pending();
        self.sync_world(world);
        info!(
            scenario = %self.scenario_name,
            npc_count = self.npcs.len(),
            item_count = self.items.len(),
            obstacle_count = scenario.obstacles.len(),
            entity_count = world.entity_count(),
            "scene_loaded"
        );
    }

    fn update(
        &mut self,
        frame: FrameTime,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.reload_pressed() {
            info!(scenario = %self.scenario_name, "scene_reload_requested");
            return SceneCommand::Reload;
        }

        self.for_each_character(CharacterController::pre_update);
        self.apply_movement(frame, input);
        self.for_each_character(|controller| controller.step_jump(frame));
        self.process_triggers(world);
        if input.pickup_pressed() && !self.dialogue.is_active() {
            self.dispatch_pickup();
        }
        if input.advance_pressed() {
            self.advance_dialogue();
        }
        self.late_update_all();
        self.sync_world(world);
        SceneCommand::None
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        for npc in &mut self.npcs {
            npc.controller
                .detach(&mut self.in_dialogue, self.player.as_mut());
        }
        if let Some(player) = self.player.as_mut() {
            player.detach(&mut self.in_dialogue);
        }
        self.reset_runtime();
        info!(
            scenario = %self.scenario_name,
            entity_count = world.entity_count(),
            "scene_unloaded"
        );
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let mut title = format!("Questbound | {}", self.scenario_name);
        if let Some((speaker, line, number, count)) = self.dialogue.current_line() {
            title.push_str(&format!(" | {speaker}: \"{line}\" ({number}/{count}, Enter)"));
            return Some(title);
        }
        if let Some(npc) = self.npcs.iter().find(|npc| {
            npc.controller.in_range_of_player()
                && npc
                    .controller
                    .event_trigger()
                    .is_some_and(|trigger| trigger.has_events())
        }) {
            title.push_str(&format!(" | E: talk to {}", npc.controller.name()));
        }
        if let Some(quests) = self.quest_status_text() {
            title.push_str(&format!(" | {quests}"));
        }
        Some(title)
    }
}

fn resolve_character(world: &SceneWorld, def_name: &str) -> (CharacterConfig, Vec<EventDef>) {
    match world
        .def_database()
        .and_then(|database| database.character_def_by_name(def_name))
    {
        Some(def) => (CharacterConfig::from_def(def), def.events.clone()),
        None => {
            warn!(def = def_name, "character_def_missing_using_defaults");
            (
                CharacterConfig {
                    name: def_name.to_string(),
                    ..CharacterConfig::default()
                },
                Vec::new(),
            )
        }
    }
}

fn spawn_bark(world: &mut SceneWorld, color: [u8; 4], debug_name: &'static str) -> EntityId {
    world.spawn(
        Transform::default(),
        RenderableDesc {
            kind: RenderableKind::Indicator,
            color,
            debug_name,
        },
    )
}

/// Counts the item toward every quest that wants it; consumed items leave
/// the world.
fn collect_item(
    items: &mut Vec<QuestItem>,
    npcs: &mut [Npc],
    physics: &mut PhysicsWorld,
    world: &mut SceneWorld,
    event: &TriggerEvent,
) {
    let Some(index) = items.iter().position(|item| item.id == event.trigger_owner) else {
        return;
    };
    let tag = items[index].tag.clone();
    let mut needed = false;
    for npc in npcs.iter_mut() {
        if let Some(trigger) = npc.controller.event_trigger_mut() {
            needed |= trigger.record_item_collected(&tag);
        }
        for notice in npc.controller.flush_event_notifications() {
            if notice.kind == NoticeKind::Completed {
                info!(npc = %npc.controller.name(), "quest_objective_completed");
            }
        }
    }
    if needed {
        let item = items.remove(index);
        physics.remove_owner(item.id);
        world.despawn(item.id);
        info!(tag = %tag, "quest_item_collected");
    }
}

fn sync_actor(world: &mut SceneWorld, controller: &CharacterController) {
    if let Some(entity) = world.find_entity_mut(controller.id()) {
        entity.transform = controller.transform;
    }
}

fn sync_bark(world: &mut SceneWorld, entity_id: Option<EntityId>, bark: Option<Bark>, position: Vec2) {
    let (Some(entity_id), Some(bark)) = (entity_id, bark) else {
        return;
    };
    if let Some(entity) = world.find_entity_mut(entity_id) {
        entity.transform.position = position;
        entity.visible = bark.is_active();
    }
}
