use super::input::{ActionStates, InputAction};
use super::time::FrameTime;
use super::vec2::Vec2;
use crate::content::DefDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Reload,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    jump_pressed: bool,
    pickup_pressed: bool,
    advance_pressed: bool,
    reload_pressed: bool,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        jump_pressed: bool,
        pickup_pressed: bool,
        advance_pressed: bool,
        reload_pressed: bool,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            jump_pressed,
            pickup_pressed,
            advance_pressed,
            reload_pressed,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_jump_pressed(mut self, jump_pressed: bool) -> Self {
        self.jump_pressed = jump_pressed;
        self
    }

    pub fn with_pickup_pressed(mut self, pickup_pressed: bool) -> Self {
        self.pickup_pressed = pickup_pressed;
        self
    }

    pub fn with_advance_pressed(mut self, advance_pressed: bool) -> Self {
        self.advance_pressed = advance_pressed;
        self
    }

    pub fn with_reload_pressed(mut self, reload_pressed: bool) -> Self {
        self.reload_pressed = reload_pressed;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    pub fn pickup_pressed(&self) -> bool {
        self.pickup_pressed
    }

    pub fn advance_pressed(&self) -> bool {
        self.advance_pressed
    }

    pub fn reload_pressed(&self) -> bool {
        self.reload_pressed
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy)]
pub struct Camera2D {
    pub position: Vec2,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
        }
    }
}

/// `local_scale.x` carries horizontal facing: negative means mirrored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub local_scale: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            local_scale: Vec2::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn is_mirrored(&self) -> bool {
        self.local_scale.x < 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderableKind {
    Actor,
    Indicator,
    Solid { half_extents: Vec2 },
    Marker,
}

#[derive(Debug, Clone)]
pub struct RenderableDesc {
    pub kind: RenderableKind,
    pub color: [u8; 4],
    pub debug_name: &'static str,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub transform: Transform,
    pub renderable: RenderableDesc,
    pub visible: bool,
    applied_spawn_order: u64,
}

impl Entity {
    pub fn applied_spawn_order(&self) -> u64 {
        self.applied_spawn_order
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    next_applied_spawn_order: u64,
    camera: Camera2D,
    def_database: Option<DefDatabase>,
}

impl SceneWorld {
    /// Ids are never reused, including across `clear`.
    pub fn spawn(&mut self, transform: Transform, renderable: RenderableDesc) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            transform,
            renderable,
            visible: true,
            applied_spawn_order: 0,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_spawns
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_despawns.clear();
        }

        for mut entity in self.pending_spawns.drain(..) {
            entity.applied_spawn_order = self.next_applied_spawn_order;
            self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
            self.entities.push(entity);
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.next_applied_spawn_order = 0;
        self.camera = Camera2D::default();
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn set_def_database(&mut self, def_database: DefDatabase) {
        self.def_database = Some(def_database);
    }

    pub fn def_database(&self) -> Option<&DefDatabase> {
        self.def_database.as_ref()
    }
}

/// Host lifecycle for one gameplay scene. `update` runs once per fixed tick;
/// a scene is responsible for its own pre-update / late-update ordering.
pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        frame: FrameTime,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

pub(crate) struct SceneRunner {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneRunner {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub(crate) fn set_def_database(&mut self, def_database: DefDatabase) {
        self.world.set_def_database(def_database);
    }

    pub(crate) fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.world.apply_pending();
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, frame: FrameTime, input: &InputSnapshot) -> SceneCommand {
        let command = self.scene.update(frame, input, &mut self.world);
        self.world.apply_pending();
        command
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }

    pub(crate) fn hard_reset(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
        }
        self.world.clear();
        self.scene.load(&mut self.world);
        self.world.apply_pending();
        self.is_loaded = true;
    }

    pub(crate) fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
            self.world.clear();
            self.is_loaded = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> RenderableDesc {
        RenderableDesc {
            kind: RenderableKind::Marker,
            color: [255, 255, 255, 255],
            debug_name: "test",
        }
    }

    struct CountingScene {
        spawn_count: usize,
    }

    impl Scene for CountingScene {
        fn load(&mut self, world: &mut SceneWorld) {
            for _ in 0..self.spawn_count {
                world.spawn(Transform::default(), marker());
            }
        }

        fn update(
            &mut self,
            _frame: FrameTime,
            _input: &InputSnapshot,
            _world: &mut SceneWorld,
        ) -> SceneCommand {
            SceneCommand::None
        }

        fn unload(&mut self, _world: &mut SceneWorld) {}
    }

    #[test]
    fn allocator_is_monotonic_and_unique() {
        let mut allocator = EntityIdAllocator::default();
        let a = allocator.allocate();
        let b = allocator.allocate();
        let c = allocator.allocate();
        assert!(a < b && b < c);
    }

    #[test]
    fn spawn_is_deferred_until_apply_pending() {
        let mut world = SceneWorld::default();
        let id = world.spawn(Transform::default(), marker());
        assert!(world.find_entity(id).is_none());
        world.apply_pending();
        assert!(world.find_entity(id).is_some());
    }

    #[test]
    fn despawn_of_pending_spawn_never_lands() {
        let mut world = SceneWorld::default();
        let id = world.spawn(Transform::default(), marker());
        assert!(world.despawn(id));
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn despawn_unknown_id_is_rejected() {
        let mut world = SceneWorld::default();
        assert!(!world.despawn(EntityId(42)));
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let mut world = SceneWorld::default();
        let first = world.spawn(Transform::default(), marker());
        world.apply_pending();
        world.clear();
        let second = world.spawn(Transform::default(), marker());
        assert_ne!(first, second);
    }

    #[test]
    fn hard_reset_unloads_then_reloads() {
        let mut runner = SceneRunner::new(Box::new(CountingScene { spawn_count: 3 }));
        runner.load();
        assert_eq!(runner.world().entity_count(), 3);
        runner.hard_reset();
        assert_eq!(runner.world().entity_count(), 3);
        runner.shutdown();
        assert_eq!(runner.world().entity_count(), 0);
    }

    #[test]
    fn transform_mirroring_follows_scale_sign() {
        let mut transform = Transform::at(Vec2::new(1.0, 2.0));
        assert!(!transform.is_mirrored());
        transform.local_scale.x = -1.0;
        assert!(transform.is_mirrored());
    }
}
