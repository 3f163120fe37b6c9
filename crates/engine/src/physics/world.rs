use std::collections::BTreeSet;

use crate::app::{EntityId, Vec2};

use super::layers::{LayerId, LayerMask};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Entry distance along a unit `direction`, if the ray reaches the box
    /// within `max_distance`. A ray starting inside hits at distance zero.
    pub fn ray_entry(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = max_distance;
        for (origin_axis, dir_axis, min_axis, max_axis) in [
            (origin.x, direction.x, self.min.x, self.max.x),
            (origin.y, direction.y, self.min.y, self.max.y),
        ] {
            if dir_axis.abs() <= f32::EPSILON {
                if origin_axis < min_axis || origin_axis > max_axis {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir_axis;
            let mut near = (min_axis - origin_axis) * inv;
            let mut far = (max_axis - origin_axis) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            t_min = t_min.max(near);
            t_max = t_max.min(far);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// Obstacle probe used by movement. Returns true when anything on `mask`
/// lies along the ray within `max_distance`.
pub trait ObstacleQuery {
    fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32, mask: LayerMask) -> bool;
}

#[derive(Debug, Clone)]
pub struct Collider {
    pub owner: EntityId,
    pub bounds: Aabb,
    pub layer: LayerId,
}

#[derive(Debug, Clone)]
pub struct TriggerVolume {
    pub owner: EntityId,
    pub center: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone)]
pub struct TaggedBody {
    pub id: EntityId,
    pub position: Vec2,
    pub tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEventKind {
    Enter,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub kind: TriggerEventKind,
    pub trigger_owner: EntityId,
    pub other: EntityId,
    pub other_tag: String,
}

#[derive(Debug, Default)]
pub struct PhysicsWorld {
    colliders: Vec<Collider>,
    triggers: Vec<TriggerVolume>,
    bodies: Vec<TaggedBody>,
    overlaps: BTreeSet<(EntityId, EntityId)>,
}

impl PhysicsWorld {
    pub fn add_collider(&mut self, owner: EntityId, bounds: Aabb, layer: LayerId) {
        self.colliders.push(Collider {
            owner,
            bounds,
            layer,
        });
    }

    pub fn add_trigger(&mut self, owner: EntityId, center: Vec2, radius: f32) {
        self.triggers.push(TriggerVolume {
            owner,
            center,
            radius: radius.max(0.0),
        });
    }

    pub fn add_body(&mut self, id: EntityId, position: Vec2, tag: impl Into<String>) {
        self.bodies.push(TaggedBody {
            id,
            position,
            tag: tag.into(),
        });
    }

    pub fn set_trigger_center(&mut self, owner: EntityId, center: Vec2) {
        for trigger in self.triggers.iter_mut().filter(|trigger| trigger.owner == owner) {
            trigger.center = center;
        }
    }

    pub fn set_body_position(&mut self, id: EntityId, position: Vec2) {
        if let Some(body) = self.bodies.iter_mut().find(|body| body.id == id) {
            body.position = position;
        }
    }

    /// Drops every shape owned by `owner`. Pending overlaps vanish without
    /// an exit event.
    pub fn remove_owner(&mut self, owner: EntityId) {
        self.colliders.retain(|collider| collider.owner != owner);
        self.triggers.retain(|trigger| trigger.owner != owner);
        self.bodies.retain(|body| body.id != owner);
        self.overlaps
            .retain(|(trigger, other)| *trigger != owner && *other != owner);
    }

    pub fn clear(&mut self) {
        self.colliders.clear();
        self.triggers.clear();
        self.bodies.clear();
        self.overlaps.clear();
    }

    /// Diffs current trigger/body overlaps against the previous call.
    /// Events come out in trigger insertion order, then body order.
    pub fn update_triggers(&mut self) -> Vec<TriggerEvent> {
        let mut events = Vec::new();
        let mut current = BTreeSet::new();
        for trigger in &self.triggers {
            for body in &self.bodies {
                if body.id == trigger.owner {
                    continue;
                }
                let key = (trigger.owner, body.id);
                let inside = trigger.center.distance(body.position) <= trigger.radius;
                let was_inside = self.overlaps.contains(&key);
                if inside {
                    current.insert(key);
                }
                let kind = match (was_inside, inside) {
                    (false, true) => TriggerEventKind::Enter,
                    (true, false) => TriggerEventKind::Exit,
                    _ => continue,
                };
                events.push(TriggerEvent {
                    kind,
                    trigger_owner: trigger.owner,
                    other: body.id,
                    other_tag: body.tag.clone(),
                });
            }
        }
        self.overlaps = current;
        events
    }
}

impl ObstacleQuery for PhysicsWorld {
    fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32, mask: LayerMask) -> bool {
        let Some(direction) = direction.normalized() else {
            return false;
        };
        if !max_distance.is_finite() || max_distance < 0.0 {
            return false;
        }
        self.colliders
            .iter()
            .filter(|collider| mask.contains(collider.layer))
            .any(|collider| {
                collider
                    .bounds
                    .ray_entry(origin, direction, max_distance)
                    .is_some()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{LayerRegistry, MAP_LAYER, OBSTACLE_LAYER};

    fn wall_world(layer_name: &str) -> (PhysicsWorld, LayerRegistry) {
        let registry = LayerRegistry::default();
        let mut world = PhysicsWorld::default();
        world.add_collider(
            EntityId(100),
            Aabb::from_center(Vec2::new(2.0, 0.0), Vec2::new(0.5, 0.5)),
            registry.name_to_layer(layer_name).expect("layer"),
        );
        (world, registry)
    }

    #[test]
    fn raycast_hits_collider_within_distance() {
        let (world, registry) = wall_world(OBSTACLE_LAYER);
        let mask = registry.mask_of(&[MAP_LAYER, OBSTACLE_LAYER]);
        assert!(world.raycast(Vec2::ZERO, Vec2::RIGHT, 2.0, mask));
        assert!(!world.raycast(Vec2::ZERO, Vec2::RIGHT, 1.0, mask));
        assert!(!world.raycast(Vec2::ZERO, Vec2::LEFT, 5.0, mask));
    }

    #[test]
    fn raycast_ignores_layers_outside_mask() {
        let (world, registry) = wall_world("Default");
        let mask = registry.mask_of(&[MAP_LAYER, OBSTACLE_LAYER]);
        assert!(!world.raycast(Vec2::ZERO, Vec2::RIGHT, 5.0, mask));
    }

    #[test]
    fn raycast_from_inside_collider_hits() {
        let (world, registry) = wall_world(MAP_LAYER);
        let mask = registry.mask_of(&[MAP_LAYER]);
        assert!(world.raycast(Vec2::new(2.0, 0.0), Vec2::UP, 0.1, mask));
    }

    #[test]
    fn raycast_with_zero_direction_misses() {
        let (world, registry) = wall_world(MAP_LAYER);
        let mask = registry.mask_of(&[MAP_LAYER]);
        assert!(!world.raycast(Vec2::new(2.0, 0.0), Vec2::ZERO, 1.0, mask));
    }

    #[test]
    fn diagonal_ray_uses_both_slabs() {
        let (world, registry) = wall_world(MAP_LAYER);
        let mask = registry.mask_of(&[MAP_LAYER]);
        assert!(world.raycast(Vec2::new(0.0, -2.0), Vec2::new(1.0, 1.0), 3.0, mask));
        assert!(!world.raycast(Vec2::new(0.0, -2.0), Vec2::new(-1.0, 1.0), 3.0, mask));
    }

    #[test]
    fn triggers_report_enter_then_exit_once() {
        let mut world = PhysicsWorld::default();
        let npc = EntityId(1);
        let player = EntityId(2);
        world.add_trigger(npc, Vec2::ZERO, 1.5);
        world.add_trigger(player, Vec2::new(10.0, 0.0), 1.0);
        world.add_body(player, Vec2::new(10.0, 0.0), "Player");

        assert!(world.update_triggers().is_empty());

        world.set_body_position(player, Vec2::new(1.0, 0.0));
        world.set_trigger_center(player, Vec2::new(1.0, 0.0));
        let entered = world.update_triggers();
        assert_eq!(
            entered,
            vec![TriggerEvent {
                kind: TriggerEventKind::Enter,
                trigger_owner: npc,
                other: player,
                other_tag: "Player".to_string(),
            }]
        );
        assert!(world.update_triggers().is_empty());

        world.set_body_position(player, Vec2::new(5.0, 0.0));
        let exited = world.update_triggers();
        assert_eq!(exited.len(), 1);
        assert_eq!(exited[0].kind, TriggerEventKind::Exit);
    }

    #[test]
    fn remove_owner_drops_shapes_and_overlaps() {
        let mut world = PhysicsWorld::default();
        world.add_trigger(EntityId(1), Vec2::ZERO, 1.0);
        world.add_body(EntityId(2), Vec2::ZERO, "Player");
        assert_eq!(world.update_triggers().len(), 1);

        world.remove_owner(EntityId(1));
        assert!(world.update_triggers().is_empty());
    }
}
