mod layers;
mod world;

pub use layers::{
    LayerId, LayerMask, LayerRegistry, DEFAULT_LAYER, MAP_LAYER, OBSTACLE_LAYER,
};
pub use world::{
    Aabb, Collider, ObstacleQuery, PhysicsWorld, TaggedBody, TriggerEvent, TriggerEventKind,
    TriggerVolume,
};
