mod input;
mod loop_runner;
mod rendering;
mod scene;
mod time;
mod vec2;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use rendering::{screen_rect_for_box, world_to_screen, Renderer, Viewport, PIXELS_PER_WORLD};
pub use scene::{
    Camera2D, Entity, EntityId, EntityIdAllocator, InputSnapshot, RenderableDesc, RenderableKind,
    Scene, SceneCommand, SceneWorld, Transform,
};
pub use time::{FrameClock, FrameTime};
pub use vec2::Vec2;
