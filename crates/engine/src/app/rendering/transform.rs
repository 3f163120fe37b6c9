use crate::app::{Camera2D, Vec2};

pub const PIXELS_PER_WORLD: f32 = 32.0;

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

pub fn world_to_screen(
    world: Vec2,
    camera: &Camera2D,
    viewport: Viewport,
    pixels_per_world: f32,
) -> (i32, i32) {
    let x = (world.x - camera.position.x) * pixels_per_world + viewport.width as f32 * 0.5;
    let y = viewport.height as f32 * 0.5 - (world.y - camera.position.y) * pixels_per_world;
    (x.round() as i32, y.round() as i32)
}

/// Screen-space rectangle as `(left, top, right, bottom)`, inclusive.
pub fn screen_rect_for_box(
    center: Vec2,
    half_extents: Vec2,
    camera: &Camera2D,
    viewport: Viewport,
    pixels_per_world: f32,
) -> (i32, i32, i32, i32) {
    let top_left = Vec2::new(center.x - half_extents.x, center.y + half_extents.y);
    let bottom_right = Vec2::new(center.x + half_extents.x, center.y - half_extents.y);
    let (left, top) = world_to_screen(top_left, camera, viewport, pixels_per_world);
    let (right, bottom) = world_to_screen(bottom_right, camera, viewport, pixels_per_world);
    (left, top, right, bottom)
}
