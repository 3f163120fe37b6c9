mod renderer;
mod transform;

pub use renderer::Renderer;
pub use transform::{screen_rect_for_box, world_to_screen, Viewport, PIXELS_PER_WORLD};
