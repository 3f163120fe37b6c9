use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{Entity, RenderableKind, SceneWorld};

use super::transform::screen_rect_for_box;
use super::{world_to_screen, Viewport, PIXELS_PER_WORLD};

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const ACTOR_HALF_SIZE_PX: i32 = 8;
const FACING_NUB_LENGTH_PX: i32 = 4;
const FACING_NUB_HALF_HEIGHT_PX: i32 = 2;
const INDICATOR_HALF_SIZE_PX: i32 = 3;
const MARKER_HALF_SIZE_PX: i32 = 4;

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    draw_order: Vec<usize>,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            draw_order: Vec::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_world(&mut self, world: &SceneWorld) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }

        collect_draw_order(world, &mut self.draw_order);
        let viewport = self.viewport;
        let frame = self.pixels.frame_mut();
        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }

        let entities = world.entities();
        for &index in &self.draw_order {
            draw_entity(frame, viewport, world, &entities[index]);
        }

        self.pixels.render()
    }
}

/// Solids first, then markers, actors and indicators; spawn order breaks ties.
fn collect_draw_order(world: &SceneWorld, draw_order: &mut Vec<usize>) {
    draw_order.clear();
    draw_order.extend(
        world
            .entities()
            .iter()
            .enumerate()
            .filter(|(_, entity)| entity.visible)
            .map(|(index, _)| index),
    );
    let entities = world.entities();
    draw_order.sort_by_key(|&index| {
        let entity = &entities[index];
        (layer_rank(entity.renderable.kind), entity.applied_spawn_order())
    });
}

fn layer_rank(kind: RenderableKind) -> u8 {
    match kind {
        RenderableKind::Solid { .. } => 0,
        RenderableKind::Marker => 1,
        RenderableKind::Actor => 2,
        RenderableKind::Indicator => 3,
    }
}

fn draw_entity(frame: &mut [u8], viewport: Viewport, world: &SceneWorld, entity: &Entity) {
    let camera = world.camera();
    let color = entity.renderable.color;
    let position = entity.transform.position;
    match entity.renderable.kind {
        RenderableKind::Solid { half_extents } => {
            let (left, top, right, bottom) =
                screen_rect_for_box(position, half_extents, camera, viewport, PIXELS_PER_WORLD);
            fill_rect_clipped(frame, viewport, left, top, right, bottom, color);
        }
        RenderableKind::Marker => {
            let (cx, cy) = world_to_screen(position, camera, viewport, PIXELS_PER_WORLD);
            fill_square(frame, viewport, cx, cy, MARKER_HALF_SIZE_PX, color);
        }
        RenderableKind::Indicator => {
            let (cx, cy) = world_to_screen(position, camera, viewport, PIXELS_PER_WORLD);
            fill_square(frame, viewport, cx, cy, INDICATOR_HALF_SIZE_PX, color);
        }
        RenderableKind::Actor => {
            let (cx, cy) = world_to_screen(position, camera, viewport, PIXELS_PER_WORLD);
            fill_square(frame, viewport, cx, cy, ACTOR_HALF_SIZE_PX, color);
            let (nub_left, nub_right) = facing_nub_span(cx, entity.transform.is_mirrored());
            fill_rect_clipped(
                frame,
                viewport,
                nub_left,
                cy - FACING_NUB_HALF_HEIGHT_PX,
                nub_right,
                cy + FACING_NUB_HALF_HEIGHT_PX,
                color,
            );
        }
    }
}

fn facing_nub_span(cx: i32, mirrored: bool) -> (i32, i32) {
    if mirrored {
        (
            cx - ACTOR_HALF_SIZE_PX - FACING_NUB_LENGTH_PX,
            cx - ACTOR_HALF_SIZE_PX - 1,
        )
    } else {
        (
            cx + ACTOR_HALF_SIZE_PX + 1,
            cx + ACTOR_HALF_SIZE_PX + FACING_NUB_LENGTH_PX,
        )
    }
}

fn fill_square(
    frame: &mut [u8],
    viewport: Viewport,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    fill_rect_clipped(
        frame,
        viewport,
        cx - half_size,
        cy - half_size,
        cx + half_size,
        cy + half_size,
        color,
    );
}

fn fill_rect_clipped(
    frame: &mut [u8],
    viewport: Viewport,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: [u8; 4],
) {
    let width = viewport.width as i32;
    let height = viewport.height as i32;
    let x0 = left.max(0);
    let y0 = top.max(0);
    let x1 = right.min(width - 1);
    let y1 = bottom.min(height - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }
    for y in y0..=y1 {
        let row_start = (y as usize * viewport.width as usize + x0 as usize) * 4;
        let row_end = (y as usize * viewport.width as usize + x1 as usize + 1) * 4;
        for pixel in frame[row_start..row_end].chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }
}
