//! Static floor collider

use rapier2d::prelude::*;
use tracing::debug;

use super::physics::PhysicsWorld;

/// Height of the floor strip at the bottom of the canvas
pub const GROUND_HEIGHT: f32 = 80.0;

/// The single static floor; position is its centre
#[derive(Debug)]
pub struct Ground {
    collider: ColliderHandle,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Ground {
    pub fn create(world: &mut PhysicsWorld, x: f32, y: f32, width: f32, height: f32) -> Self {
        let collider = world.add_static_box(x, y, width, height);
        Self {
            collider,
            x,
            y,
            width,
            height,
        }
    }

    /// Floor strip spanning the full canvas width, flush with the bottom edge
    pub fn for_canvas(world: &mut PhysicsWorld, canvas_width: f32, canvas_height: f32) -> Self {
        Self::create(
            world,
            canvas_width / 2.0,
            canvas_height - GROUND_HEIGHT / 2.0,
            canvas_width,
            GROUND_HEIGHT,
        )
    }

    /// Move and rescale in place; the collider is rebuilt at the new size
    pub fn resize(&mut self, world: &mut PhysicsWorld, x: f32, y: f32, width: f32, height: f32) {
        let scale_x = width / self.width;
        let scale_y = height / self.height;
        debug!(scale_x, scale_y, x, y, "Resizing ground");

        if let Some(collider) = world.colliders.get_mut(self.collider) {
            collider.set_translation(vector![x, y]);
            collider.set_shape(SharedShape::cuboid(width / 2.0, height / 2.0));
        }

        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
    }

    pub fn collider(&self) -> ColliderHandle {
        self.collider
    }
}
