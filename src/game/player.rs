//! Player body, movement and grounded tracking

use rapier2d::prelude::*;

use crate::ws::protocol::{ConnectionId, PlayerDescriptor, PositionUpdate};

use super::ground::Ground;
use super::physics::{BodyMaterial, PhysicsWorld};
use super::render::{Rect, Surface};

/// Velocity added by one move call (px/s)
pub const DEFAULT_SPEED: f32 = 80.0;
/// Upward velocity added by a jump (px/s)
pub const DEFAULT_JUMP_SPEED: f32 = 1000.0;
/// Velocity added per update while airborne (px/s)
pub const GRAVITY_STEP: f32 = 30.0;
/// Horizontal velocity kept per update while grounded
pub const FRICTION: f32 = 0.9;

/// Default player size in pixels
pub const PLAYER_SIZE: f32 = 40.0;

/// One participant's body in the local world.
///
/// Handles point into the `PhysicsWorld` passed to every method; the player
/// never owns the world.
#[derive(Debug)]
pub struct Player {
    pub id: ConnectionId,
    body: RigidBodyHandle,
    collider: ColliderHandle,
    pub is_grounded: bool,
    pub speed: f32,
    pub jump_speed: f32,
    pub canvas_width: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
}

impl Player {
    /// Create a body for `descriptor` and add it to the world
    pub fn spawn(world: &mut PhysicsWorld, descriptor: &PlayerDescriptor, canvas_width: f32) -> Self {
        let (body, collider) = world.add_dynamic_box(
            descriptor.x,
            descriptor.y,
            descriptor.width,
            descriptor.height,
            descriptor.angle,
            BodyMaterial::default(),
        );

        Self {
            id: descriptor.id,
            body,
            collider,
            is_grounded: false,
            speed: DEFAULT_SPEED,
            jump_speed: DEFAULT_JUMP_SPEED,
            canvas_width,
            width: descriptor.width,
            height: descriptor.height,
            color: descriptor.color.clone(),
        }
    }

    /// Remove the body and its collider from the world
    pub fn despawn(self, world: &mut PhysicsWorld) {
        world.remove_body(self.body);
    }

    pub fn move_left(&self, world: &mut PhysicsWorld) {
        self.push(world, vector![-self.speed, 0.0]);
    }

    pub fn move_right(&self, world: &mut PhysicsWorld) {
        self.push(world, vector![self.speed, 0.0]);
    }

    /// Jump if the grounded latch is set. The latch is cleared either way,
    /// independent of whether the body actually leaves the ground.
    ///
    /// Returns whether an impulse was applied.
    pub fn jump(&mut self, world: &mut PhysicsWorld) -> bool {
        if !self.is_grounded {
            return false;
        }

        self.push(world, vector![0.0, -self.jump_speed]);
        self.is_grounded = false;
        true
    }

    /// Per-frame housekeeping for the locally simulated player
    pub fn update(&mut self, world: &mut PhysicsWorld, ground: &Ground) {
        self.is_grounded = self.check_if_grounded(world, ground);

        let canvas_width = self.canvas_width;
        let grounded = self.is_grounded;
        let Some(body) = world.bodies.get_mut(self.body) else {
            return;
        };

        let mut velocity = *body.linvel();
        if grounded {
            velocity.x *= FRICTION;
        } else {
            velocity.y += GRAVITY_STEP;
        }
        body.set_linvel(velocity, true);

        let position = *body.translation();
        if let Some(x) = wrap_x(position.x, canvas_width) {
            body.set_translation(vector![x, position.y], true);
        }
    }

    /// True iff the player's collider currently overlaps the ground collider
    pub fn check_if_grounded(&self, world: &PhysicsWorld, ground: &Ground) -> bool {
        world.body_intersects(self.body, self.collider, ground.collider())
    }

    /// Fill the player's axis-aligned bounding box
    pub fn draw(&self, world: &PhysicsWorld, surface: &mut dyn Surface) {
        let (Some(body), Some(collider)) =
            (world.bodies.get(self.body), world.colliders.get(self.collider))
        else {
            return;
        };

        let aabb = collider.shape().compute_aabb(body.position());
        surface.fill_rect(
            Rect {
                x: aabb.mins.x,
                y: aabb.mins.y,
                width: aabb.maxs.x - aabb.mins.x,
                height: aabb.maxs.y - aabb.mins.y,
            },
            &self.color,
        );
    }

    /// Overwrite position (and angle when given), bypassing the solver
    pub fn set_transform(&self, world: &mut PhysicsWorld, x: f32, y: f32, angle: Option<f32>) {
        if let Some(body) = world.bodies.get_mut(self.body) {
            match angle {
                Some(angle) => body.set_position(Isometry::new(vector![x, y], angle), true),
                None => body.set_translation(vector![x, y], true),
            }
        }
    }

    pub fn position(&self, world: &PhysicsWorld) -> (f32, f32) {
        world
            .bodies
            .get(self.body)
            .map(|b| (b.translation().x, b.translation().y))
            .unwrap_or_default()
    }

    pub fn angle(&self, world: &PhysicsWorld) -> f32 {
        world
            .bodies
            .get(self.body)
            .map(|b| b.rotation().angle())
            .unwrap_or_default()
    }

    pub fn velocity(&self, world: &PhysicsWorld) -> (f32, f32) {
        world
            .bodies
            .get(self.body)
            .map(|b| (b.linvel().x, b.linvel().y))
            .unwrap_or_default()
    }

    /// Current transform as a wire update
    pub fn position_update(&self, world: &PhysicsWorld) -> PositionUpdate {
        let (x, y) = self.position(world);
        PositionUpdate {
            id: self.id,
            x,
            y,
            angle: Some(self.angle(world)),
        }
    }

    /// Current state as a roster descriptor
    pub fn descriptor(&self, world: &PhysicsWorld) -> PlayerDescriptor {
        let (x, y) = self.position(world);
        PlayerDescriptor {
            id: self.id,
            x,
            y,
            width: self.width,
            height: self.height,
            angle: self.angle(world),
            color: self.color.clone(),
        }
    }

    /// Velocity change scaled by mass so the effect is independent of size
    fn push(&self, world: &mut PhysicsWorld, delta_v: Vector<Real>) {
        if let Some(body) = world.bodies.get_mut(self.body) {
            let mass = body.mass();
            body.apply_impulse(delta_v * mass, true);
        }
    }
}

/// New x when the player has left the canvas horizontally
fn wrap_x(x: f32, canvas_width: f32) -> Option<f32> {
    if x < 0.0 {
        Some(canvas_width + x)
    } else if x > canvas_width {
        Some(x - canvas_width)
    } else {
        None
    }
}
