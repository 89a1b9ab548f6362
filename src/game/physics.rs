//! Physics world shared by the ground and every player body
//!
//! Thin wrapper over a rapier2d pipeline. Units are pixels with y pointing
//! down, matching canvas coordinates.

use rapier2d::parry::query;
use rapier2d::prelude::*;

/// Owns every rapier set plus the pipeline that steps them
pub struct PhysicsWorld {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    /// `gravity_y` is the engine gravity in px/s² (positive = down),
    /// `dt` the fixed step in seconds
    pub fn new(gravity_y: f32, dt: f32) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = dt;

        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            gravity: vector![0.0, gravity_y],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Advance the simulation by one fixed step
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Static box centred on (x, y)
    pub fn add_static_box(&mut self, x: f32, y: f32, width: f32, height: f32) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(width / 2.0, height / 2.0)
            .translation(vector![x, y])
            .build();
        self.colliders.insert(collider)
    }

    /// Dynamic box centred on (x, y) with a single collider attached
    pub fn add_dynamic_box(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        angle: f32,
        material: BodyMaterial,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![x, y])
            .rotation(angle)
            .build();
        let body_handle = self.bodies.insert(body);

        let collider = ColliderBuilder::cuboid(width / 2.0, height / 2.0)
            .restitution(material.restitution)
            .friction(material.friction)
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        (body_handle, collider_handle)
    }

    /// Remove a body together with its colliders
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Exact overlap test between a body's collider, posed at the body's
    /// current position, and a parentless collider.
    ///
    /// Posing from the body keeps the test correct right after a teleport,
    /// before the next step has synced collider positions.
    pub fn body_intersects(
        &self,
        body: RigidBodyHandle,
        body_collider: ColliderHandle,
        other: ColliderHandle,
    ) -> bool {
        let (Some(rb), Some(shape), Some(other)) = (
            self.bodies.get(body),
            self.colliders.get(body_collider),
            self.colliders.get(other),
        ) else {
            return false;
        };

        query::intersection_test(rb.position(), shape.shape(), other.position(), other.shape())
            .unwrap_or(false)
    }
}

/// Surface response of a dynamic body
#[derive(Debug, Clone, Copy)]
pub struct BodyMaterial {
    pub restitution: f32,
    pub friction: f32,
}

impl Default for BodyMaterial {
    fn default() -> Self {
        Self {
            restitution: 0.2,
            friction: 0.1,
        }
    }
}
