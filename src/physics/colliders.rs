//! Probe geometry backed by rapier3d colliders

use glam::{Quat, Vec3};
use rapier3d::na::{self, UnitQuaternion};
use rapier3d::prelude::*;
use rustc_hash::FxHashMap;

use super::geometry::{Geometry, ObjectId, Ray as ProbeRay, RayHit};

/// Convert glam Quat to rapier3d UnitQuaternion
fn quat_to_rapier(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(na::Quaternion::new(q.w, q.x, q.y, q.z))
}

fn isometry(position: Vec3, rotation: Quat) -> Isometry<f32> {
    Isometry::from_parts(
        na::Translation3::new(position.x, position.y, position.z),
        quat_to_rapier(rotation),
    )
}

/// Static colliders answering ray probes through rapier's query pipeline.
///
/// Only the query side of rapier is used; nothing here is ever stepped.
/// Call [`ColliderGeometry::update`] after inserting or removing colliders.
pub struct ColliderGeometry {
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    query_pipeline: QueryPipeline,
    /// Rapier handle to public id
    objects: FxHashMap<rapier3d::geometry::ColliderHandle, ObjectId>,
    /// Public id to rapier handle
    handles: FxHashMap<ObjectId, rapier3d::geometry::ColliderHandle>,
    next_id: u32,
    dirty: bool,
}

impl ColliderGeometry {
    /// Create an empty collider set
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            objects: FxHashMap::default(),
            handles: FxHashMap::default(),
            next_id: 0,
            dirty: false,
        }
    }

    fn insert(&mut self, collider: Collider) -> ObjectId {
        let handle = self.collider_set.insert(collider);
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(handle, id);
        self.handles.insert(id, handle);
        self.dirty = true;
        id
    }

    /// Add a box collider
    pub fn add_box(&mut self, position: Vec3, rotation: Quat, half_extents: Vec3) -> ObjectId {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .position(isometry(position, rotation))
            .build();
        self.insert(collider)
    }

    /// Add a sphere collider
    pub fn add_ball(&mut self, position: Vec3, radius: f32) -> ObjectId {
        let collider = ColliderBuilder::ball(radius)
            .position(isometry(position, Quat::IDENTITY))
            .build();
        self.insert(collider)
    }

    /// Add a flat ground slab whose top face sits at height `z`
    pub fn add_ground(&mut self, z: f32, half_size: f32) -> ObjectId {
        let thickness = 0.1;
        self.add_box(
            Vec3::new(0.0, 0.0, z - thickness),
            Quat::IDENTITY,
            Vec3::new(half_size, half_size, thickness),
        )
    }

    /// Remove a collider
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let Some(handle) = self.handles.remove(&id) else {
            return false;
        };
        self.objects.remove(&handle);
        let mut island_manager = IslandManager::new();
        self.collider_set
            .remove(handle, &mut island_manager, &mut self.rigid_body_set, false);
        self.dirty = true;
        true
    }

    /// Rebuild the acceleration structure after edits
    pub fn update(&mut self) {
        if self.dirty {
            self.query_pipeline.update(&self.collider_set);
            self.dirty = false;
        }
    }

    /// Whether edits are waiting for [`ColliderGeometry::update`]
    pub fn needs_update(&self) -> bool {
        self.dirty
    }

    /// Number of colliders
    pub fn len(&self) -> usize {
        self.collider_set.len()
    }

    /// Whether there are no colliders
    pub fn is_empty(&self) -> bool {
        self.collider_set.is_empty()
    }
}

impl Default for ColliderGeometry {
    fn default() -> Self {
        Self::new()
    }
}

impl Geometry for ColliderGeometry {
    fn cast_ray(&self, probe: &ProbeRay, max_distance: f32) -> Option<RayHit> {
        let ray = Ray::new(
            point![probe.origin.x, probe.origin.y, probe.origin.z],
            vector![probe.direction.x, probe.direction.y, probe.direction.z],
        );

        let (handle, intersection) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            QueryFilter::default(),
        )?;

        // Solid casts report 0 from inside a collider; probes ignore those
        if intersection.time_of_impact <= 0.0 {
            return None;
        }

        let point = ray.point_at(intersection.time_of_impact);
        let normal = intersection.normal;
        Some(RayHit {
            point: Vec3::new(point.x, point.y, point.z),
            normal: Vec3::new(normal.x, normal.y, normal.z),
            distance: intersection.time_of_impact,
            object: *self.objects.get(&handle)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_hits_ground() {
        let mut geometry = ColliderGeometry::new();
        let ground = geometry.add_ground(0.0, 50.0);
        geometry.update();

        let probe = ProbeRay::new(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z);
        let hit = geometry.cast_ray(&probe, 10.0).unwrap();
        assert_eq!(hit.object, ground);
        assert!((hit.distance - 3.0).abs() < 1e-4);
        assert!((hit.normal - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn test_probe_respects_max_distance() {
        let mut geometry = ColliderGeometry::new();
        geometry.add_ball(Vec3::new(0.0, 10.0, 0.0), 1.0);
        geometry.update();

        let probe = ProbeRay::new(Vec3::ZERO, Vec3::Y);
        assert!(geometry.cast_ray(&probe, 5.0).is_none());
        assert!(geometry.cast_ray(&probe, 20.0).is_some());
    }

    #[test]
    fn test_removed_collider_is_not_hit() {
        let mut geometry = ColliderGeometry::new();
        let id = geometry.add_box(Vec3::new(0.0, 3.0, 0.0), Quat::IDENTITY, Vec3::splat(0.5));
        geometry.update();
        assert!(geometry.remove(id));
        assert!(geometry.needs_update());
        geometry.update();

        let probe = ProbeRay::new(Vec3::ZERO, Vec3::Y);
        assert!(geometry.cast_ray(&probe, 10.0).is_none());
        assert!(geometry.is_empty());
    }
}
