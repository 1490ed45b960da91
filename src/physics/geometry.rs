//! Ray queries against scene geometry
//!
//! Collision in this engine is probe-based: a body casts short rays and the
//! geometry answers with the nearest surface. `Geometry` is the seam between
//! the two; `StaticGeometry` answers from analytic planes and boxes, and
//! `ColliderGeometry` answers from a rapier3d collider set.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Rays closer than this to parallel with a face are treated as missing it
const PARALLEL_EPSILON: f32 = 1e-8;

/// Identifies a piece of collidable geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// A half-line from `origin` along unit `direction`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray, normalizing the direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at `distance` along the ray
    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Nearest surface found by a ray query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space intersection point
    pub point: Vec3,
    /// Surface normal, facing the ray origin
    pub normal: Vec3,
    /// Distance from the ray origin
    pub distance: f32,
    /// What was hit
    pub object: ObjectId,
}

/// Anything a ray can be cast against
pub trait Geometry {
    /// Nearest hit within `max_distance`, if any
    fn cast_ray(&self, ray: &Ray, max_distance: f32) -> Option<RayHit>;
}

impl<T: Geometry + ?Sized> Geometry for &T {
    fn cast_ray(&self, ray: &Ray, max_distance: f32) -> Option<RayHit> {
        (**self).cast_ray(ray, max_distance)
    }
}

/// Geometry with nothing in it
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyGeometry;

impl Geometry for EmptyGeometry {
    fn cast_ray(&self, _ray: &Ray, _max_distance: f32) -> Option<RayHit> {
        None
    }
}

/// Analytic collision shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Infinite plane of points `p` with `p.dot(normal) == offset`
    Plane { normal: Vec3, offset: f32 },
    /// Oriented box
    Cuboid {
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
    },
    /// Ball
    Sphere { center: Vec3, radius: f32 },
}

impl Shape {
    /// Horizontal plane at height `z`
    pub fn floor(z: f32) -> Self {
        Self::Plane {
            normal: Vec3::Z,
            offset: z,
        }
    }

    /// Axis-aligned box
    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        Self::Cuboid {
            center,
            half_extents,
            rotation: Quat::IDENTITY,
        }
    }

    /// Distance and outward normal of the first surface the ray enters.
    ///
    /// Rays starting inside a box or sphere report nothing.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        match *self {
            Shape::Plane { normal, offset } => {
                let denom = normal.dot(ray.direction);
                if denom.abs() < PARALLEL_EPSILON {
                    return None;
                }
                let distance = (offset - normal.dot(ray.origin)) / denom;
                if distance < 0.0 {
                    return None;
                }
                let facing = if denom < 0.0 { normal } else { -normal };
                Some((distance, facing))
            }
            Shape::Cuboid {
                center,
                half_extents,
                rotation,
            } => {
                let inverse = rotation.inverse();
                let origin = inverse * (ray.origin - center);
                let direction = inverse * ray.direction;

                let mut near = f32::NEG_INFINITY;
                let mut far = f32::INFINITY;
                let mut near_normal = Vec3::ZERO;

                for axis in 0..3 {
                    let o = origin[axis];
                    let d = direction[axis];
                    let h = half_extents[axis];
                    if d.abs() < PARALLEL_EPSILON {
                        if o < -h || o > h {
                            return None;
                        }
                        continue;
                    }

                    let mut t1 = (-h - o) / d;
                    let mut t2 = (h - o) / d;
                    // Entering through the face whose normal opposes the ray
                    let mut sign = -1.0;
                    if t1 > t2 {
                        std::mem::swap(&mut t1, &mut t2);
                        sign = 1.0;
                    }
                    if t1 > near {
                        near = t1;
                        near_normal = Vec3::ZERO;
                        near_normal[axis] = sign;
                    }
                    far = far.min(t2);
                    if near > far {
                        return None;
                    }
                }

                if near < 0.0 || far < 0.0 {
                    return None;
                }
                Some((near, (rotation * near_normal).normalize_or_zero()))
            }
            Shape::Sphere { center, radius } => {
                let offset = ray.origin - center;
                let along = offset.dot(ray.direction);
                let outside = offset.length_squared() - radius * radius;
                if outside <= 0.0 || along > 0.0 {
                    return None;
                }
                let discriminant = along * along - outside;
                if discriminant < 0.0 {
                    return None;
                }
                let distance = -along - discriminant.sqrt();
                Some((distance, (ray.at(distance) - center).normalize_or_zero()))
            }
        }
    }
}

/// A flat list of analytic shapes
#[derive(Debug, Clone, Default)]
pub struct StaticGeometry {
    shapes: Vec<(ObjectId, Shape)>,
    next_id: u32,
}

impl StaticGeometry {
    /// Create empty geometry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shape and return its id
    pub fn insert(&mut self, shape: Shape) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.shapes.push((id, shape));
        id
    }

    /// Remove a shape, returning it if present
    pub fn remove(&mut self, id: ObjectId) -> Option<Shape> {
        let index = self.shapes.iter().position(|(other, _)| *other == id)?;
        Some(self.shapes.remove(index).1)
    }

    /// Look up a shape
    pub fn get(&self, id: ObjectId) -> Option<&Shape> {
        self.shapes
            .iter()
            .find(|(other, _)| *other == id)
            .map(|(_, shape)| shape)
    }

    /// Number of shapes
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether there are no shapes
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl Geometry for StaticGeometry {
    fn cast_ray(&self, ray: &Ray, max_distance: f32) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for (id, shape) in &self.shapes {
            let Some((distance, normal)) = shape.intersect(ray) else {
                continue;
            };
            if distance > max_distance {
                continue;
            }
            // Strictly nearer only: earlier shapes win ties
            if best.is_none_or(|hit| distance < hit.distance) {
                best = Some(RayHit {
                    point: ray.at(distance),
                    normal,
                    distance,
                    object: *id,
                });
            }
        }
        best
    }
}
