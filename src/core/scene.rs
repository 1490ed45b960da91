//! Scene members and scene descriptions
//!
//! Every member is one of a fixed set of kinds, and per-frame work
//! dispatches on the kind. Static members supply the probe geometry; physical
//! members mirror a body, interpolated between its last two ticks.
//!
//! Descriptions are saved and loaded in RON (Rusty Object Notation) or JSON.

use std::fs;
use std::path::Path;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::core::SimulationConfig;
use crate::physics::{Body, BodyId, Geometry, ObjectId, Ray, RayHit, Shape, StaticGeometry, World};

/// Render-facing placement of a member
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
    /// Scale factor
    pub scale: Vec3,
}

impl Transform {
    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Get the transformation matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Forward direction (+Y, Z up)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Per-frame animation driven by the render delta
pub trait Animator {
    /// Advance by `delta` seconds, updating the member's transform
    fn advance(&mut self, delta: f32, transform: &mut Transform);
}

/// What a member is, and what the loop does with it
pub enum MemberKind {
    /// Collidable, never moves
    Static { object: ObjectId },
    /// Follows a body
    Physical { body: BodyId },
    /// Animated, not simulated
    Animated { animator: Box<dyn Animator> },
    /// Follows a body and is animated
    PhysicalAnimated {
        body: BodyId,
        animator: Box<dyn Animator>,
    },
}

impl MemberKind {
    /// Body this member follows
    pub fn body(&self) -> Option<BodyId> {
        match self {
            MemberKind::Physical { body } | MemberKind::PhysicalAnimated { body, .. } => Some(*body),
            _ => None,
        }
    }
}

/// A named scene member
pub struct SceneMember {
    pub name: String,
    pub transform: Transform,
    pub kind: MemberKind,
}

/// Live scene: members plus the static geometry bodies probe against
pub struct Scene {
    pub name: String,
    members: Vec<SceneMember>,
    geometry: StaticGeometry,
}

impl Scene {
    /// Create an empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            geometry: StaticGeometry::new(),
        }
    }

    /// Add collidable geometry
    pub fn add_static(&mut self, name: impl Into<String>, shape: Shape) -> ObjectId {
        let object = self.geometry.insert(shape);
        let transform = match shape {
            Shape::Cuboid {
                center,
                half_extents,
                rotation,
            } => Transform {
                position: center,
                rotation,
                scale: half_extents * 2.0,
            },
            Shape::Plane { normal, offset } => Transform::from_position(normal * offset),
            Shape::Sphere { center, radius } => Transform {
                position: center,
                scale: Vec3::splat(radius * 2.0),
                ..Default::default()
            },
        };
        self.members.push(SceneMember {
            name: name.into(),
            transform,
            kind: MemberKind::Static { object },
        });
        object
    }

    /// Register a body with the world and mirror it
    pub fn add_physical(&mut self, name: impl Into<String>, world: &mut World, body: Body) -> BodyId {
        let transform = Transform::from_position(body.position);
        let body = world.add_body(body);
        self.members.push(SceneMember {
            name: name.into(),
            transform,
            kind: MemberKind::Physical { body },
        });
        body
    }

    /// Add an animated, non-simulated member
    pub fn add_animated(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        animator: Box<dyn Animator>,
    ) {
        self.members.push(SceneMember {
            name: name.into(),
            transform,
            kind: MemberKind::Animated { animator },
        });
    }

    /// Register a body with the world and mirror it with animation on top
    pub fn add_physical_animated(
        &mut self,
        name: impl Into<String>,
        world: &mut World,
        body: Body,
        animator: Box<dyn Animator>,
    ) -> BodyId {
        let transform = Transform::from_position(body.position);
        let body = world.add_body(body);
        self.members.push(SceneMember {
            name: name.into(),
            transform,
            kind: MemberKind::PhysicalAnimated { body, animator },
        });
        body
    }

    /// Remove the first member with `name`, detaching its body or geometry
    pub fn remove(&mut self, name: &str, world: &mut World) -> Option<SceneMember> {
        let index = self.members.iter().position(|member| member.name == name)?;
        let member = self.members.remove(index);
        match &member.kind {
            MemberKind::Static { object } => {
                self.geometry.remove(*object);
            }
            MemberKind::Physical { body } | MemberKind::PhysicalAnimated { body, .. } => {
                world.remove_body(*body);
            }
            MemberKind::Animated { .. } => {}
        }
        log::debug!("Removed scene member {name}");
        Some(member)
    }

    /// Look up a member by name
    pub fn get(&self, name: &str) -> Option<&SceneMember> {
        self.members.iter().find(|member| member.name == name)
    }

    /// Members in insertion order
    pub fn members(&self) -> &[SceneMember] {
        &self.members
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the scene is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Probe geometry of the static members
    pub fn geometry(&self) -> &StaticGeometry {
        &self.geometry
    }

    /// Physical member under a view ray.
    ///
    /// Casts from `origin` along the view direction `rotation * -Z`. Each
    /// body counts as a ball of its probe radius; bodies containing the
    /// origin (the viewer's own) are skipped. Static geometry nearer than
    /// the nearest body hides it.
    pub fn pick(
        &self,
        world: &World,
        origin: Vec3,
        rotation: Quat,
        max_distance: f32,
    ) -> Option<&SceneMember> {
        let ray = Ray::new(origin, rotation * Vec3::NEG_Z);
        let limit = self
            .geometry
            .cast_ray(&ray, max_distance)
            .map_or(max_distance, |hit| hit.distance);

        let mut nearest: Option<(f32, &SceneMember)> = None;
        for member in &self.members {
            let Some(body) = member.kind.body().and_then(|id| world.body(id)) else {
                continue;
            };
            let ball = Shape::Sphere {
                center: body.position,
                radius: body.radius,
            };
            let Some((distance, _)) = ball.intersect(&ray) else {
                continue;
            };
            if distance <= limit && nearest.is_none_or(|(best, _)| distance < best) {
                nearest = Some((distance, member));
            }
        }
        nearest.map(|(_, member)| member)
    }

    /// Move render transforms to the interpolated body state and advance
    /// animations
    pub fn update_render(&mut self, world: &World, delta: f32, alpha: f32) {
        for member in &mut self.members {
            match &mut member.kind {
                MemberKind::Static { .. } => {}
                MemberKind::Physical { body } => {
                    if let Some(body) = world.body(*body) {
                        follow(&mut member.transform, body, alpha);
                    }
                }
                MemberKind::Animated { animator } => {
                    animator.advance(delta, &mut member.transform);
                }
                MemberKind::PhysicalAnimated { body, animator } => {
                    if let Some(body) = world.body(*body) {
                        follow(&mut member.transform, body, alpha);
                    }
                    animator.advance(delta, &mut member.transform);
                }
            }
        }
    }
}

fn follow(transform: &mut Transform, body: &Body, alpha: f32) {
    transform.position = body.interpolated_position(alpha);
    transform.rotation = body.interpolated_orientation(alpha);
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl Geometry for Scene {
    fn cast_ray(&self, ray: &Ray, max_distance: f32) -> Option<RayHit> {
        self.geometry.cast_ray(ray, max_distance)
    }
}

// ============================================================================
// Scene descriptions
// ============================================================================

/// Serialized static member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticDescription {
    pub name: String,
    pub shape: Shape,
}

/// Serialized body spawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDescription {
    pub name: String,
    pub position: Vec3,
    /// Probe length; the config default when absent
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub noclip: bool,
}

/// A scene that can be built without code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// Scene name
    pub name: String,
    /// Scene version for compatibility
    pub version: u32,
    #[serde(default)]
    pub statics: Vec<StaticDescription>,
    #[serde(default)]
    pub bodies: Vec<BodyDescription>,
}

impl SceneDescription {
    /// Create an empty description
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            statics: Vec::new(),
            bodies: Vec::new(),
        }
    }

    /// Grid of unit floor tiles with their top faces at z = 0, plus a raised
    /// cube turned an eighth of a half-turn about Z
    #[must_use]
    pub fn floor_grid(rows: u32, cols: u32) -> Self {
        let mut description = Self::new("Floor grid");
        for col in 0..cols {
            for row in 0..rows {
                let x = (col as f32 - cols as f32 / 2.0).floor();
                let y = (row as f32 - rows as f32 / 2.0).floor();
                description.statics.push(StaticDescription {
                    name: format!("tile-{col}-{row}"),
                    shape: Shape::cuboid(Vec3::new(x, y, -0.05), Vec3::new(0.5, 0.5, 0.05)),
                });
            }
        }
        description.statics.push(StaticDescription {
            name: "cube".to_string(),
            shape: Shape::Cuboid {
                center: Vec3::new(0.0, 0.0, 2.0),
                half_extents: Vec3::splat(0.5),
                rotation: Quat::from_rotation_z(std::f32::consts::PI / 8.0),
            },
        });
        description
    }

    /// Add a body spawn
    pub fn with_body(mut self, name: impl Into<String>, position: Vec3) -> Self {
        self.bodies.push(BodyDescription {
            name: name.into(),
            position,
            radius: None,
            noclip: false,
        });
        self
    }

    /// Build the live scene, registering bodies with `world`
    pub fn build(&self, config: &SimulationConfig, world: &mut World) -> Scene {
        let mut scene = Scene::new(self.name.clone());
        for member in &self.statics {
            scene.add_static(member.name.clone(), member.shape);
        }
        for spawn in &self.bodies {
            let mut body = Body::from_config(config)
                .with_position(spawn.position)
                .with_noclip(spawn.noclip);
            if let Some(radius) = spawn.radius {
                body = body.with_radius(radius);
            }
            scene.add_physical(spawn.name.clone(), world, body);
        }
        log::info!(
            "Built scene '{}': {} static, {} bodies",
            self.name,
            self.statics.len(),
            self.bodies.len()
        );
        scene
    }

    /// Save the description to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SceneError::SerializeError(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| SceneError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a description from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::IoError(e.to_string()))?;
        ron::from_str(&content).map_err(|e| SceneError::DeserializeError(e.to_string()))
    }

    /// Save the description to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| SceneError::SerializeError(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| SceneError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a description from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SceneError::DeserializeError(e.to_string()))
    }
}

/// Errors that can occur during scene operations
#[derive(Debug, Clone)]
pub enum SceneError {
    /// IO error
    IoError(String),
    /// Serialization error
    SerializeError(String),
    /// Deserialization error
    DeserializeError(String),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializeError(e) => write!(f, "Deserialization error: {e}"),
        }
    }
}

impl std::error::Error for SceneError {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Spin(f32);

    impl Animator for Spin {
        fn advance(&mut self, delta: f32, transform: &mut Transform) {
            transform.rotation = Quat::from_rotation_z(self.0 * delta) * transform.rotation;
        }
    }

    #[test]
    fn test_physical_member_interpolates() {
        let mut world = World::new();
        let mut scene = Scene::new("test");
        scene.add_static("floor", Shape::floor(-100.0));
        let body = Body::new()
            .with_noclip(true)
            .with_damping(Vec3::ONE)
            .with_position(Vec3::ZERO);
        let id = scene.add_physical("mover", &mut world, body);
        world.body_mut(id).unwrap().velocity = Vec3::new(0.2, 0.0, 0.0);

        world.step(&scene);
        scene.update_render(&world, 0.016, 0.5);

        let transform = scene.get("mover").unwrap().transform;
        assert!((transform.position.x - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_animated_members_advance() {
        let mut world = World::new();
        let mut scene = Scene::new("test");
        scene.add_animated("spinner", Transform::default(), Box::new(Spin(1.0)));
        let id = scene.add_physical_animated(
            "spinning-body",
            &mut world,
            Body::new().with_position(Vec3::new(0.0, 0.0, 3.0)),
            Box::new(Spin(2.0)),
        );

        scene.update_render(&world, 0.5, 0.0);

        let spinner = scene.get("spinner").unwrap().transform;
        assert!(spinner.rotation.angle_between(Quat::from_rotation_z(0.5)) < 1e-5);
        let follower = scene.get("spinning-body").unwrap();
        assert_eq!(follower.kind.body(), Some(id));
        assert_eq!(follower.transform.position, Vec3::new(0.0, 0.0, 3.0));
        assert!(follower.transform.rotation.angle_between(Quat::from_rotation_z(1.0)) < 1e-5);
    }

    #[test]
    fn test_scene_is_probe_geometry() {
        let mut world = World::new();
        let mut scene = Scene::new("test");
        let floor = scene.add_static("floor", Shape::floor(0.0));
        let id = scene.add_physical(
            "faller",
            &mut world,
            Body::new().with_position(Vec3::new(0.0, 0.0, 0.5)),
        );

        world.step(&scene);
        let body = world.body(id).unwrap();
        assert_eq!(body.contacts().bottom().unwrap().object, floor);
        assert_eq!(body.position.z, 1.0);
    }

    #[test]
    fn test_pick_finds_body_in_view() {
        let mut world = World::new();
        let mut scene = Scene::new("test");
        scene.add_static("floor", Shape::floor(0.0));
        scene.add_physical("viewer", &mut world, Body::new().with_position(Vec3::new(0.0, 0.0, 1.0)));
        scene.add_physical("near", &mut world, Body::new().with_position(Vec3::new(0.0, 5.0, 1.0)));
        scene.add_physical("far", &mut world, Body::new().with_position(Vec3::new(0.0, 9.0, 1.0)));

        // Level view: -Z turned to +Y
        let level = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
        let origin = Vec3::new(0.0, 0.0, 1.0);

        let picked = scene.pick(&world, origin, level, 20.0).unwrap();
        assert_eq!(picked.name, "near");
        assert!(scene.pick(&world, origin, level, 3.0).is_none());
        assert!(scene.pick(&world, origin, Quat::IDENTITY, 20.0).is_none());
    }

    #[test]
    fn test_pick_blocked_by_static_geometry() {
        let mut world = World::new();
        let mut scene = Scene::new("test");
        scene.add_static(
            "crate",
            Shape::cuboid(Vec3::new(0.0, 2.5, 1.0), Vec3::splat(0.5)),
        );
        scene.add_physical("hidden", &mut world, Body::new().with_position(Vec3::new(0.0, 5.0, 1.0)));

        let level = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
        assert!(scene.pick(&world, Vec3::new(0.0, 0.0, 1.0), level, 20.0).is_none());
    }

    #[test]
    fn test_remove_detaches_body_and_geometry() {
        let mut world = World::new();
        let mut scene = Scene::new("test");
        scene.add_static("floor", Shape::floor(0.0));
        scene.add_physical("a", &mut world, Body::new());
        let b = scene.add_physical("b", &mut world, Body::new());

        let removed = scene.remove("a", &mut world).unwrap();
        assert!(removed.kind.body().is_some());
        assert_eq!(world.len(), 1);
        assert_eq!(world.body(b).unwrap().index(), Some(0));

        scene.remove("floor", &mut world);
        assert!(scene.geometry().is_empty());
        assert!(scene.remove("missing", &mut world).is_none());
    }

    #[test]
    fn test_floor_grid_description() {
        let description = SceneDescription::floor_grid(16, 16).with_body("player", Vec3::new(3.0, 3.0, 5.0));
        assert_eq!(description.statics.len(), 257);

        let mut world = World::new();
        let scene = description.build(&SimulationConfig::default(), &mut world);
        assert_eq!(scene.len(), 258);
        assert_eq!(world.len(), 1);

        let ray = Ray::new(Vec3::new(3.0, 3.0, 5.0), Vec3::NEG_Z);
        let hit = scene.cast_ray(&ray, 10.0).unwrap();
        assert!((hit.point.z).abs() < 1e-5);
    }

    #[test]
    fn test_description_ron_roundtrip() {
        let description = SceneDescription::floor_grid(2, 2).with_body("player", Vec3::Z);
        let ron_str =
            ron::ser::to_string_pretty(&description, ron::ser::PrettyConfig::default()).unwrap();
        assert!(ron_str.contains("player"));

        let loaded: SceneDescription = ron::from_str(&ron_str).unwrap();
        assert_eq!(loaded, description);
    }

    #[test]
    fn test_description_json_file() {
        let path = std::env::temp_dir().join("tickloop_scene_test.json");
        let description = SceneDescription::new("json").with_body("player", Vec3::ONE);
        description.save_json(&path).unwrap();

        let loaded = SceneDescription::load_json(&path).unwrap();
        assert_eq!(loaded.bodies[0].name, "player");
        let _ = fs::remove_file(path);
    }
}
