//! Probe-collided point bodies
//!
//! A body is a point with velocity and a ring of short ray probes. One call
//! to [`Body::integrate`] is one fixed tick of motion; there is no continuous
//! solve. Velocity is measured in units per reference tick, so a world
//! ticking at its reference rate moves a body by exactly `velocity` per
//! tick, and other rates scale motion, gravity and damping to match.

use glam::{Quat, Vec3};
use smallvec::SmallVec;

use super::geometry::{Geometry, ObjectId, Ray};
use super::world::WorldId;
use crate::core::{ImpulseScaling, SimulationConfig};

/// Named probe directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
    Front,
    Back,
}

impl Direction {
    /// All directions in probe order
    pub const ALL: [Direction; 6] = [
        Direction::Top,
        Direction::Bottom,
        Direction::Left,
        Direction::Right,
        Direction::Front,
        Direction::Back,
    ];

    /// Unit vector in the body's local frame (Z up, Y forward)
    pub fn local_vector(self) -> Vec3 {
        match self {
            Direction::Top => Vec3::Z,
            Direction::Bottom => Vec3::NEG_Z,
            Direction::Left => Vec3::NEG_X,
            Direction::Right => Vec3::X,
            Direction::Front => Vec3::Y,
            Direction::Back => Vec3::NEG_Y,
        }
    }

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Direction::Top => "top",
            Direction::Bottom => "bottom",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Front => "front",
            Direction::Back => "back",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// One configured ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub direction: Direction,
    /// Local-frame ray direction
    pub vector: Vec3,
}

impl Probe {
    /// Probe along the direction's own axis
    pub fn axis(direction: Direction) -> Self {
        Self {
            direction,
            vector: direction.local_vector(),
        }
    }
}

/// A surface touched by a probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal facing the body
    pub normal: Vec3,
    /// Distance from the body position
    pub distance: f32,
    /// World-space probe direction that found the surface
    pub probe: Vec3,
    /// What was hit
    pub object: ObjectId,
}

/// Contacts found by one probe pass, at most one per direction
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Contacts {
    slots: [Option<Contact>; 6],
}

impl Contacts {
    /// Contact in a direction
    pub fn get(&self, direction: Direction) -> Option<&Contact> {
        self.slots[direction.slot()].as_ref()
    }

    /// Shorthand for the floor contact
    pub fn bottom(&self) -> Option<&Contact> {
        self.get(Direction::Bottom)
    }

    /// Whether any probe touched anything
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Number of directions in contact
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Contacts in probe order
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &Contact)> {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| self.get(direction).map(|contact| (direction, contact)))
    }

    fn offer(&mut self, direction: Direction, contact: Contact) {
        let slot = &mut self.slots[direction.slot()];
        // Earlier probes win ties
        if slot.is_none_or(|current| contact.distance < current.distance) {
            *slot = Some(contact);
        }
    }
}

/// Membership of a body in a world, with the world settings a body needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WorldLink {
    pub(crate) world: WorldId,
    pub(crate) index: usize,
    pub(crate) tick_duration: f32,
    pub(crate) reference_tick: f32,
    pub(crate) gravity_direction: Vec3,
}

/// Physical state of one entity
#[derive(Debug, Clone)]
pub struct Body {
    /// Authoritative position
    pub position: Vec3,
    /// Position at the start of the last tick
    previous_position: Vec3,
    /// Velocity in units per reference tick
    pub velocity: Vec3,
    /// Facing; rotates probe directions
    pub orientation: Quat,
    previous_orientation: Quat,
    /// Probe length
    pub radius: f32,
    /// Disables gravity and collision response
    pub noclip: bool,
    /// Gravity magnitude
    pub gravity: f32,
    /// Per-axis velocity decay per reference tick
    pub damping: Vec3,
    /// Horizontal speed cap, `<= 0` disables it
    pub max_speed: f32,
    pub impulse_scaling: ImpulseScaling,
    probes: SmallVec<[Probe; 6]>,
    contacts: Contacts,
    world: Option<WorldLink>,
}

impl Body {
    /// Body at the origin with default tunables
    pub fn new() -> Self {
        Self::from_config(&SimulationConfig::default())
    }

    /// Body using the body tunables of a config
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            position: Vec3::ZERO,
            previous_position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            previous_orientation: Quat::IDENTITY,
            radius: config.body_radius,
            noclip: false,
            gravity: config.gravity,
            damping: config.damping,
            max_speed: config.max_speed,
            impulse_scaling: config.impulse_scaling,
            probes: Direction::ALL.into_iter().map(Probe::axis).collect(),
            contacts: Contacts::default(),
            world: None,
        }
    }

    /// Place the body; both interpolation ends start here
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self.previous_position = position;
        self
    }

    /// Set the probe length
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Enable or disable noclip
    pub fn with_noclip(mut self, noclip: bool) -> Self {
        self.noclip = noclip;
        self
    }

    /// Set the gravity magnitude
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set per-axis damping
    pub fn with_damping(mut self, damping: Vec3) -> Self {
        self.damping = damping;
        self
    }

    /// Set the horizontal speed cap
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Replace the probe set. Probes are cast in the given order.
    pub fn with_probes(mut self, probes: impl IntoIterator<Item = Probe>) -> Self {
        self.probes = probes.into_iter().collect();
        self
    }

    /// Position at the start of the last tick
    pub fn previous_position(&self) -> Vec3 {
        self.previous_position
    }

    /// Orientation at the start of the last tick
    pub fn previous_orientation(&self) -> Quat {
        self.previous_orientation
    }

    /// Position blended between the last two ticks
    pub fn interpolated_position(&self, alpha: f32) -> Vec3 {
        self.previous_position.lerp(self.position, alpha)
    }

    /// Orientation blended between the last two ticks
    pub fn interpolated_orientation(&self, alpha: f32) -> Quat {
        self.previous_orientation.slerp(self.orientation, alpha)
    }

    /// Contacts found during the last tick
    pub fn contacts(&self) -> &Contacts {
        &self.contacts
    }

    /// Configured probes
    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Owning world, if attached
    pub fn world(&self) -> Option<WorldId> {
        self.world.map(|link| link.world)
    }

    /// Index inside the owning world
    pub fn index(&self) -> Option<usize> {
        self.world.map(|link| link.index)
    }

    pub(crate) fn link_mut(&mut self) -> Option<&mut WorldLink> {
        self.world.as_mut()
    }

    pub(crate) fn set_link(&mut self, link: Option<WorldLink>) {
        self.world = link;
    }

    /// Advance by one fixed tick and resolve contacts.
    ///
    /// Does nothing for a body outside any world or for a non-positive tick.
    pub fn integrate(&mut self, tick_duration: f32, geometry: &dyn Geometry) -> Contacts {
        let Some(link) = self.world else {
            return Contacts::default();
        };
        if !(tick_duration.is_finite() && tick_duration > 0.0) {
            return Contacts::default();
        }
        let scalar = tick_duration / link.reference_tick;

        if !self.noclip {
            self.velocity +=
                link.gravity_direction * (self.gravity * link.reference_tick * tick_duration);
        }

        if self.max_speed > 0.0 {
            let horizontal = self.velocity.truncate().clamp_length_max(self.max_speed);
            self.velocity = horizontal.extend(self.velocity.z);
        }

        self.velocity *= self.damping.powf(scalar);

        self.previous_position = self.position;
        self.previous_orientation = self.orientation;
        self.position += self.velocity * scalar;

        self.contacts = if self.noclip {
            Contacts::default()
        } else {
            let contacts = self.check_collisions(geometry);
            self.resolve(&contacts);
            contacts
        };
        self.contacts
    }

    /// Floor contacts clamp the body to rest at `radius` above the surface.
    /// Every other contact pushes the body back to `radius` along its probe
    /// and removes the velocity heading into the surface; the tangential part
    /// is kept so bodies slide along walls.
    fn resolve(&mut self, contacts: &Contacts) {
        for (direction, contact) in contacts.iter() {
            if direction == Direction::Bottom {
                self.velocity.z = 0.0;
                self.position.z = contact.point.z + self.radius;
                continue;
            }

            let penetration = self.radius - contact.distance;
            if penetration > 0.0 {
                self.position -= contact.probe * penetration;
            }
            let into = self.velocity.dot(contact.probe);
            if into > 0.0 {
                self.velocity -= contact.probe * into;
            }
        }
    }

    /// Add an impulse to velocity.
    ///
    /// Ignored while the body is outside any world.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        let Some(link) = self.world else {
            return;
        };
        let impulse = match self.impulse_scaling {
            ImpulseScaling::Raw => impulse,
            ImpulseScaling::TickRelative => impulse * (link.tick_duration / link.reference_tick),
        };
        if impulse.is_finite() {
            self.velocity += impulse;
        }
    }

    /// Cast every probe from the current position.
    ///
    /// Records the nearest hit per direction when it is closer than
    /// `radius`. Never mutates the body.
    pub fn check_collisions(&self, geometry: &dyn Geometry) -> Contacts {
        let mut contacts = Contacts::default();
        for probe in &self.probes {
            let ray = Ray::new(self.position, self.orientation * probe.vector);
            if ray.direction == Vec3::ZERO {
                continue;
            }
            let Some(hit) = geometry.cast_ray(&ray, self.radius) else {
                continue;
            };
            if hit.distance < self.radius {
                contacts.offer(
                    probe.direction,
                    Contact {
                        point: hit.point,
                        normal: hit.normal,
                        distance: hit.distance,
                        probe: ray.direction,
                        object: hit.object,
                    },
                );
            }
        }
        contacts
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{EmptyGeometry, Shape, StaticGeometry, World};
    use std::f32::consts::FRAC_PI_2;

    const TICK: f32 = 1.0 / 30.0;

    fn floor() -> StaticGeometry {
        let mut geometry = StaticGeometry::new();
        geometry.insert(Shape::floor(0.0));
        geometry
    }

    /// World at the default 30 Hz with one body, returning the body's world
    fn world_with(body: Body) -> (World, crate::physics::BodyId) {
        let mut world = World::new();
        let id = world.add_body(body);
        (world, id)
    }

    #[test]
    fn test_detached_body_is_inert() {
        let mut body = Body::new().with_position(Vec3::new(0.0, 0.0, 5.0));
        body.apply_impulse(Vec3::X);
        let contacts = body.integrate(TICK, &floor());

        assert!(contacts.is_empty());
        assert_eq!(body.velocity, Vec3::ZERO);
        assert_eq!(body.position, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_gravity_decreases_vertical_velocity() {
        let (mut world, id) = world_with(Body::new().with_position(Vec3::new(0.0, 0.0, 100.0)));
        let body = world.body_mut(id).unwrap();

        let mut last = body.velocity.z;
        for _ in 0..20 {
            body.integrate(TICK, &EmptyGeometry);
            assert!(body.velocity.z < last);
            last = body.velocity.z;
        }
    }

    #[test]
    fn test_noclip_ignores_gravity_and_geometry() {
        let (mut world, id) =
            world_with(Body::new().with_noclip(true).with_position(Vec3::new(0.0, 0.0, 0.5)));
        let body = world.body_mut(id).unwrap();
        body.velocity = Vec3::new(0.0, 0.0, -0.1);

        let contacts = body.integrate(TICK, &floor());
        assert!(contacts.is_empty());
        assert!(body.position.z < 0.5);
        assert!(body.velocity.z > -0.1);
    }

    #[test]
    fn test_previous_position_snapshots_before_move() {
        let (mut world, id) = world_with(Body::new().with_noclip(true));
        let body = world.body_mut(id).unwrap();
        body.velocity = Vec3::new(0.1, 0.0, 0.0);

        body.integrate(TICK, &EmptyGeometry);
        let after_first = body.position;
        body.integrate(TICK, &EmptyGeometry);

        assert_eq!(body.previous_position(), after_first);
        assert!(body.position.x > after_first.x);
        let halfway = body.interpolated_position(0.5);
        assert!(halfway.x > after_first.x && halfway.x < body.position.x);
    }

    #[test]
    fn test_falling_body_rests_on_floor() {
        let (mut world, id) = world_with(Body::new().with_position(Vec3::new(0.0, 0.0, 5.0)));
        let geometry = floor();
        let body = world.body_mut(id).unwrap();

        let mut landed = false;
        for _ in 0..1000 {
            let contacts = body.integrate(TICK, &geometry);
            if contacts.bottom().is_some() {
                assert_eq!(body.position.z, 1.0);
                assert_eq!(body.velocity.z, 0.0);
                landed = true;
                break;
            }
        }
        assert!(landed, "body never reached the floor");
    }

    #[test]
    fn test_resting_body_stays_put() {
        let (mut world, id) = world_with(Body::new().with_position(Vec3::new(0.0, 0.0, 1.0)));
        let geometry = floor();
        let body = world.body_mut(id).unwrap();

        for _ in 0..60 {
            body.integrate(TICK, &geometry);
        }
        assert_eq!(body.position.z, 1.0);
        assert_eq!(body.velocity.z, 0.0);
    }

    #[test]
    fn test_wall_blocks_but_allows_sliding() {
        let mut geometry = floor();
        let wall = geometry.insert(Shape::cuboid(Vec3::new(0.0, 2.0, 1.0), Vec3::new(10.0, 0.5, 10.0)));
        let (mut world, id) = world_with(
            Body::new()
                .with_position(Vec3::new(0.0, 0.6, 1.0))
                .with_max_speed(0.0),
        );
        let body = world.body_mut(id).unwrap();
        body.velocity = Vec3::new(0.1, 0.2, 0.0);

        let contacts = body.integrate(TICK, &geometry);
        let front = contacts.get(Direction::Front).unwrap();
        assert_eq!(front.object, wall);
        assert!((body.position.y - 0.5).abs() < 1e-5);
        assert_eq!(body.velocity.y, 0.0);
        assert!(body.velocity.x > 0.0);
    }

    #[test]
    fn test_probes_follow_orientation() {
        let mut geometry = StaticGeometry::new();
        // Box on the +X side
        geometry.insert(Shape::cuboid(Vec3::new(1.2, 0.0, 0.0), Vec3::splat(0.5)));

        let mut body = Body::new();
        assert!(body.check_collisions(&geometry).get(Direction::Right).is_some());

        // Quarter turn left: front now points along -X, right along +Y
        body.orientation = Quat::from_rotation_z(FRAC_PI_2);
        let contacts = body.check_collisions(&geometry);
        assert!(contacts.get(Direction::Back).is_some());
        assert!(contacts.get(Direction::Right).is_none());
    }

    #[test]
    fn test_check_collisions_ignores_far_geometry() {
        let mut geometry = StaticGeometry::new();
        geometry.insert(Shape::floor(-3.0));
        let body = Body::new();
        assert!(body.check_collisions(&geometry).is_empty());
        assert!(body.check_collisions(&EmptyGeometry).is_empty());
    }

    #[test]
    fn test_duplicate_direction_keeps_first_on_tie() {
        let mut geometry = StaticGeometry::new();
        let floor_id = geometry.insert(Shape::floor(-0.5));
        let body = Body::new().with_probes([
            Probe::axis(Direction::Bottom),
            Probe {
                direction: Direction::Bottom,
                vector: Vec3::NEG_Z,
            },
        ]);

        let contacts = body.check_collisions(&geometry);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts.bottom().unwrap().object, floor_id);
        assert_eq!(contacts.bottom().unwrap().probe, Vec3::NEG_Z);
    }

    #[test]
    fn test_max_speed_clamps_horizontal_only() {
        let (mut world, id) = world_with(
            Body::new()
                .with_noclip(true)
                .with_damping(Vec3::ONE)
                .with_max_speed(0.25),
        );
        let body = world.body_mut(id).unwrap();
        body.velocity = Vec3::new(3.0, 4.0, 2.0);

        body.integrate(TICK, &EmptyGeometry);
        assert!((body.velocity.truncate().length() - 0.25).abs() < 1e-5);
        assert_eq!(body.velocity.z, 2.0);
    }

    #[test]
    fn test_damping_is_tick_rate_invariant() {
        let damping = Vec3::splat(0.5);
        let (mut coarse, a) =
            world_with(Body::new().with_noclip(true).with_damping(damping).with_max_speed(0.0));
        let (mut fine, b) =
            world_with(Body::new().with_noclip(true).with_damping(damping).with_max_speed(0.0));
        coarse.body_mut(a).unwrap().velocity = Vec3::X;
        fine.body_mut(b).unwrap().velocity = Vec3::X;

        coarse.body_mut(a).unwrap().integrate(TICK, &EmptyGeometry);
        for _ in 0..2 {
            fine.body_mut(b).unwrap().integrate(TICK / 2.0, &EmptyGeometry);
        }

        let coarse_v = coarse.body(a).unwrap().velocity.x;
        let fine_v = fine.body(b).unwrap().velocity.x;
        assert!((coarse_v - fine_v).abs() < 1e-5);
    }

    #[test]
    fn test_tick_relative_impulse_scales() {
        let mut world = World::new();
        world.set_tick_rate(60.0);
        let mut body = Body::new();
        body.impulse_scaling = ImpulseScaling::TickRelative;
        let id = world.add_body(body);

        world.body_mut(id).unwrap().apply_impulse(Vec3::X);
        assert!((world.body(id).unwrap().velocity.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_raw_impulse_is_unscaled() {
        let mut world = World::new();
        world.set_tick_rate(60.0);
        let id = world.add_body(Body::new());

        world.body_mut(id).unwrap().apply_impulse(Vec3::X);
        assert_eq!(world.body(id).unwrap().velocity.x, 1.0);
    }
}
