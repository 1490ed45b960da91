//! Body container stepped at a fixed tick

use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;
use rustc_hash::FxHashMap;

use super::body::{Body, Direction, WorldLink};
use super::geometry::Geometry;
use crate::core::{SimulationConfig, tick_interval};

static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(0);

/// Identifies a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(u32);

/// Stable handle to a body inside a world.
///
/// Unlike the body's index, the id survives removal of other bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(u32);

/// Per-body state captured for debug drawing
#[derive(Debug, Clone, PartialEq)]
pub struct DebugSnapshot {
    pub id: BodyId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub contacts: Vec<Direction>,
}

/// Ordered set of bodies advanced together.
///
/// Bodies are stepped in registration order and only collide with the
/// geometry passed to [`World::step`], never with each other.
#[derive(Debug)]
pub struct World {
    id: WorldId,
    bodies: Vec<Body>,
    /// Parallel to `bodies`
    ids: Vec<BodyId>,
    /// Id to current index
    lookup: FxHashMap<BodyId, usize>,
    next_body: u32,
    tick_duration: f32,
    reference_tick: f32,
    gravity_direction: Vec3,
    /// Refresh debug snapshots every step
    pub debug: bool,
    snapshots: Vec<DebugSnapshot>,
    steps: u64,
}

impl World {
    /// World ticking at 30 Hz with gravity along -Z
    pub fn new() -> Self {
        Self::from_config(&SimulationConfig::default())
    }

    /// World using the tick and gravity settings of a config
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            id: WorldId(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed)),
            bodies: Vec::new(),
            ids: Vec::new(),
            lookup: FxHashMap::default(),
            next_body: 0,
            tick_duration: config.physics_interval(),
            reference_tick: config.reference_interval(),
            gravity_direction: config.gravity_direction.normalize_or(Vec3::NEG_Z),
            debug: false,
            snapshots: Vec::new(),
            steps: 0,
        }
    }

    /// This world's id
    pub fn id(&self) -> WorldId {
        self.id
    }

    fn link(&self, index: usize) -> WorldLink {
        WorldLink {
            world: self.id,
            index,
            tick_duration: self.tick_duration,
            reference_tick: self.reference_tick,
            gravity_direction: self.gravity_direction,
        }
    }

    /// Register a body at the end of the step order
    pub fn add_body(&mut self, mut body: Body) -> BodyId {
        let index = self.bodies.len();
        let id = BodyId(self.next_body);
        self.next_body += 1;

        body.set_link(Some(self.link(index)));
        self.bodies.push(body);
        self.ids.push(id);
        self.lookup.insert(id, index);
        log::debug!("Added body {id:?} at index {index}");
        id
    }

    /// Detach a body, closing the gap it leaves.
    ///
    /// The returned body no longer belongs to any world.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let index = self.lookup.remove(&id)?;
        let mut body = self.bodies.remove(index);
        self.ids.remove(index);
        body.set_link(None);

        for (shifted, (moved, moved_id)) in self.bodies[index..]
            .iter_mut()
            .zip(&self.ids[index..])
            .enumerate()
        {
            let new_index = index + shifted;
            if let Some(link) = moved.link_mut() {
                link.index = new_index;
            }
            self.lookup.insert(*moved_id, new_index);
        }
        log::debug!("Removed body {id:?} from index {index}");
        Some(body)
    }

    /// Advance every body by one tick in registration order
    pub fn step(&mut self, geometry: &dyn Geometry) {
        for body in &mut self.bodies {
            body.integrate(self.tick_duration, geometry);
        }
        self.steps += 1;

        if self.debug {
            self.refresh_debug();
        }
    }

    fn refresh_debug(&mut self) {
        self.snapshots.clear();
        for (id, body) in self.ids.iter().zip(&self.bodies) {
            let contacts: Vec<Direction> = body.contacts().iter().map(|(dir, _)| dir).collect();
            log::trace!(
                "step {} body {:?}: pos={} vel={} contacts={:?}",
                self.steps,
                id,
                body.position,
                body.velocity,
                contacts
            );
            self.snapshots.push(DebugSnapshot {
                id: *id,
                position: body.position,
                velocity: body.velocity,
                contacts,
            });
        }
    }

    /// Snapshots from the last debug step
    pub fn debug_snapshots(&self) -> &[DebugSnapshot] {
        &self.snapshots
    }

    /// Look up a body
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.lookup.get(&id).map(|&index| &self.bodies[index])
    }

    /// Look up a body mutably
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        let index = *self.lookup.get(&id)?;
        self.bodies.get_mut(index)
    }

    /// Whether the world holds a body
    pub fn contains(&self, id: BodyId) -> bool {
        self.lookup.contains_key(&id)
    }

    /// Bodies in step order
    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.ids.iter().copied().zip(&self.bodies)
    }

    /// Number of bodies
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the world is empty
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Seconds per tick
    pub fn tick_duration(&self) -> f32 {
        self.tick_duration
    }

    /// Seconds per reference tick
    pub fn reference_tick(&self) -> f32 {
        self.reference_tick
    }

    /// Unit gravity direction
    pub fn gravity_direction(&self) -> Vec3 {
        self.gravity_direction
    }

    /// Ticks taken so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Change the tick rate. Rates that are not finite and positive are
    /// ignored; returns whether the rate was applied.
    pub fn set_tick_rate(&mut self, rate: f32) -> bool {
        let Some(tick_duration) = tick_interval(rate) else {
            log::warn!("Ignoring invalid tick rate {rate}");
            return false;
        };
        self.tick_duration = tick_duration;
        self.relink();
        true
    }

    /// Change the gravity direction; zero vectors are ignored
    pub fn set_gravity_direction(&mut self, direction: Vec3) {
        if let Some(direction) = direction.try_normalize() {
            self.gravity_direction = direction;
            self.relink();
        }
    }

    fn relink(&mut self) {
        for index in 0..self.bodies.len() {
            let link = self.link(index);
            self.bodies[index].set_link(Some(link));
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
