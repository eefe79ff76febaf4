//! The ring of directions served by one set of traffic lights
//!
//! Directions live in a [`DirectionArena`] and point at their successor by
//! [`DirectionId`]. An [`Intersection`] owns an arena whose nodes form a single
//! circular chain of at least two directions, and keeps that invariant across
//! every mutation it offers.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};

use super::direction::Direction;
use super::error::{ensure_non_negative, SimError, SimResult};
use super::types::{DirectionId, SimId, MIN_DIRECTIONS};

/// Storage for directions, addressed by stable handles
///
/// The arena is where chains are assembled before they are handed to an
/// [`Intersection`]. Links can be set freely here, so an arena may hold broken
/// or partial chains; the intersection validates before accepting one.
#[derive(Debug, Clone, Default)]
pub struct DirectionArena {
    directions: HashMap<DirectionId, Direction>,
    next_id: usize,
}

impl DirectionArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a direction, unlinked, and return its handle
    pub fn insert(&mut self, mut direction: Direction) -> DirectionId {
        let id = DirectionId(SimId(self.next_id));
        self.next_id += 1;
        direction.set_next(None);
        self.directions.insert(id, direction);
        id
    }

    /// Point `from` at `to`
    pub fn link(&mut self, from: DirectionId, to: DirectionId) -> SimResult<()> {
        if !self.directions.contains_key(&to) {
            return Err(SimError::UnknownDirection(to));
        }
        let direction = self
            .directions
            .get_mut(&from)
            .ok_or(SimError::UnknownDirection(from))?;
        direction.set_next(Some(to));
        Ok(())
    }

    /// Clear the outgoing link of `from`, terminating the chain there
    pub fn unlink(&mut self, from: DirectionId) -> SimResult<()> {
        let direction = self
            .directions
            .get_mut(&from)
            .ok_or(SimError::UnknownDirection(from))?;
        direction.set_next(None);
        Ok(())
    }

    pub fn get(&self, id: DirectionId) -> Option<&Direction> {
        self.directions.get(&id)
    }

    pub fn get_mut(&mut self, id: DirectionId) -> Option<&mut Direction> {
        self.directions.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    fn remove(&mut self, id: DirectionId) -> Option<Direction> {
        self.directions.remove(&id)
    }

    /// Successor of `id`, or `None` for a terminated chain or a dangling link
    fn next_of(&self, id: DirectionId) -> Option<DirectionId> {
        self.directions
            .get(&id)
            .and_then(Direction::next)
            .filter(|next| self.directions.contains_key(next))
    }

    /// Whether following links from `head` comes back to `head` itself
    ///
    /// A chain that falls into a loop which skips `head`, or that ends, is not
    /// circular. A single direction pointing at itself is.
    pub fn list_is_circular(&self, head: Option<DirectionId>) -> bool {
        let Some(head) = head else {
            return false;
        };
        if !self.directions.contains_key(&head) {
            return false;
        }

        let mut seen = HashSet::from([head]);
        let mut current = self.next_of(head);
        while let Some(id) = current {
            if id == head {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            current = self.next_of(id);
        }
        false
    }

    /// Number of distinct directions reached from `head` before the walk
    /// returns to `head`, revisits any other direction, or hits the end
    pub fn list_length(&self, head: Option<DirectionId>) -> usize {
        let Some(head) = head else {
            return 0;
        };
        if !self.directions.contains_key(&head) {
            return 0;
        }

        let mut seen = HashSet::from([head]);
        let mut current = self.next_of(head);
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            current = self.next_of(id);
        }
        seen.len()
    }
}

/// Walks the ring once, starting at the head
pub struct RingIter<'a> {
    arena: &'a DirectionArena,
    current: Option<DirectionId>,
    remaining: usize,
}

impl<'a> Iterator for RingIter<'a> {
    type Item = (DirectionId, &'a Direction);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.current?;
        let direction = self.arena.get(id)?;
        self.remaining -= 1;
        self.current = direction.next();
        Some((id, direction))
    }
}

/// A traffic intersection: a circular ring of at least two directions
pub struct Intersection {
    arena: DirectionArena,
    head: DirectionId,
    num_directions: usize,
    /// Optional seeded RNG for reproducible arrivals
    rng: Option<StdRng>,
}

impl std::fmt::Debug for Intersection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Intersection")
            .field("head", &self.head)
            .field("num_directions", &self.num_directions)
            .field("seeded", &self.rng.is_some())
            .finish()
    }
}

/// Check that `head` starts a circular chain long enough to serve, returning its length
fn validate_ring(arena: &DirectionArena, head: DirectionId) -> SimResult<usize> {
    if arena.get(head).is_none() {
        return Err(SimError::StructuralInvariant(format!(
            "head {head:?} is not a stored direction, so no ring starts there"
        )));
    }
    if !arena.list_is_circular(Some(head)) {
        return Err(SimError::StructuralInvariant(format!(
            "the chain starting at {head:?} is not circular"
        )));
    }
    let length = arena.list_length(Some(head));
    if length < MIN_DIRECTIONS {
        return Err(SimError::StructuralInvariant(format!(
            "an intersection needs at least {MIN_DIRECTIONS} directions, the ring has {length}"
        )));
    }
    Ok(length)
}

impl Intersection {
    /// Take ownership of a pre-linked chain with `head` as its entry point
    ///
    /// Directions in the arena that are not on the ring are dropped.
    pub fn new(mut arena: DirectionArena, head: DirectionId) -> SimResult<Self> {
        let num_directions = validate_ring(&arena, head)?;

        let on_ring: HashSet<DirectionId> = RingIter {
            arena: &arena,
            current: Some(head),
            remaining: num_directions,
        }
        .map(|(id, _)| id)
        .collect();

        let detached: Vec<DirectionId> = arena
            .directions
            .keys()
            .filter(|id| !on_ring.contains(id))
            .copied()
            .collect();
        for id in detached {
            if let Some(direction) = arena.remove(id) {
                warn!(
                    "Discarding direction {} ({:?}): not on the ring starting at {:?}",
                    direction.name(),
                    id,
                    head
                );
            }
        }

        debug!(
            "Created intersection with {} directions, head {:?}",
            num_directions, head
        );
        Ok(Self {
            arena,
            head,
            num_directions,
            rng: None,
        })
    }

    /// Link `directions` into a ring in the given order, the first becoming the head
    pub fn from_directions(directions: Vec<Direction>) -> SimResult<Self> {
        let mut arena = DirectionArena::new();
        let ids: Vec<DirectionId> = directions
            .into_iter()
            .map(|direction| arena.insert(direction))
            .collect();

        let Some(&head) = ids.first() else {
            return Err(SimError::StructuralInvariant(
                "an intersection needs at least one direction to act as head".to_string(),
            ));
        };

        for (i, &id) in ids.iter().enumerate() {
            arena.link(id, ids[(i + 1) % ids.len()])?;
        }

        Self::new(arena, head)
    }

    /// Use a seeded RNG for vehicle arrivals
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    /// The four-way demo intersection: North, East, South and West
    pub fn create_four_way() -> SimResult<Self> {
        let directions = vec![
            Direction::new("North", vec![8.0, 6.0, 5.0, 2.0, 1.0], 3.0)?,
            Direction::new("East", vec![3.0, 2.0, 2.0, 1.0, 0.0], 2.0)?,
            Direction::new(
                "South",
                vec![11.0, 10.0, 9.0, 9.0, 6.0, 5.0, 4.0, 4.0, 2.0, 1.0],
                4.0,
            )?,
            Direction::new("West", vec![6.0, 6.0, 3.0, 2.0, 2.0], 5.0)?,
        ];
        Self::from_directions(directions)
    }

    /// The four-way demo intersection with reproducible arrivals
    pub fn create_four_way_with_seed(seed: u64) -> SimResult<Self> {
        Ok(Self::create_four_way()?.with_seed(seed))
    }

    pub fn head_direction(&self) -> DirectionId {
        self.head
    }

    /// Move the entry point of the ring to `head`
    ///
    /// The ring is validated again from the new head; on failure the previous
    /// head stays in place.
    pub fn set_head_direction(&mut self, head: DirectionId) -> SimResult<()> {
        let num_directions = validate_ring(&self.arena, head)?;
        self.head = head;
        self.num_directions = num_directions;
        Ok(())
    }

    pub fn num_directions(&self) -> usize {
        self.num_directions
    }

    pub fn direction(&self, id: DirectionId) -> Option<&Direction> {
        self.arena.get(id)
    }

    /// Mutable access to a direction's queue and parameters. Links stay private.
    pub fn direction_mut(&mut self, id: DirectionId) -> Option<&mut Direction> {
        self.arena.get_mut(id)
    }

    /// Successor of `id` on the ring
    pub fn next_of(&self, id: DirectionId) -> Option<DirectionId> {
        self.arena.next_of(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<DirectionId> {
        self.iter()
            .find(|(_, direction)| direction.name() == name)
            .map(|(id, _)| id)
    }

    /// Directions in ring order, starting at the head
    pub fn iter(&self) -> RingIter<'_> {
        RingIter {
            arena: &self.arena,
            current: Some(self.head),
            remaining: self.num_directions,
        }
    }

    /// Handles in ring order, starting at the head
    pub fn ids(&self) -> Vec<DirectionId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn list_is_circular(&self, head: Option<DirectionId>) -> bool {
        self.arena.list_is_circular(head)
    }

    pub fn list_length(&self, head: Option<DirectionId>) -> usize {
        self.arena.list_length(head)
    }

    /// Whether `id` is one of the directions on the ring
    pub fn contains(&self, id: DirectionId) -> bool {
        self.iter().any(|(candidate, _)| candidate == id)
    }

    /// Append a direction behind the current tail, just before the head
    pub fn add_direction(&mut self, direction: Direction) -> SimResult<DirectionId> {
        let (tail, _) = self.iter().last().ok_or_else(|| {
            SimError::StructuralInvariant("the ring has no tail to append after".to_string())
        })?;

        let name = direction.name().to_string();
        let id = self.arena.insert(direction);
        self.arena.link(tail, id)?;
        self.arena.link(id, self.head)?;
        self.num_directions += 1;

        debug!(
            "Added direction {} ({:?}) after {:?}, ring now has {} directions",
            name, id, tail, self.num_directions
        );
        Ok(id)
    }

    /// Splice a direction out of the ring and drop it
    ///
    /// Removing the head moves the head to its successor. Returns `Ok(false)`
    /// without touching anything when `id` is not on the ring.
    pub fn remove_direction(&mut self, id: DirectionId) -> SimResult<bool> {
        if self.num_directions <= MIN_DIRECTIONS {
            return Err(SimError::StructuralInvariant(format!(
                "cannot remove a direction from a ring of {} directions",
                self.num_directions
            )));
        }

        let ids = self.ids();
        let Some(position) = ids.iter().position(|&candidate| candidate == id) else {
            return Ok(false);
        };

        let count = ids.len();
        let predecessor = ids[(position + count - 1) % count];
        let successor = ids[(position + 1) % count];

        self.arena.link(predecessor, successor)?;
        if id == self.head {
            self.head = successor;
        }
        self.arena.remove(id);
        self.num_directions -= 1;

        debug!(
            "Removed direction {:?}, ring now has {} directions with head {:?}",
            id, self.num_directions, self.head
        );
        Ok(true)
    }

    /// Check that every queued vehicle on the ring can accrue `delta`
    pub(crate) fn check_waiting_time(&self, delta: f64) -> SimResult<()> {
        ensure_non_negative(delta, "waiting time delta")?;
        for (_, direction) in self.iter() {
            direction.check_waiting_time(delta)?;
        }
        Ok(())
    }

    /// Every queued vehicle on every direction accrues `delta` more waiting time
    pub fn add_waiting_time(&mut self, delta: f64) -> SimResult<()> {
        self.check_waiting_time(delta)?;
        for id in self.ids() {
            if let Some(direction) = self.arena.get_mut(id) {
                direction.add_waiting_time(delta)?;
            }
        }
        Ok(())
    }

    /// Draw a pod of arrivals for every direction, returning the total that arrived
    pub fn add_vehicles(&mut self) -> SimResult<usize> {
        let arrivals = self.draw_arrivals()?;
        self.apply_arrivals(arrivals)
    }

    /// Draw and make room for one pod per direction; queues keep their contents
    pub(crate) fn draw_arrivals(&mut self) -> SimResult<Vec<(DirectionId, usize)>> {
        let mut arrivals = Vec::with_capacity(self.num_directions);
        for id in self.ids() {
            let Some(direction) = self.arena.get_mut(id) else {
                continue;
            };
            let count = match &mut self.rng {
                Some(rng) => direction.draw_arrivals(rng)?,
                None => direction.draw_arrivals(&mut rand::rng())?,
            };
            direction.reserve_vehicles(count)?;
            arrivals.push((id, count));
        }
        Ok(arrivals)
    }

    pub(crate) fn apply_arrivals(&mut self, arrivals: Vec<(DirectionId, usize)>) -> SimResult<usize> {
        let mut arrived = 0;
        for (id, count) in arrivals {
            if let Some(direction) = self.arena.get_mut(id) {
                direction.add_vehicles(count)?;
                arrived += count;
            }
        }
        Ok(arrived)
    }

    /// Total number of queued vehicles across all directions
    pub fn num_vehicles(&self) -> usize {
        self.iter().map(|(_, direction)| direction.len()).sum()
    }

    /// Sum of the waiting time of every queued vehicle
    pub fn total_waiting_time(&self) -> f64 {
        self.iter()
            .map(|(_, direction)| direction.total_waiting_time())
            .sum()
    }

    /// Mean waiting time per queued vehicle, 0 when nobody is waiting
    pub fn avg_waiting_time(&self) -> f64 {
        let (total, count) = self.iter().fold((0.0, 0usize), |(total, count), (_, direction)| {
            (total + direction.total_waiting_time(), count + direction.len())
        });
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }
}
