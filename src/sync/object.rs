//! Synchronization objects and the object table

use core::fmt;

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::error::{KernelError, KernelResult};
use crate::scheduler::{Priority, SchedulerId, ThreadId};

use super::attr::{Discipline, Variant};
use super::waitq::WaitQueue;

/// Object handle: node (8 bits), generation (8 bits), table index (16 bits).
///
/// The generation changes every time a slot is reused, so a handle to a
/// deleted object stays invalid. Generations wrap after 255 reuses of one
/// slot; the table hands out the least recently freed slot first, so a stale
/// handle only aliases a live object after `255 * capacity` deletions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    pub const fn new(node: u8, generation: u8, index: u16) -> Self {
        ObjectId(((node as u32) << 24) | ((generation as u32) << 16) | index as u32)
    }

    pub const fn from_raw(raw: u32) -> Self {
        ObjectId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn node(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn generation(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn index(self) -> u16 {
        self.0 as u16
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:#010x})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sem{}.{}#{}",
            self.node(),
            self.index(),
            self.generation()
        )
    }
}

/// Owner and nesting depth of a mutex variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MutexState {
    pub owner: Option<ThreadId>,
    pub nesting: u32,
}

impl MutexState {
    pub const fn unlocked() -> Self {
        Self {
            owner: None,
            nesting: 0,
        }
    }

    pub const fn owned_by(owner: ThreadId) -> Self {
        Self {
            owner: Some(owner),
            nesting: 1,
        }
    }
}

/// Variant-specific state. Only the arms that need a ceiling carry one.
#[derive(Clone, Debug)]
pub enum ObjectKind {
    Counting {
        count: u32,
    },
    SimpleBinary {
        count: u32,
    },
    Mutex(MutexState),
    InheritMutex(MutexState),
    CeilingMutex {
        mutex: MutexState,
        scheduler: SchedulerId,
        ceiling: Priority,
    },
    Mrsp {
        owner: Option<ThreadId>,
        /// One ceiling per scheduler instance.
        ceilings: Vec<Priority>,
    },
}

#[derive(Clone, Debug)]
pub struct SyncObject {
    pub id: ObjectId,
    pub global: bool,
    pub kind: ObjectKind,
    pub waiters: WaitQueue,
}

impl SyncObject {
    pub fn new(id: ObjectId, discipline: Discipline, global: bool, kind: ObjectKind) -> Self {
        Self {
            id,
            global,
            kind,
            waiters: WaitQueue::new(discipline),
        }
    }

    pub fn variant(&self) -> Variant {
        match self.kind {
            ObjectKind::Counting { .. } => Variant::Counting,
            ObjectKind::SimpleBinary { .. } => Variant::SimpleBinary,
            ObjectKind::Mutex(_) => Variant::MutexNoProtocol,
            ObjectKind::InheritMutex(_) => Variant::MutexInherit,
            ObjectKind::CeilingMutex { .. } => Variant::MutexCeiling,
            ObjectKind::Mrsp { .. } => Variant::Mrsp,
        }
    }

    pub fn owner(&self) -> Option<ThreadId> {
        match &self.kind {
            ObjectKind::Counting { .. } | ObjectKind::SimpleBinary { .. } => None,
            ObjectKind::Mutex(mutex) | ObjectKind::InheritMutex(mutex) => mutex.owner,
            ObjectKind::CeilingMutex { mutex, .. } => mutex.owner,
            ObjectKind::Mrsp { owner, .. } => *owner,
        }
    }

    /// Available units for the semaphore variants, 0 or 1 for mutexes.
    pub fn count(&self) -> u32 {
        match &self.kind {
            ObjectKind::Counting { count } | ObjectKind::SimpleBinary { count } => *count,
            _ => u32::from(self.owner().is_none()),
        }
    }

    /// Ceiling on `scheduler`, for the variants that have one there.
    pub fn ceiling(&self, scheduler: SchedulerId) -> Option<Priority> {
        match &self.kind {
            ObjectKind::CeilingMutex {
                scheduler: own,
                ceiling,
                ..
            } if *own == scheduler => Some(*ceiling),
            ObjectKind::Mrsp { ceilings, .. } => ceilings.get(scheduler.index()).copied(),
            _ => None,
        }
    }
}

struct ObjectSlot {
    generation: u8,
    object: Option<SyncObject>,
}

/// Id to object lookup, O(1) and generation checked.
pub struct ObjectTable {
    node: u8,
    slots: Vec<ObjectSlot>,
    /// Free slot indices, least recently freed at the front.
    free: VecDeque<u16>,
}

impl ObjectTable {
    pub fn new(node: u8, capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| ObjectSlot {
                generation: 1,
                object: None,
            })
            .collect();
        let free = (0..capacity).map(|index| index as u16).collect();
        Self { node, slots, free }
    }

    #[inline]
    pub fn node(&self) -> u8 {
        self.node
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn allocate(
        &mut self,
        build: impl FnOnce(ObjectId) -> SyncObject,
    ) -> KernelResult<ObjectId> {
        let index = self.free.pop_front().ok_or(KernelError::TooMany)?;
        let slot = &mut self.slots[index as usize];
        let id = ObjectId::new(self.node, slot.generation, index);
        slot.object = Some(build(id));
        Ok(id)
    }

    /// Remove the object; the slot's next occupant gets a new generation.
    pub fn free(&mut self, id: ObjectId) -> KernelResult<SyncObject> {
        self.get(id)?;
        let slot = &mut self.slots[id.index() as usize];
        slot.generation = match slot.generation.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        let object = slot.object.take().ok_or(KernelError::InvalidId)?;
        self.free.push_back(id.index());
        Ok(object)
    }

    pub fn get(&self, id: ObjectId) -> KernelResult<&SyncObject> {
        if id.node() != self.node {
            return Err(KernelError::InvalidId);
        }
        let slot = self
            .slots
            .get(id.index() as usize)
            .ok_or(KernelError::InvalidId)?;
        if slot.generation != id.generation() {
            return Err(KernelError::InvalidId);
        }
        slot.object.as_ref().ok_or(KernelError::InvalidId)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> KernelResult<&mut SyncObject> {
        if id.node() != self.node {
            return Err(KernelError::InvalidId);
        }
        let slot = self
            .slots
            .get_mut(id.index() as usize)
            .ok_or(KernelError::InvalidId)?;
        if slot.generation != id.generation() {
            return Err(KernelError::InvalidId);
        }
        slot.object.as_mut().ok_or(KernelError::InvalidId)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncObject> {
        self.slots.iter().filter_map(|slot| slot.object.as_ref())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
