//! Two-level priority bitmap
//!
//! Priorities are split into a major part (upper nibble) and a minor part
//! (lower nibble). Bit `major` of the summary word is set while any bit of
//! `minor[major]` is set, so the most urgent ready priority is found with two
//! `trailing_zeros` instructions regardless of how many levels are
//! configured.

use crate::error::{fatal, InternalError};

use super::types::{Priority, PRIORITY_LEVELS_MAX};

const MINOR_BITS: usize = 16;
const MAJOR_WORDS: usize = PRIORITY_LEVELS_MAX / MINOR_BITS;

#[derive(Clone)]
pub struct PriorityBitmap {
    major: u16,
    minor: [u16; MAJOR_WORDS],
}

impl PriorityBitmap {
    pub const fn new() -> Self {
        Self {
            major: 0,
            minor: [0; MAJOR_WORDS],
        }
    }

    #[inline]
    const fn split(priority: Priority) -> (usize, u16) {
        let major = (priority as usize) / MINOR_BITS;
        let minor = 1u16 << ((priority as usize) % MINOR_BITS);
        (major, minor)
    }

    /// Mark `priority` as having ready threads.
    #[inline]
    pub fn add(&mut self, priority: Priority) {
        let (major, bit) = Self::split(priority);
        self.minor[major] |= bit;
        self.major |= 1 << major;
    }

    /// Mark `priority` as having no ready threads.
    #[inline]
    pub fn remove(&mut self, priority: Priority) {
        let (major, bit) = Self::split(priority);
        self.minor[major] &= !bit;
        if self.minor[major] == 0 {
            self.major &= !(1 << major);
        }
    }

    #[inline]
    pub fn contains(&self, priority: Priority) -> bool {
        let (major, bit) = Self::split(priority);
        self.minor[major] & bit != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.major == 0
    }

    /// Most urgent priority with ready threads. Fatal on an empty bitmap: the
    /// idle threads keep at least one bit set in a live system.
    #[inline]
    pub fn highest(&self) -> Priority {
        match self.try_highest() {
            Some(priority) => priority,
            None => fatal(InternalError::EmptyBitmap),
        }
    }

    #[inline]
    pub fn try_highest(&self) -> Option<Priority> {
        if self.major == 0 {
            return None;
        }
        let major = self.major.trailing_zeros() as usize;
        let minor = self.minor[major].trailing_zeros() as usize;
        Some((major * MINOR_BITS + minor) as Priority)
    }

    /// Most urgent set priority strictly less urgent than `after`.
    pub fn next_after(&self, after: Priority) -> Option<Priority> {
        let start = after as usize + 1;
        if start >= PRIORITY_LEVELS_MAX {
            return None;
        }
        let (major, _) = Self::split(start as Priority);
        let shift = start % MINOR_BITS;
        let partial = self.minor[major] & (u16::MAX << shift);
        if partial != 0 {
            return Some((major * MINOR_BITS + partial.trailing_zeros() as usize) as Priority);
        }
        let rest = if major + 1 >= MAJOR_WORDS {
            0
        } else {
            self.major & (u16::MAX << (major + 1))
        };
        if rest == 0 {
            return None;
        }
        let major = rest.trailing_zeros() as usize;
        let minor = self.minor[major].trailing_zeros() as usize;
        Some((major * MINOR_BITS + minor) as Priority)
    }

    /// Set priorities from most to least urgent.
    pub fn iter(&self) -> impl Iterator<Item = Priority> + '_ {
        let mut next = self.try_highest();
        core::iter::from_fn(move || {
            let current = next?;
            next = self.next_after(current);
            Some(current)
        })
    }
}

impl Default for PriorityBitmap {
    fn default() -> Self {
        Self::new()
    }
}
