//! Semaphore attributes and variant resolution
//!
//! Creation resolves the attribute set and the initial count to exactly one
//! [`Variant`] or rejects the request. There is no fallback variant.

use bitflags::bitflags;

use crate::error::{KernelError, KernelResult};

bitflags! {
    /// Attribute set passed to `create_semaphore`.
    ///
    /// `COUNTING`, `FIFO` and local scope are the zero defaults.
    pub struct AttributeSet: u32 {
        const COUNTING = 0x0000;
        const FIFO = 0x0000;
        const GLOBAL = 0x0002;
        const PRIORITY = 0x0004;
        const BINARY = 0x0010;
        const SIMPLE_BINARY = 0x0020;
        const INHERIT_PRIORITY = 0x0040;
        const PRIORITY_CEILING = 0x0080;
        const MULTIPROCESSOR_RESOURCE_SHARING = 0x0100;
    }
}

impl AttributeSet {
    const PROTOCOLS: [AttributeSet; 3] = [
        AttributeSet::INHERIT_PRIORITY,
        AttributeSet::PRIORITY_CEILING,
        AttributeSet::MULTIPROCESSOR_RESOURCE_SHARING,
    ];

    fn protocol_count(self) -> usize {
        Self::PROTOCOLS
            .iter()
            .filter(|protocol| self.contains(**protocol))
            .count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    Counting,
    SimpleBinary,
    MutexNoProtocol,
    MutexInherit,
    MutexCeiling,
    Mrsp,
}

impl Variant {
    /// Variants with an owner and a nesting counter.
    pub fn has_owner(self) -> bool {
        !matches!(self, Variant::Counting | Variant::SimpleBinary)
    }

    pub fn has_ceiling(self) -> bool {
        matches!(self, Variant::MutexCeiling | Variant::Mrsp)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Counting => "counting",
            Variant::SimpleBinary => "simple-binary",
            Variant::MutexNoProtocol => "mutex",
            Variant::MutexInherit => "mutex-inherit",
            Variant::MutexCeiling => "mutex-ceiling",
            Variant::Mrsp => "mrsp",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discipline {
    Fifo,
    Priority,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub variant: Variant,
    pub discipline: Discipline,
    pub global: bool,
}

/// Map attributes and initial count to a variant.
///
/// Errors come in a fixed order: an attribute combination that names no
/// variant is `NotDefined` before a bad count is `InvalidNumber`.
pub fn resolve(attributes: AttributeSet, count: u32) -> KernelResult<Resolved> {
    let discipline = if attributes.contains(AttributeSet::PRIORITY) {
        Discipline::Priority
    } else {
        Discipline::Fifo
    };
    let global = attributes.contains(AttributeSet::GLOBAL);
    let binary = attributes.contains(AttributeSet::BINARY);
    let simple = attributes.contains(AttributeSet::SIMPLE_BINARY);
    let protocols = attributes.protocol_count();

    let variant = match (binary, simple) {
        (true, true) => return Err(KernelError::NotDefined),
        (false, false) => {
            if protocols != 0 {
                return Err(KernelError::NotDefined);
            }
            Variant::Counting
        }
        (false, true) => {
            if protocols != 0 {
                return Err(KernelError::NotDefined);
            }
            Variant::SimpleBinary
        }
        (true, false) => {
            if protocols > 1 {
                return Err(KernelError::NotDefined);
            }
            if protocols == 1 && discipline == Discipline::Fifo {
                return Err(KernelError::NotDefined);
            }
            if protocols == 1 && global {
                return Err(KernelError::NotDefined);
            }
            if attributes.contains(AttributeSet::INHERIT_PRIORITY) {
                Variant::MutexInherit
            } else if attributes.contains(AttributeSet::PRIORITY_CEILING) {
                Variant::MutexCeiling
            } else if attributes.contains(AttributeSet::MULTIPROCESSOR_RESOURCE_SHARING) {
                mrsp_variant()
            } else {
                Variant::MutexNoProtocol
            }
        }
    };

    if variant != Variant::Counting && count > 1 {
        return Err(KernelError::InvalidNumber);
    }

    Ok(Resolved {
        variant,
        discipline,
        global,
    })
}

/// Without multiprocessor support MrsP degenerates to a ceiling mutex.
#[cfg(feature = "smp")]
fn mrsp_variant() -> Variant {
    Variant::Mrsp
}

#[cfg(not(feature = "smp"))]
fn mrsp_variant() -> Variant {
    Variant::MutexCeiling
}
