use memtrack::{AccessState, Backend};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// One primitive call as received by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Event {
    Malloc { addr: usize, size: usize, zero: bool },
    FreeSize { addr: usize, size: usize },
    MemDefined { addr: usize, size: usize },
    MemUndefined { addr: usize, size: usize },
    MemNoaccess { addr: usize, size: usize },
}

impl Event {
    /// Same event with its address made relative to `base`, for stable output.
    pub fn rebased(self, base: usize) -> Self {
        let rel = |addr: usize| addr.wrapping_sub(base);
        match self {
            Event::Malloc { addr, size, zero } => Event::Malloc {
                addr: rel(addr),
                size,
                zero,
            },
            Event::FreeSize { addr, size } => Event::FreeSize {
                addr: rel(addr),
                size,
            },
            Event::MemDefined { addr, size } => Event::MemDefined {
                addr: rel(addr),
                size,
            },
            Event::MemUndefined { addr, size } => Event::MemUndefined {
                addr: rel(addr),
                size,
            },
            Event::MemNoaccess { addr, size } => Event::MemNoaccess {
                addr: rel(addr),
                size,
            },
        }
    }
}

/// A call that breaks the per-region lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// `malloc` over bytes that are still allocated.
    AllocateLive { addr: usize },
    /// `free_size` over bytes that are not allocated.
    FreeUnallocated { addr: usize },
    /// A `mem_*` mark over bytes that are not allocated.
    MarkUnallocated { addr: usize },
}

/// Backend that logs every call and keeps a byte-level shadow of allocation and access state.
///
/// It has no native resize, so resizes arrive as `free_size` followed by `malloc`.
#[derive(Debug, Default)]
pub struct Recorder {
    events: RefCell<Vec<Event>>,
    shadow: RefCell<BTreeMap<usize, AccessState>>,
    violations: RefCell<Vec<Violation>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Drains the event log, keeping the shadow state.
    pub fn take_events(&self) -> Vec<Event> {
        self.events.take()
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.violations.borrow().clone()
    }

    /// State of a single byte; `None` when it is not allocated.
    pub fn state(&self, addr: usize) -> Option<AccessState> {
        self.shadow.borrow().get(&addr).copied()
    }

    /// The common state of `size` bytes at `addr`, or `None` if they differ or any is
    /// unallocated.
    pub fn uniform_state(&self, addr: usize, size: usize) -> Option<AccessState> {
        let shadow = self.shadow.borrow();
        let first = *shadow.get(&addr)?;
        (addr..addr + size)
            .all(|a| shadow.get(&a) == Some(&first))
            .then_some(first)
    }

    /// Whether none of the `size` bytes at `addr` are allocated.
    pub fn is_unallocated(&self, addr: usize, size: usize) -> bool {
        let shadow = self.shadow.borrow();
        shadow.range(addr..addr + size).next().is_none()
    }

    /// Number of bytes currently allocated, whatever their access state.
    pub fn tracked_bytes(&self) -> usize {
        self.shadow.borrow().len()
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn violate(&self, violation: Violation) {
        self.violations.borrow_mut().push(violation);
    }

    fn mark_range(&self, ptr: *mut u8, size: usize, state: AccessState) {
        let addr = ptr as usize;
        let mut shadow = self.shadow.borrow_mut();
        let mut violated = false;
        for a in addr..addr + size {
            match shadow.get_mut(&a) {
                Some(current) => *current = state,
                None => violated = true,
            }
        }
        drop(shadow);
        if violated {
            self.violate(Violation::MarkUnallocated { addr });
        }
    }
}

impl Backend for Recorder {
    fn malloc(&self, ptr: *mut u8, size: usize, zero: bool) {
        let addr = ptr as usize;
        self.push(Event::Malloc { addr, size, zero });

        let state = if zero {
            AccessState::Defined
        } else {
            AccessState::Undefined
        };
        let mut shadow = self.shadow.borrow_mut();
        let mut violated = false;
        for a in addr..addr + size {
            violated |= shadow.insert(a, state).is_some();
        }
        drop(shadow);
        if violated {
            self.violate(Violation::AllocateLive { addr });
        }
    }

    fn free_size(&self, ptr: *mut u8, size: usize) {
        let addr = ptr as usize;
        self.push(Event::FreeSize { addr, size });

        let mut shadow = self.shadow.borrow_mut();
        let mut violated = false;
        for a in addr..addr + size {
            violated |= shadow.remove(&a).is_none();
        }
        drop(shadow);
        if violated {
            self.violate(Violation::FreeUnallocated { addr });
        }
    }

    fn mem_defined(&self, ptr: *mut u8, size: usize) {
        self.push(Event::MemDefined {
            addr: ptr as usize,
            size,
        });
        self.mark_range(ptr, size, AccessState::Defined);
    }

    fn mem_undefined(&self, ptr: *mut u8, size: usize) {
        self.push(Event::MemUndefined {
            addr: ptr as usize,
            size,
        });
        self.mark_range(ptr, size, AccessState::Undefined);
    }

    fn mem_noaccess(&self, ptr: *mut u8, size: usize) {
        self.push(Event::MemNoaccess {
            addr: ptr as usize,
            size,
        });
        self.mark_range(ptr, size, AccessState::NoAccess);
    }
}
