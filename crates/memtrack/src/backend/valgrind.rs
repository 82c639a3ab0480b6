//! Valgrind memcheck backend, through client requests issued by `crabgrind`.
//!
//! Outside of Valgrind the client requests are a handful of no-op instructions, so a
//! binary built with this backend still runs natively.

use crabgrind::memcheck::{self, alloc, MemState};

use super::Backend;
use crate::RED_ZONE;

#[derive(Clone, Copy, Debug, Default)]
pub struct Valgrind;

impl Backend for Valgrind {
    #[inline]
    fn malloc(&self, ptr: *mut u8, size: usize, zero: bool) {
        alloc::malloc(ptr.cast(), size, RED_ZONE, zero);
    }

    #[inline]
    fn resize(&self, ptr: *mut u8, old_size: usize, new_size: usize) {
        alloc::resize_inplace(ptr.cast(), old_size, new_size, RED_ZONE);
    }

    // memcheck remembers the block size from `malloc`.
    #[inline]
    fn free_size(&self, ptr: *mut u8, _size: usize) {
        alloc::free(ptr.cast(), RED_ZONE);
    }

    #[inline]
    fn mem_defined(&self, ptr: *mut u8, size: usize) {
        let _ = memcheck::mark_mem(ptr.cast(), size, MemState::Defined);
    }

    #[inline]
    fn mem_undefined(&self, ptr: *mut u8, size: usize) {
        let _ = memcheck::mark_mem(ptr.cast(), size, MemState::Undefined);
    }

    #[inline]
    fn mem_noaccess(&self, ptr: *mut u8, size: usize) {
        let _ = memcheck::mark_mem(ptr.cast(), size, MemState::NoAccess);
    }
}
