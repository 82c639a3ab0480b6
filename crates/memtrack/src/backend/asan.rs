//! AddressSanitizer backend.
//!
//! ASan only knows poisoned and unpoisoned bytes, so defined and undefined collapse into
//! "unpoisoned". The symbols come from the sanitizer runtime, which is linked in when the
//! final binary is built with `-Zsanitizer=address`.

use std::ffi::c_void;

use super::Backend;

extern "C" {
    fn __asan_poison_memory_region(addr: *const c_void, size: usize);
    fn __asan_unpoison_memory_region(addr: *const c_void, size: usize);
}

#[inline]
fn poison(ptr: *mut u8, size: usize) {
    // SAFETY: the runtime only updates shadow memory for the range, it never dereferences it.
    unsafe { __asan_poison_memory_region(ptr.cast_const().cast(), size) }
}

#[inline]
fn unpoison(ptr: *mut u8, size: usize) {
    // SAFETY: see `poison`.
    unsafe { __asan_unpoison_memory_region(ptr.cast_const().cast(), size) }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Asan;

impl Backend for Asan {
    #[inline]
    fn malloc(&self, ptr: *mut u8, size: usize, _zero: bool) {
        unpoison(ptr, size);
    }

    // No native resize in ASan.
    #[inline]
    fn resize(&self, ptr: *mut u8, old_size: usize, new_size: usize) {
        poison(ptr, old_size);
        unpoison(ptr, new_size);
    }

    #[inline]
    fn free_size(&self, ptr: *mut u8, size: usize) {
        poison(ptr, size);
    }

    #[inline]
    fn mem_defined(&self, ptr: *mut u8, size: usize) {
        unpoison(ptr, size);
    }

    #[inline]
    fn mem_undefined(&self, ptr: *mut u8, size: usize) {
        unpoison(ptr, size);
    }

    #[inline]
    fn mem_noaccess(&self, ptr: *mut u8, size: usize) {
        poison(ptr, size);
    }
}
