//! The contract every tracking backend implements.
//!
//! A backend receives region lifecycle events from the allocator and forwards them to a
//! memory checker. Exactly one implementation is linked into a build, see [`crate::ActiveBackend`].

use serde::Serialize;

#[cfg(feature = "asan")]
pub mod asan;
pub mod none;
#[cfg(feature = "valgrind")]
pub mod valgrind;

/// Coarse classification of the bytes in a region, as seen by a memory checker.
///
/// # Variants
///
/// * `Defined` - Bytes hold meaningful values and may be read
/// * `Undefined` - Bytes are allocated but not initialized, writes are fine, reads see garbage
/// * `NoAccess` - Bytes are logically unallocated, any access should be reported
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    Defined,
    Undefined,
    NoAccess,
}

/// Receiver of region lifecycle events.
///
/// All methods are fire-and-forget: nothing is returned and misuse is only ever surfaced
/// by the memory checker itself. Implementations must not allocate, since they are called
/// from inside allocator paths.
///
/// # Examples
///
/// ```rust
/// use memtrack::Backend;
///
/// struct Silent;
///
/// impl Backend for Silent {
///     fn malloc(&self, _ptr: *mut u8, _size: usize, _zero: bool) {}
///     fn free_size(&self, _ptr: *mut u8, _size: usize) {}
///     fn mem_defined(&self, _ptr: *mut u8, _size: usize) {}
///     fn mem_undefined(&self, _ptr: *mut u8, _size: usize) {}
///     fn mem_noaccess(&self, _ptr: *mut u8, _size: usize) {}
/// }
///
/// // `resize` falls back to free-then-allocate.
/// Silent.resize(std::ptr::null_mut(), 16, 32);
/// ```
pub trait Backend {
    /// Whether this backend observes anything at all. Derived operations use it to skip
    /// work, such as usable size queries, whose only consumer is the backend.
    const ENABLED: bool = true;

    /// A new region of `size` bytes at `ptr` is allocated. It is defined when `zero` is set,
    /// undefined otherwise.
    fn malloc(&self, ptr: *mut u8, size: usize, zero: bool);

    /// The region at `ptr` changed size in place from `old_size` to `new_size`.
    ///
    /// Bytes past `old_size` become undefined, bytes below it keep their state. Backends
    /// without a native resize get [`crate::derived::resize_by_reallocation`].
    fn resize(&self, ptr: *mut u8, old_size: usize, new_size: usize) {
        crate::derived::resize_by_reallocation(self, ptr, old_size, new_size);
    }

    /// The region of `size` bytes at `ptr` is deallocated.
    fn free_size(&self, ptr: *mut u8, size: usize);

    fn mem_defined(&self, ptr: *mut u8, size: usize);

    fn mem_undefined(&self, ptr: *mut u8, size: usize);

    /// Used for guard and padding bytes inside a live allocation.
    fn mem_noaccess(&self, ptr: *mut u8, size: usize);

    /// Reclassifies `size` bytes at `ptr` without touching their allocation status.
    #[inline]
    fn mark(&self, ptr: *mut u8, size: usize, state: AccessState) {
        match state {
            AccessState::Defined => self.mem_defined(ptr, size),
            AccessState::Undefined => self.mem_undefined(ptr, size),
            AccessState::NoAccess => self.mem_noaccess(ptr, size),
        }
    }
}

impl<B: Backend + ?Sized> Backend for &B {
    const ENABLED: bool = B::ENABLED;

    #[inline]
    fn malloc(&self, ptr: *mut u8, size: usize, zero: bool) {
        (**self).malloc(ptr, size, zero);
    }

    #[inline]
    fn resize(&self, ptr: *mut u8, old_size: usize, new_size: usize) {
        (**self).resize(ptr, old_size, new_size);
    }

    #[inline]
    fn free_size(&self, ptr: *mut u8, size: usize) {
        (**self).free_size(ptr, size);
    }

    #[inline]
    fn mem_defined(&self, ptr: *mut u8, size: usize) {
        (**self).mem_defined(ptr, size);
    }

    #[inline]
    fn mem_undefined(&self, ptr: *mut u8, size: usize) {
        (**self).mem_undefined(ptr, size);
    }

    #[inline]
    fn mem_noaccess(&self, ptr: *mut u8, size: usize) {
        (**self).mem_noaccess(ptr, size);
    }
}
