//! Report the lifecycle of allocator-managed memory regions to a memory checker.
//!
//! A custom allocator calls the `track_*` functions at the moment a region is allocated,
//! resized, freed or reclassified. Which checker receives those events is fixed at build time
//! by cargo features:
//!
//! * `valgrind` - Valgrind memcheck client requests
//! * `asan` - AddressSanitizer poisoning
//! * neither - nothing; every call compiles away
//!
//! Enabling both is a build error. The `padding` feature switches on byte-precise sizes and a
//! red zone of [`PADDING_SIZE`] bytes.
//!
//! ```rust
//! use memtrack::{track_free, track_malloc, track_mem_defined};
//!
//! let mut block = [0u8; 64];
//! let ptr = block.as_mut_ptr();
//!
//! track_malloc(ptr, 64, false);
//! track_mem_defined(ptr, 64);
//! track_free(ptr, &|_ptr: *const u8| 64usize);
//! ```

#[cfg(all(feature = "valgrind", feature = "asan"))]
compile_error!("memtrack features `valgrind` and `asan` are mutually exclusive, enable at most one");

pub mod backend;
pub mod derived;
mod selection;

pub use backend::{AccessState, Backend};
pub use derived::UsableSize;
pub use selection::{
    log_selection, selection, Selection, Tool, PADDING_SIZE, RED_ZONE, SIZE_PRECISE,
};

cfg_if::cfg_if! {
    if #[cfg(feature = "valgrind")] {
        pub use backend::valgrind::Valgrind;
        /// The backend linked into this build.
        pub type ActiveBackend = Valgrind;
        pub const ACTIVE: ActiveBackend = Valgrind;
        pub const ACTIVE_TOOL: Tool = Tool::Valgrind;
    } else if #[cfg(feature = "asan")] {
        pub use backend::asan::Asan;
        /// The backend linked into this build.
        pub type ActiveBackend = Asan;
        pub const ACTIVE: ActiveBackend = Asan;
        pub const ACTIVE_TOOL: Tool = Tool::Asan;
    } else {
        /// The backend linked into this build.
        pub type ActiveBackend = backend::none::NoTrack;
        pub const ACTIVE: ActiveBackend = backend::none::NoTrack;
        pub const ACTIVE_TOOL: Tool = Tool::None;
    }
}

pub use backend::none::NoTrack;

/// Name of the active tool: `"valgrind"`, `"asan"` or `"none"`.
pub const TRACK_TOOL: &str = ACTIVE_TOOL.name();

/// Whether any tool receives events. For diagnostics only.
pub const TRACK_ENABLED: bool = <ActiveBackend as Backend>::ENABLED;

/// A region of `size` bytes at `ptr` was just allocated. Pass `zero` when its bytes are known
/// to be zeroed.
#[inline(always)]
pub fn track_malloc(ptr: *mut u8, size: usize, zero: bool) {
    ACTIVE.malloc(ptr, size, zero);
}

/// The region at `ptr` grew or shrank in place.
#[inline(always)]
pub fn track_resize(ptr: *mut u8, old_size: usize, new_size: usize) {
    ACTIVE.resize(ptr, old_size, new_size);
}

/// The region of `size` bytes at `ptr` was freed. `size` must match what was reported at
/// allocation (or the last resize).
#[inline(always)]
pub fn track_free_size(ptr: *mut u8, size: usize) {
    ACTIVE.free_size(ptr, size);
}

/// The region at `ptr` was freed; its size comes from the allocator's usable size query.
///
/// With the no-op backend `sizes` is never called.
#[inline(always)]
pub fn track_free<S>(ptr: *mut u8, sizes: &S)
where
    S: UsableSize + ?Sized,
{
    derived::free(&ACTIVE, ptr, sizes);
}

/// The `size` bytes at `ptr` now hold initialized values.
#[inline(always)]
pub fn track_mem_defined(ptr: *mut u8, size: usize) {
    ACTIVE.mem_defined(ptr, size);
}

/// The `size` bytes at `ptr` are allocated but hold garbage.
#[inline(always)]
pub fn track_mem_undefined(ptr: *mut u8, size: usize) {
    ACTIVE.mem_undefined(ptr, size);
}

/// Marks bytes inside a live region inaccessible, e.g. padding or guard bytes.
#[inline(always)]
pub fn track_mem_noaccess(ptr: *mut u8, size: usize) {
    ACTIVE.mem_noaccess(ptr, size);
}

/// Reclassifies `size` bytes at `ptr` as `state`.
///
/// ```rust
/// use memtrack::{track_free_size, track_malloc, track_mem, AccessState};
///
/// let mut block = [0u8; 32];
/// let ptr = block.as_mut_ptr();
///
/// track_malloc(ptr, 32, false);
/// track_mem(ptr, 32, AccessState::Defined);
/// track_free_size(ptr, 32);
/// ```
#[inline(always)]
pub fn track_mem(ptr: *mut u8, size: usize, state: AccessState) {
    ACTIVE.mark(ptr, size, state);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_active_backend_is_send_sync() {
        is_send_sync::<ActiveBackend>();
    }

    #[test]
    fn test_track_tool_matches_active() {
        assert_eq!(TRACK_TOOL, ACTIVE_TOOL.name());
        assert_eq!(TRACK_ENABLED, ACTIVE_TOOL.is_enabled());
    }

    // Real memory: with a checker attached these calls must describe a legal lifecycle.
    #[test]
    fn test_facade_lifecycle_on_real_memory() {
        let mut block = vec![0u8; 128];
        let ptr = block.as_mut_ptr();

        track_malloc(ptr, 64, false);
        track_mem_defined(ptr, 64);
        track_mem(ptr, 64, AccessState::Undefined);
        track_resize(ptr, 64, 128);
        track_free(ptr, &|_ptr: *const u8| 128usize);
        track_malloc(ptr, 128, true);
        track_free_size(ptr, 128);
    }

    #[cfg(not(any(feature = "valgrind", feature = "asan")))]
    #[test]
    fn test_no_op_never_queries_usable_size() {
        let sizes = |_ptr: *const u8| -> usize { panic!("usable size queried") };

        track_free(std::ptr::null_mut(), &sizes);
        track_malloc(std::ptr::null_mut(), usize::MAX, false);
        track_resize(std::ptr::null_mut(), 1, usize::MAX);
        track_free_size(std::ptr::null_mut(), usize::MAX);
        track_mem_noaccess(std::ptr::null_mut(), usize::MAX);
    }
}
