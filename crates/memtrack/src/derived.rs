//! Operations built from the [`Backend`] primitives.
//!
//! Not every backend has a native notion of "free without a size" or "resize in place".
//! The functions here compose the primitives in a fixed order so every backend gets the
//! same byte accounting.

use crate::backend::Backend;

/// The allocator's answer to "how many bytes does the allocation at `ptr` occupy".
///
/// The facade never guesses a size. The answer may be larger than the size originally
/// requested, unless the allocator runs in precise mode (see [`crate::SIZE_PRECISE`]).
///
/// Closures work directly:
///
/// ```rust
/// let sizes = |_ptr: *const u8| 64usize;
/// memtrack::track_free(std::ptr::null_mut(), &sizes);
/// ```
pub trait UsableSize {
    fn usable_size(&self, ptr: *const u8) -> usize;
}

impl<F> UsableSize for F
where
    F: Fn(*const u8) -> usize,
{
    #[inline]
    fn usable_size(&self, ptr: *const u8) -> usize {
        self(ptr)
    }
}

/// Reports the region at `ptr` as freed, sized by the allocator's own bookkeeping.
///
/// When the backend is disabled the size query is skipped entirely.
#[inline]
pub fn free<B, S>(backend: &B, ptr: *mut u8, sizes: &S)
where
    B: Backend + ?Sized,
    S: UsableSize + ?Sized,
{
    if !B::ENABLED {
        return;
    }
    let size = sizes.usable_size(ptr.cast_const());
    backend.free_size(ptr, size);
}

/// Reports an in-place resize as a free of `old_size` bytes immediately followed by a fresh
/// undefined allocation of `new_size` bytes at the same address.
///
/// Backends see an instantaneous unallocated window and must tolerate the address being
/// reused right away. Bytes that were defined before the resize come back undefined.
#[inline]
pub fn resize_by_reallocation<B>(backend: &B, ptr: *mut u8, old_size: usize, new_size: usize)
where
    B: Backend + ?Sized,
{
    backend.free_size(ptr, old_size);
    backend.malloc(ptr, new_size, false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::none::NoTrack;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Malloc(usize, usize, bool),
        FreeSize(usize, usize),
        Defined(usize, usize),
        Undefined(usize, usize),
        NoAccess(usize, usize),
    }

    #[derive(Default)]
    struct Log {
        calls: RefCell<Vec<Call>>,
    }

    impl Log {
        fn take(&self) -> Vec<Call> {
            self.calls.take()
        }
    }

    impl Backend for Log {
        fn malloc(&self, ptr: *mut u8, size: usize, zero: bool) {
            self.calls
                .borrow_mut()
                .push(Call::Malloc(ptr as usize, size, zero));
        }

        fn free_size(&self, ptr: *mut u8, size: usize) {
            self.calls
                .borrow_mut()
                .push(Call::FreeSize(ptr as usize, size));
        }

        fn mem_defined(&self, ptr: *mut u8, size: usize) {
            self.calls.borrow_mut().push(Call::Defined(ptr as usize, size));
        }

        fn mem_undefined(&self, ptr: *mut u8, size: usize) {
            self.calls
                .borrow_mut()
                .push(Call::Undefined(ptr as usize, size));
        }

        fn mem_noaccess(&self, ptr: *mut u8, size: usize) {
            self.calls
                .borrow_mut()
                .push(Call::NoAccess(ptr as usize, size));
        }
    }

    const X: usize = 0x1000;

    fn x() -> *mut u8 {
        X as *mut u8
    }

    #[test]
    fn test_free_reports_usable_size() {
        let log = Log::default();
        let sizes = |ptr: *const u8| {
            assert_eq!(ptr as usize, X);
            96usize
        };

        free(&log, x(), &sizes);

        assert_eq!(log.take(), vec![Call::FreeSize(X, 96)]);
    }

    #[test]
    fn test_free_skips_size_query_when_disabled() {
        let queried = Cell::new(false);
        let sizes = |_ptr: *const u8| {
            queried.set(true);
            0usize
        };

        free(&NoTrack, x(), &sizes);

        assert!(!queried.get());
    }

    #[test]
    fn test_resize_frees_then_allocates() {
        let log = Log::default();

        for (old, new) in [(64, 128), (128, 64), (1, 4096), (4096, 0)] {
            resize_by_reallocation(&log, x(), old, new);
            assert_eq!(
                log.take(),
                vec![Call::FreeSize(X, old), Call::Malloc(X, new, false)],
                "resize {old} -> {new}"
            );
        }
    }

    #[test]
    fn test_default_resize_uses_reallocation() {
        let log = Log::default();

        log.resize(x(), 64, 128);

        assert_eq!(
            log.take(),
            vec![Call::FreeSize(X, 64), Call::Malloc(X, 128, false)]
        );
    }

    #[test]
    fn test_mark_dispatches_by_state() {
        use crate::AccessState;

        let log = Log::default();
        log.mark(x(), 8, AccessState::Defined);
        log.mark(x(), 16, AccessState::Undefined);
        log.mark(x(), 32, AccessState::NoAccess);

        assert_eq!(
            log.take(),
            vec![
                Call::Defined(X, 8),
                Call::Undefined(X, 16),
                Call::NoAccess(X, 32)
            ]
        );
    }

    #[test]
    fn test_dyn_free_size_query() {
        let log = Log::default();
        let sizes: &dyn UsableSize = &|_ptr: *const u8| 128usize;

        free(&log, x(), sizes);

        assert_eq!(log.take(), vec![Call::FreeSize(X, 128)]);
    }
}
