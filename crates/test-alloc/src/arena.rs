use memtrack::{derived, ActiveBackend, Backend, UsableSize, PADDING_SIZE, SIZE_PRECISE};
use std::collections::HashMap;
use std::ptr::NonNull;

/// Blocks are multiples of this many bytes.
pub const GRANULE: usize = 16;

#[derive(Clone, Copy, Debug)]
struct Block {
    /// Bytes the block spans in the arena, padding included.
    span: usize,
    /// Bytes reported to the backend.
    size: usize,
}

impl Block {
    fn capacity(&self) -> usize {
        self.span - PADDING_SIZE
    }
}

/// A fixed-capacity bump arena with exact-span free lists, reporting every block through a
/// [`Backend`].
///
/// Reported sizes follow the build's precision mode: the requested size with the `padding`
/// feature, the full block capacity without it.
#[derive(Debug)]
pub struct Arena<B: Backend = ActiveBackend> {
    backend: B,
    buf: Vec<u8>,
    used: usize,
    free: HashMap<usize, Vec<usize>>,
    live: HashMap<usize, Block>,
}

impl Arena<ActiveBackend> {
    pub fn new(capacity: usize) -> Self {
        Self::with_backend(capacity, memtrack::ACTIVE)
    }
}

impl<B: Backend> Arena<B> {
    pub fn with_backend(capacity: usize, backend: B) -> Self {
        Self {
            backend,
            buf: vec![0; capacity],
            used: 0,
            free: HashMap::new(),
            live: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Address of the first byte of the arena.
    pub fn base(&self) -> usize {
        self.buf.as_ptr() as usize
    }

    /// Bytes taken from the bump frontier so far.
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn live_blocks(&self) -> usize {
        self.live.len()
    }

    pub fn alloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        self.allocate(size, false)
    }

    pub fn alloc_zeroed(&mut self, size: usize) -> Option<NonNull<u8>> {
        self.allocate(size, true)
    }

    /// Returns `false` when `ptr` is not a live block of this arena.
    pub fn free(&mut self, ptr: NonNull<u8>) -> bool {
        let Some(offset) = self.offset_of(ptr.as_ptr()) else {
            return false;
        };
        let Some(block) = self.live.get(&offset).copied() else {
            return false;
        };

        derived::free(&self.backend, ptr.as_ptr(), &*self);

        self.live.remove(&offset);
        if offset + block.span == self.used {
            self.used = offset;
        } else {
            self.free.entry(block.span).or_default().push(offset);
        }
        true
    }

    /// Changes the size of a live block without moving it.
    ///
    /// Succeeds when the new size fits the block, or when the block sits at the bump frontier
    /// and the arena has room. Returns `false` otherwise, leaving the block untouched.
    pub fn resize_in_place(&mut self, ptr: NonNull<u8>, new_size: usize) -> bool {
        let Some(offset) = self.offset_of(ptr.as_ptr()) else {
            return false;
        };
        let Some(mut block) = self.live.get(&offset).copied() else {
            return false;
        };

        let at_frontier = offset + block.span == self.used;
        let Some(wanted) = span_for(new_size) else {
            return false;
        };
        if at_frontier {
            if wanted > self.buf.len() - offset {
                return false;
            }
            self.used = offset + wanted;
            block.span = wanted;
        } else if wanted > block.span {
            return false;
        }

        let new_tracked = tracked_size(new_size, block.capacity());
        if new_tracked != block.size {
            self.backend.resize(ptr.as_ptr(), block.size, new_tracked);
        }
        block.size = new_tracked;
        self.live.insert(offset, block);
        true
    }

    fn allocate(&mut self, size: usize, zero: bool) -> Option<NonNull<u8>> {
        let span = span_for(size)?;
        let offset = match self.free.get_mut(&span).and_then(Vec::pop) {
            Some(offset) => offset,
            None => {
                if span > self.buf.len() - self.used {
                    return None;
                }
                let offset = self.used;
                self.used += span;
                offset
            }
        };

        let block = Block {
            span,
            size: tracked_size(size, span - PADDING_SIZE),
        };
        let ptr = NonNull::new(self.buf.as_mut_ptr().wrapping_add(offset))?;

        self.backend.malloc(ptr.as_ptr(), block.size, zero);
        if zero {
            // SAFETY: `offset + block.size` is within `buf`, and the backend was told about
            // the region before the write.
            unsafe { ptr.as_ptr().write_bytes(0, block.size) };
        }

        self.live.insert(offset, block);
        Some(ptr)
    }

    fn offset_of(&self, ptr: *const u8) -> Option<usize> {
        let offset = (ptr as usize).checked_sub(self.base())?;
        (offset < self.buf.len()).then_some(offset)
    }
}

impl<B: Backend> UsableSize for Arena<B> {
    fn usable_size(&self, ptr: *const u8) -> usize {
        self.offset_of(ptr)
            .and_then(|offset| self.live.get(&offset))
            .map_or(0, |block| block.size)
    }
}

impl<B: Backend> Drop for Arena<B> {
    fn drop(&mut self) {
        let base = self.buf.as_mut_ptr();
        for (offset, block) in self.live.drain() {
            self.backend.free_size(base.wrapping_add(offset), block.size);
        }
    }
}

/// `None` when the padded size does not fit in `usize`.
fn span_for(size: usize) -> Option<usize> {
    let padded = size.checked_add(PADDING_SIZE)?.max(1);
    padded.div_ceil(GRANULE).checked_mul(GRANULE)
}

fn tracked_size(requested: usize, capacity: usize) -> usize {
    if SIZE_PRECISE {
        requested
    } else {
        capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_rounds_to_granule() {
        assert_eq!(span_for(0), Some(GRANULE));
        assert_eq!(span_for(GRANULE - PADDING_SIZE), Some(GRANULE));
        assert_eq!(span_for(GRANULE - PADDING_SIZE + 1), Some(2 * GRANULE));
        assert_eq!(span_for(usize::MAX), None);
    }

    #[test]
    fn test_oversized_requests_fail_cleanly() {
        let mut arena = Arena::with_backend(256, memtrack::NoTrack);
        let a = arena.alloc(32).unwrap();

        assert!(arena.alloc(usize::MAX).is_none());
        assert!(arena.alloc_zeroed(usize::MAX - PADDING_SIZE).is_none());
        assert!(!arena.resize_in_place(a, usize::MAX));
        assert_eq!(arena.live_blocks(), 1);
        assert!(arena.free(a));
    }

    #[test]
    fn test_free_list_reuses_span() {
        let mut arena = Arena::with_backend(1024, memtrack::NoTrack);
        let a = arena.alloc(40).unwrap();
        let _b = arena.alloc(40).unwrap();

        assert!(arena.free(a));
        let c = arena.alloc(40).unwrap();

        assert_eq!(a, c);
        assert_eq!(arena.live_blocks(), 2);
    }

    #[test]
    fn test_frontier_free_rewinds() {
        let mut arena = Arena::with_backend(1024, memtrack::NoTrack);
        let a = arena.alloc(100).unwrap();

        assert!(arena.free(a));

        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_out_of_memory() {
        let mut arena = Arena::with_backend(64, memtrack::NoTrack);

        assert!(arena.alloc(64 - PADDING_SIZE).is_some());
        assert!(arena.alloc(1).is_none());
    }

    #[test]
    fn test_foreign_pointer_is_rejected() {
        let mut arena = Arena::with_backend(64, memtrack::NoTrack);
        let mut other = [0u8; 4];

        assert!(!arena.free(NonNull::from(&mut other[0])));
        assert!(!arena.resize_in_place(NonNull::from(&mut other[0]), 8));
    }

    #[test]
    fn test_alloc_zeroed_clears_reused_memory() {
        let mut arena = Arena::with_backend(256, memtrack::NoTrack);
        let a = arena.alloc(32).unwrap();
        let _guard = arena.alloc(32).unwrap();
        // SAFETY: 32 bytes were just allocated at `a`.
        unsafe { a.as_ptr().write_bytes(0xAB, 32) };
        arena.free(a);

        let b = arena.alloc_zeroed(32).unwrap();

        assert_eq!(a, b);
        // SAFETY: `b` is a live 32 byte block.
        let bytes = unsafe { std::slice::from_raw_parts(b.as_ptr(), 32) };
        assert!(bytes.iter().all(|&byte| byte == 0));
    }
}
