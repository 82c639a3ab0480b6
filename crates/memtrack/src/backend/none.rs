use super::Backend;

/// Backend used when no memory checker is configured. Every call compiles to nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTrack;

impl Backend for NoTrack {
    const ENABLED: bool = false;

    #[inline(always)]
    fn malloc(&self, _ptr: *mut u8, _size: usize, _zero: bool) {}

    #[inline(always)]
    fn resize(&self, _ptr: *mut u8, _old_size: usize, _new_size: usize) {}

    #[inline(always)]
    fn free_size(&self, _ptr: *mut u8, _size: usize) {}

    #[inline(always)]
    fn mem_defined(&self, _ptr: *mut u8, _size: usize) {}

    #[inline(always)]
    fn mem_undefined(&self, _ptr: *mut u8, _size: usize) {}

    #[inline(always)]
    fn mem_noaccess(&self, _ptr: *mut u8, _size: usize) {}
}
