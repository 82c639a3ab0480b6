use serde::Serialize;
use std::fmt;

/// Bytes of padding the allocator appends to every block when the `padding` feature is on.
///
/// Matches a trailer of two `u32` words (a canary and the delta to the requested size).
/// Zero without the feature.
pub const PADDING_SIZE: usize = if cfg!(feature = "padding") {
    2 * std::mem::size_of::<u32>()
} else {
    0
};

/// Guard bytes passed to backends that understand red zones (Valgrind).
pub const RED_ZONE: usize = PADDING_SIZE;

/// Whether sizes given to the facade are exactly what the user requested, rather than the
/// allocator's internal block size.
pub const SIZE_PRECISE: bool = cfg!(feature = "padding");

/// The memory checker a build reports to.
///
/// # Examples
///
/// ```rust
/// use memtrack::Tool;
///
/// assert_eq!(Tool::Valgrind.name(), "valgrind");
/// assert!(!Tool::None.is_enabled());
/// println!("tracking with {}", memtrack::ACTIVE_TOOL);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Valgrind,
    Asan,
    None,
}

impl Tool {
    pub const fn name(self) -> &'static str {
        match self {
            Tool::Valgrind => "valgrind",
            Tool::Asan => "asan",
            Tool::None => "none",
        }
    }

    pub const fn is_enabled(self) -> bool {
        !matches!(self, Tool::None)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of the build-time tracking configuration, for start-up logs and diagnostics.
///
/// Allocators must not branch on it; every tracking call is valid with every backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub tool: Tool,
    pub enabled: bool,
    pub red_zone: usize,
    pub size_precise: bool,
}

/// Returns the configuration this crate was built with.
pub const fn selection() -> Selection {
    Selection {
        tool: crate::ACTIVE_TOOL,
        enabled: crate::TRACK_ENABLED,
        red_zone: RED_ZONE,
        size_precise: SIZE_PRECISE,
    }
}

/// Emits a single `info` event describing the active backend.
///
/// Call it once, outside of any allocation path: the subscriber may allocate.
pub fn log_selection() {
    let selection = selection();
    tracing::info!(
        tool = %selection.tool,
        enabled = selection.enabled,
        red_zone = selection.red_zone,
        size_precise = selection.size_precise,
        "memory tracking backend selected"
    );
}
