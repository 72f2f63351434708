use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Opaque session-scoped reference to registered image bytes. The display
/// layer holds the string; only the issuing [`HandleStore`] can resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle(String);

impl ImageHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner of every ephemeral handle in one session. Passed explicitly to the
/// components that create or release handles; never a global.
#[derive(Debug, Default)]
pub struct HandleStore {
    entries: HashMap<ImageHandle, Arc<[u8]>>,
    next_id: u64,
}

impl HandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the bytes under a fresh handle. The caller must eventually
    /// release it.
    pub fn acquire(&mut self, bytes: Arc<[u8]>) -> ImageHandle {
        let handle = ImageHandle(format!("mem:{:08x}", self.next_id));
        self.next_id += 1;
        self.entries.insert(handle.clone(), bytes);
        handle
    }

    /// Idempotent: releasing twice, or releasing a handle this store never
    /// issued, is a no-op.
    pub fn release(&mut self, handle: &ImageHandle) {
        self.entries.remove(handle);
    }

    /// Read-only consumption by the display layer.
    pub fn resolve(&self, handle: &ImageHandle) -> Option<&Arc<[u8]>> {
        self.entries.get(handle)
    }

    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    /// Drops every live handle, bounding leaks at view teardown.
    pub fn release_all(&mut self) {
        self.entries.clear();
    }
}
