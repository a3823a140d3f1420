//! Maps C handles to open connections.
//!
//! Each entry carries its own mutex. The map lock is held only to look up,
//! insert or remove entries, never across pipe I/O. Connections stay
//! registered until `pipe_close`, `pipe_close_all` or process exit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use pipebridge_line::LineChannel;

use crate::types::PipeHandle;

pub(crate) type Entry = Arc<Mutex<LineChannel>>;

pub(crate) struct Registry {
    next_handle: AtomicIsize,
    entries: Mutex<HashMap<PipeHandle, Entry>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            next_handle: AtomicIsize::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<PipeHandle, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an open connection and return its new handle (always > 0).
    pub(crate) fn insert(&self, channel: LineChannel) -> PipeHandle {
        let mut table = self.table();
        let handle = loop {
            let candidate = self.next_handle.fetch_add(1, Ordering::Relaxed);
            if candidate > 0 && !table.contains_key(&candidate) {
                break candidate;
            }
            if candidate <= 0 {
                self.next_handle.store(1, Ordering::Relaxed);
            }
        };
        table.insert(handle, Arc::new(Mutex::new(channel)));
        handle
    }

    /// Run `f` against the connection behind `handle`, or return `None` if the
    /// handle is unknown.
    pub(crate) fn with_channel<T>(
        &self,
        handle: PipeHandle,
        f: impl FnOnce(&mut LineChannel) -> T,
    ) -> Option<T> {
        let entry = self.table().get(&handle).cloned()?;
        let mut channel = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut channel))
    }

    /// Remove `handle`, returning its connection.
    pub(crate) fn remove(&self, handle: PipeHandle) -> Option<Entry> {
        self.table().remove(&handle)
    }

    /// Remove every entry, returning the connections with their handles.
    pub(crate) fn drain(&self) -> Vec<(PipeHandle, Entry)> {
        std::mem::take(&mut *self.table()).into_iter().collect()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, handle: PipeHandle) -> bool {
        self.table().contains_key(&handle)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table().len()
    }
}

/// Close one drained entry. Waits for any call still using it.
pub(crate) fn close_entry(entry: &Entry) {
    entry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .close();
}

fn global() -> &'static Registry {
    static GLOBAL: OnceLock<Registry> = OnceLock::new();
    GLOBAL.get_or_init(Registry::new)
}

pub(crate) fn insert(channel: LineChannel) -> PipeHandle {
    global().insert(channel)
}

pub(crate) fn with_channel<T>(
    handle: PipeHandle,
    f: impl FnOnce(&mut LineChannel) -> T,
) -> Option<T> {
    global().with_channel(handle, f)
}

pub(crate) fn remove(handle: PipeHandle) -> Option<Entry> {
    global().remove(handle)
}

pub(crate) fn drain() -> Vec<(PipeHandle, Entry)> {
    global().drain()
}

#[cfg(test)]
pub(crate) fn contains(handle: PipeHandle) -> bool {
    global().contains(handle)
}
