//! Memory probe collaborators

use std::sync::Mutex;

use sysinfo::System;

/// Source of memory figures, in bytes
pub trait MemoryProbe: Send + Sync {
    fn total_memory_bytes(&self) -> u64;

    fn used_memory_bytes(&self) -> u64;

    /// Fresh OS "available memory" reading, on platforms that expose one.
    fn refresh_available_bytes(&self) -> Option<u64> {
        None
    }
}

impl<P: MemoryProbe + ?Sized> MemoryProbe for &P {
    fn total_memory_bytes(&self) -> u64 {
        (**self).total_memory_bytes()
    }

    fn used_memory_bytes(&self) -> u64 {
        (**self).used_memory_bytes()
    }

    fn refresh_available_bytes(&self) -> Option<u64> {
        (**self).refresh_available_bytes()
    }
}

/// A memory probe that uses the `sysinfo` crate.
///
/// Every call refreshes the memory counters; nothing is cached between
/// calls.
pub struct SysinfoProbe {
    system: Mutex<System>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
        }
    }

    fn read(&self, f: impl FnOnce(&System) -> u64) -> u64 {
        match self.system.lock() {
            Ok(mut system) => {
                system.refresh_memory();
                f(&*system)
            }
            Err(_) => {
                tracing::warn!("memory probe lock poisoned");
                0
            }
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SysinfoProbe {
    fn total_memory_bytes(&self) -> u64 {
        self.read(System::total_memory)
    }

    fn used_memory_bytes(&self) -> u64 {
        self.read(System::used_memory)
    }

    fn refresh_available_bytes(&self) -> Option<u64> {
        Some(self.read(System::available_memory))
    }
}

/// Fixed figures, for hosts that measure memory themselves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticProbe {
    pub total: u64,
    pub used: u64,
    pub available: Option<u64>,
}

impl StaticProbe {
    pub fn new(total: u64, used: u64) -> Self {
        Self {
            total,
            used,
            available: None,
        }
    }

    pub fn with_available(mut self, available: u64) -> Self {
        self.available = Some(available);
        self
    }
}

impl MemoryProbe for StaticProbe {
    fn total_memory_bytes(&self) -> u64 {
        self.total
    }

    fn used_memory_bytes(&self) -> u64 {
        self.used
    }

    fn refresh_available_bytes(&self) -> Option<u64> {
        self.available
    }
}
