//! texfetch Memory Gate
//!
//! Coarse "is it safe to request more assets" signal built on a memory
//! probe. Callers consult it before issuing fetches; the loader itself never
//! does.

mod gate;
mod probe;

pub use gate::{DEFAULT_MARGIN, MemoryGate, PressureLevel};
pub use probe::{MemoryProbe, StaticProbe, SysinfoProbe};
