//! Memory Gate
//!
//! Available memory is `total - used`, narrowed to the OS reading where the
//! probe has one. The gate stays open while `used` is below
//! `available * (1 - margin)`. Every query reads fresh figures from the
//! probe; no figure is cached across calls on any platform.

use crate::MemoryProbe;

/// Fraction of memory held back by default
pub const DEFAULT_MARGIN: f64 = 0.3;

/// Memory pressure level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PressureLevel {
    Normal,
    Moderate,
    Critical,
}

/// Usage fraction above which pressure is critical regardless of margin
const CRITICAL_USAGE: f64 = 0.9;

/// Safe-to-allocate signal over a [`MemoryProbe`]
#[derive(Debug)]
pub struct MemoryGate<P> {
    probe: P,
    margin: f64,
}

/// One reading of the probe
#[derive(Debug, Clone, Copy)]
struct Sample {
    total: u64,
    used: u64,
    os_available: Option<u64>,
}

impl<P: MemoryProbe> MemoryGate<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            margin: DEFAULT_MARGIN,
        }
    }

    /// Fraction of memory to keep in reserve, clamped to `[0, 1]`.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = if margin.is_nan() { DEFAULT_MARGIN } else { margin.clamp(0.0, 1.0) };
        self
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    fn sample(&self) -> Sample {
        Sample {
            total: self.probe.total_memory_bytes(),
            used: self.probe.used_memory_bytes(),
            os_available: self.probe.refresh_available_bytes(),
        }
    }

    fn headroom(&self, sample: Sample) -> f64 {
        let mut available = sample.total.saturating_sub(sample.used);
        if let Some(os_available) = sample.os_available {
            available = available.min(os_available);
        }
        let headroom = available as f64 * (1.0 - self.margin) - sample.used as f64;
        headroom.max(0.0)
    }

    /// `true` while used memory is below the margin-reduced available figure.
    pub fn safe_to_allocate(&self) -> bool {
        let sample = self.sample();
        let safe = self.headroom(sample) > 0.0;
        if !safe {
            tracing::debug!(
                "memory gate closed: {} bytes used, {} bytes total (margin {})",
                sample.used,
                sample.total,
                self.margin
            );
        }
        safe
    }

    /// Bytes that may still be allocated before the gate closes
    pub fn available_bytes(&self) -> u64 {
        self.headroom(self.sample()) as u64
    }

    pub fn pressure_level(&self) -> PressureLevel {
        let sample = self.sample();
        if sample.total == 0 {
            return PressureLevel::Critical;
        }
        let usage = sample.used as f64 / sample.total as f64;
        if usage > CRITICAL_USAGE {
            PressureLevel::Critical
        } else if self.headroom(sample) <= 0.0 {
            PressureLevel::Moderate
        } else {
            PressureLevel::Normal
        }
    }

    /// How many assets of `bytes_per_asset` fit in the remaining budget
    pub fn max_concurrent(&self, bytes_per_asset: u64) -> usize {
        let available = self.available_bytes();
        if bytes_per_asset == 0 {
            return if available > 0 { usize::MAX } else { 0 };
        }
        usize::try_from(available / bytes_per_asset).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticProbe;

    const GB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn test_gate_boundary() {
        // Margin 0.5 closes the gate once used reaches a third of total
        let gate = MemoryGate::new(StaticProbe::new(9 * GB, 3 * GB - 1)).with_margin(0.5);
        assert!(gate.safe_to_allocate());
        assert_eq!(gate.available_bytes(), 1);

        let gate = MemoryGate::new(StaticProbe::new(9 * GB, 3 * GB)).with_margin(0.5);
        assert!(!gate.safe_to_allocate());
        assert_eq!(gate.available_bytes(), 0);
    }

    #[test]
    fn test_headroom_shrinks_with_usage() {
        let gate = MemoryGate::new(StaticProbe::new(10 * GB, 3 * GB)).with_margin(0.5);
        assert_eq!(gate.available_bytes(), GB / 2);

        let gate = MemoryGate::new(StaticProbe::new(10 * GB, 4 * GB)).with_margin(0.5);
        assert!(!gate.safe_to_allocate());
    }

    #[test]
    fn test_margin_clamped() {
        let gate = MemoryGate::new(StaticProbe::new(100, 0)).with_margin(1.5);
        assert_eq!(gate.margin(), 1.0);
        assert!(!gate.safe_to_allocate());

        let gate = MemoryGate::new(StaticProbe::new(100, 0)).with_margin(-1.0);
        assert_eq!(gate.margin(), 0.0);
        assert_eq!(gate.available_bytes(), 100);

        let gate = MemoryGate::new(StaticProbe::new(100, 0)).with_margin(f64::NAN);
        assert_eq!(gate.margin(), DEFAULT_MARGIN);
    }

    #[test]
    fn test_os_available_caps_headroom() {
        let probe = StaticProbe::new(10 * GB, 100).with_available(1000);
        let gate = MemoryGate::new(probe).with_margin(0.5);
        assert_eq!(gate.available_bytes(), 400);

        let gate = MemoryGate::new(StaticProbe::new(10 * GB, GB).with_available(0));
        assert!(!gate.safe_to_allocate());
    }

    #[test]
    fn test_pressure_levels() {
        assert_eq!(MemoryGate::new(StaticProbe::new(100, 10)).pressure_level(), PressureLevel::Normal);
        assert_eq!(MemoryGate::new(StaticProbe::new(100, 80)).pressure_level(), PressureLevel::Moderate);
        assert_eq!(MemoryGate::new(StaticProbe::new(100, 95)).pressure_level(), PressureLevel::Critical);
        assert_eq!(MemoryGate::new(StaticProbe::new(0, 0)).pressure_level(), PressureLevel::Critical);
    }

    #[test]
    fn test_max_concurrent() {
        let gate = MemoryGate::new(StaticProbe::new(1000, 0)).with_margin(0.0);
        assert_eq!(gate.max_concurrent(300), 3);
        assert_eq!(gate.max_concurrent(0), usize::MAX);

        let full = MemoryGate::new(StaticProbe::new(1000, 1000));
        assert_eq!(full.max_concurrent(1), 0);
        assert_eq!(full.max_concurrent(0), 0);
    }
}
