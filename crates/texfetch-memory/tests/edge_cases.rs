//! Edge case tests for texfetch-memory

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use texfetch_memory::*;

const MB: u64 = 1024 * 1024;

/// Probe whose figures can change between calls
#[derive(Default)]
struct CountingProbe {
    total: AtomicU64,
    used: AtomicU64,
    total_reads: AtomicUsize,
    used_reads: AtomicUsize,
}

impl CountingProbe {
    fn set(&self, total: u64, used: u64) {
        self.total.store(total, Ordering::SeqCst);
        self.used.store(used, Ordering::SeqCst);
    }
}

impl MemoryProbe for CountingProbe {
    fn total_memory_bytes(&self) -> u64 {
        self.total_reads.fetch_add(1, Ordering::SeqCst);
        self.total.load(Ordering::SeqCst)
    }

    fn used_memory_bytes(&self) -> u64 {
        self.used_reads.fetch_add(1, Ordering::SeqCst);
        self.used.load(Ordering::SeqCst)
    }
}

#[test]
fn test_safe_to_allocate_across_load_levels() {
    // Open while used < (total - used) * 0.7, i.e. below ~411.8 MB of 1000
    let margin = 0.3;
    let total = 1000 * MB;

    let cases = [
        (0, 0, false),              // no memory reported at all
        (total, 0, true),           // idle
        (total, 350 * MB, true),    // typical
        (total, 411 * MB, true),    // just under the line
        (total, 412 * MB, false),   // just over the line
        (total, 500 * MB, false),   // half used
        (total, 699 * MB, false),   // well past the line
        (total, total, false),      // saturated
        (total, total + MB, false), // over-reported usage
    ];

    for (total, used, expected) in cases {
        let gate = MemoryGate::new(StaticProbe::new(total, used)).with_margin(margin);
        assert_eq!(
            gate.safe_to_allocate(),
            expected,
            "total={} used={}",
            total,
            used
        );
    }
}

#[test]
fn test_os_reading_narrows_available() {
    // 900 MB free by total - used, but the OS reports only 400 MB
    let probe = StaticProbe::new(1000 * MB, 100 * MB).with_available(400 * MB);
    let gate = MemoryGate::new(probe).with_margin(0.5);
    assert!(gate.safe_to_allocate());
    assert_eq!(gate.available_bytes(), 100 * MB);

    let gate = MemoryGate::new(StaticProbe::new(1000 * MB, 100 * MB)).with_margin(0.5);
    assert_eq!(gate.available_bytes(), 350 * MB);
}

// The total is re-read on every query on every platform; a figure cached for
// the process lifetime would miss the second reading below.
#[test]
fn test_every_query_reads_the_probe() {
    let probe = CountingProbe::default();
    probe.set(1000 * MB, 100 * MB);
    let gate = MemoryGate::new(&probe);

    assert!(gate.safe_to_allocate());
    probe.set(100 * MB, 100 * MB);
    assert!(!gate.safe_to_allocate());

    assert_eq!(probe.total_reads.load(Ordering::SeqCst), 2);
    assert_eq!(probe.used_reads.load(Ordering::SeqCst), 2);
}

#[test]
fn test_available_shrinks_with_usage() {
    let probe = CountingProbe::default();
    let gate = MemoryGate::new(&probe).with_margin(0.5);

    probe.set(1000 * MB, 100 * MB);
    let before = gate.available_bytes();
    probe.set(1000 * MB, 300 * MB);
    let after = gate.available_bytes();

    assert_eq!(before, 350 * MB);
    assert_eq!(after, 50 * MB);
}

#[test]
fn test_throttle_batch_size() {
    let gate = MemoryGate::new(StaticProbe::new(1000 * MB, 200 * MB)).with_margin(0.5);
    // 800 MB free, 400 MB after the margin, 200 MB of headroom; 64 MB textures
    assert_eq!(gate.available_bytes(), 200 * MB);
    assert_eq!(gate.max_concurrent(64 * MB), 3);
    assert_eq!(gate.pressure_level(), PressureLevel::Normal);
}
