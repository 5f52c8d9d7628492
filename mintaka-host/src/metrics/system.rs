//! CPU, memory, temperature and byte counters.

use std::path::Path;

use sysinfo::{Components, Networks, System};

use super::command::QueryError;

const SECTOR_SIZE: u64 = 512;
const GIB: f32 = 1024.0 * 1024.0 * 1024.0;

/// CPU load and memory use at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuMemory {
    pub cpu_percent: f32,
    pub used_bytes: u64,
    pub total_bytes: u64,
}

impl CpuMemory {
    pub fn ram_percent(&self) -> f32 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f32 / self.total_bytes as f32 * 100.0
    }

    pub fn used_gib(&self) -> f32 {
        self.used_bytes as f32 / GIB
    }

    pub fn total_gib(&self) -> f32 {
        self.total_bytes as f32 / GIB
    }
}

/// Monotonic byte counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteCounters {
    /// Sent (network) or written (disk).
    pub out_bytes: u64,
    /// Received (network) or read (disk).
    pub in_bytes: u64,
}

/// Long-lived sysinfo handles; CPU usage is measured between refreshes.
pub struct SystemMetrics {
    sys: System,
    components: Components,
}

impl SystemMetrics {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();
        Self {
            sys,
            components: Components::new_with_refreshed_list(),
        }
    }

    pub fn cpu_memory(&mut self) -> CpuMemory {
        self.sys.refresh_cpu();
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        CpuMemory {
            cpu_percent: self.sys.global_cpu_info().cpu_usage(),
            used_bytes: total.saturating_sub(self.sys.available_memory()),
            total_bytes: total,
        }
    }

    /// Reading of the first temperature sensor, if any.
    pub fn cpu_temperature(&mut self) -> Option<f32> {
        self.components.refresh();
        self.components
            .iter()
            .map(|c| c.temperature())
            .find(|t| t.is_finite())
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// ── Network counters ─────────────────────────────────────────────

pub struct NetworkMetrics {
    networks: Networks,
}

impl NetworkMetrics {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }

    /// Totals across every interface.
    pub fn counters(&mut self) -> ByteCounters {
        self.networks.refresh();
        self.networks
            .iter()
            .fold(ByteCounters::default(), |acc, (_, data)| ByteCounters {
                out_bytes: acc.out_bytes + data.total_transmitted(),
                in_bytes: acc.in_bytes + data.total_received(),
            })
    }
}

impl Default for NetworkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// ── Disk counters ────────────────────────────────────────────────

/// Totals across whole disks from `/proc/diskstats`.
pub fn disk_counters() -> Result<ByteCounters, QueryError> {
    let text = std::fs::read_to_string("/proc/diskstats")?;
    let sys_block = Path::new("/sys/block");
    Ok(parse_diskstats(&text, |name| sys_block.join(name).exists()))
}

/// Sum sectors read/written for devices accepted by `is_disk`, so
/// partitions are not counted twice.
pub fn parse_diskstats(text: &str, is_disk: impl Fn(&str) -> bool) -> ByteCounters {
    let mut totals = ByteCounters::default();
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        // major minor name reads merged sectors_read ms writes merged sectors_written ...
        if fields.len() < 10 || !is_disk(fields[2]) {
            continue;
        }
        let (Ok(read), Ok(written)) = (fields[5].parse::<u64>(), fields[9].parse::<u64>()) else {
            continue;
        };
        totals.in_bytes += read * SECTOR_SIZE;
        totals.out_bytes += written * SECTOR_SIZE;
    }
    totals
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const DISKSTATS: &str = "\
 259       0 nvme0n1 1000 0 2000 100 500 0 4000 50 0 0 0 0 0 0 0 0 0
 259       1 nvme0n1p1 10 0 20 1 5 0 40 1 0 0 0 0 0 0 0 0 0
   8       0 sda 7 0 8 1 3 0 6 1 0 0 0
   7       0 loop0 garbage
";

    #[test]
    fn diskstats_sums_whole_disks_only() {
        let totals = parse_diskstats(DISKSTATS, |name| matches!(name, "nvme0n1" | "sda"));
        assert_eq!(totals.in_bytes, (2000 + 8) * 512);
        assert_eq!(totals.out_bytes, (4000 + 6) * 512);
    }

    #[test]
    fn diskstats_skips_malformed_lines() {
        let totals = parse_diskstats(DISKSTATS, |_| true);
        // loop0 has too few fields; the partition is counted when allowed.
        assert_eq!(totals.in_bytes, (2000 + 20 + 8) * 512);
    }

    #[test]
    fn ram_percent_and_gib() {
        let m = CpuMemory {
            cpu_percent: 12.5,
            used_bytes: 4 * 1024 * 1024 * 1024,
            total_bytes: 16 * 1024 * 1024 * 1024,
        };
        assert_eq!(m.ram_percent(), 25.0);
        assert_eq!(m.used_gib(), 4.0);
        assert_eq!(m.total_gib(), 16.0);

        let empty = CpuMemory {
            cpu_percent: 0.0,
            used_bytes: 0,
            total_bytes: 0,
        };
        assert_eq!(empty.ram_percent(), 0.0);
    }

    #[test]
    fn live_metrics_are_sane() {
        let mut metrics = SystemMetrics::new();
        let cm = metrics.cpu_memory();
        assert!(cm.total_bytes > 0);
        assert!((0.0..=100.0).contains(&cm.ram_percent()));
        let _ = NetworkMetrics::new().counters();
    }
}
