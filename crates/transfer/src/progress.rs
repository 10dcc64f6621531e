use std::time::Duration;

/// Byte count and wall time of one file transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferStats {
    pub bytes: u64,
    pub elapsed: Duration,
}

impl TransferStats {
    pub fn new(bytes: u64, elapsed: Duration) -> Self {
        Self { bytes, elapsed }
    }

    /// Average throughput in bytes/second.
    ///
    /// Returns 0.0 when no time has elapsed.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.is_zero() {
            return 0.0;
        }
        self.bytes as f64 / self.elapsed.as_secs_f64()
    }

    /// Throughput formatted for humans, e.g. `1.50 MB/s`.
    pub fn rate(&self) -> String {
        format_rate(self.bytes_per_second() as u64)
    }

    /// Adds another transfer to this total.
    pub fn accumulate(&mut self, other: TransferStats) {
        self.bytes += other.bytes;
        self.elapsed += other.elapsed;
    }
}

/// Formats a throughput in binary units.
pub fn format_rate(bytes_per_sec: u64) -> String {
    const KIB: f64 = 1024.0;
    let value = bytes_per_sec as f64;
    if value < KIB {
        format!("{bytes_per_sec} B/s")
    } else if value < KIB * KIB {
        format!("{:.2} KB/s", value / KIB)
    } else if value < KIB * KIB * KIB {
        format!("{:.2} MB/s", value / (KIB * KIB))
    } else {
        format!("{:.2} GB/s", value / (KIB * KIB * KIB))
    }
}
