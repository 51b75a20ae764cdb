/// Default number of expired entries a single write may sweep out.
pub const DEFAULT_SWEEP_LIMIT: usize = 8;

/// Construction-time settings for a map.
///
/// # Example
///
/// ```rust
/// use lapse::MapConfig;
///
/// let config = MapConfig::new(1024)
///     .with_sweep_limit(32);
/// ```
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Maximum number of live entries; the map evicts its oldest-written
    /// entry to stay at or below this. Must be at least 1.
    pub capacity: usize,
    /// Upper bound on how many expired entries one write reclaims before
    /// it applies (default: 8).
    pub sweep_limit: usize,
}

impl MapConfig {
    /// Creates a configuration for a map holding up to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sweep_limit: DEFAULT_SWEEP_LIMIT,
        }
    }

    /// Sets how many expired entries each write may sweep out.
    ///
    /// Larger values reclaim stale entries sooner at the cost of more work
    /// per write. A limit of 0 disables the pre-write sweep; expired
    /// entries then leave only through lazy removal on read, explicit
    /// maintenance calls, or capacity eviction.
    pub fn with_sweep_limit(mut self, sweep_limit: usize) -> Self {
        self.sweep_limit = sweep_limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_sweep_limit() {
        let config = MapConfig::new(100);
        assert_eq!(config.capacity, 100);
        assert_eq!(config.sweep_limit, DEFAULT_SWEEP_LIMIT);
    }

    #[test]
    fn test_with_sweep_limit() {
        let config = MapConfig::new(100).with_sweep_limit(2);
        assert_eq!(config.sweep_limit, 2);
    }
}
