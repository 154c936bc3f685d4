//! Peer link monitor
//!
//! Tracks peer traffic and outages. A short outage freezes the shared epoch;
//! once an outage reaches the stale window the epoch can no longer be trusted.

/// Peer silence after which the link is considered lost
pub const BEACON_TIMEOUT_US: u64 = 3_000_000;

/// Outage after which a frozen epoch is discarded
pub const EPOCH_STALE_US: u64 = 120_000_000;

/// Link condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// Peer traffic seen recently, or no session yet
    Connected,
    /// Peer silent past the beacon timeout but not yet declared lost
    Silent,
    /// Outage in progress, frozen epoch still usable
    Lost { outage_us: u64 },
    /// Outage exceeded the stale window
    Expired,
}

#[derive(Debug, Clone)]
pub struct LinkMonitor {
    /// Local time of the last frame from the peer
    last_heard_us: Option<u64>,
    /// Local time of the last frame before the outage
    lost_since_us: Option<u64>,
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkMonitor {
    pub const fn new() -> Self {
        Self {
            last_heard_us: None,
            lost_since_us: None,
        }
    }

    /// Record a frame from the peer
    pub fn heard(&mut self, now_us: u64) {
        self.last_heard_us = Some(now_us);
    }

    /// Declare an outage; repeated calls keep the first outage time
    ///
    /// The outage is dated from the last frame heard, not from the moment the
    /// silence was noticed.
    pub fn link_lost(&mut self, now_us: u64) {
        if self.lost_since_us.is_none() {
            let since = self.last_heard_us.map_or(now_us, |heard| heard.min(now_us));
            self.lost_since_us = Some(since);
        }
    }

    /// End an outage, returning how long it lasted
    pub fn link_restored(&mut self, now_us: u64) -> Option<u64> {
        self.last_heard_us = Some(now_us);
        self.lost_since_us
            .take()
            .map(|since| now_us.saturating_sub(since))
    }

    pub fn is_connected(&self) -> bool {
        self.lost_since_us.is_none()
    }

    /// Peer traffic expected but overdue
    pub fn beacon_overdue(&self, now_us: u64) -> bool {
        match self.last_heard_us {
            Some(heard) => now_us.saturating_sub(heard) >= BEACON_TIMEOUT_US,
            None => false,
        }
    }

    pub fn check(&self, now_us: u64) -> LinkStatus {
        if let Some(since) = self.lost_since_us {
            let outage_us = now_us.saturating_sub(since);
            if outage_us >= EPOCH_STALE_US {
                return LinkStatus::Expired;
            }
            return LinkStatus::Lost { outage_us };
        }

        if self.beacon_overdue(now_us) {
            return LinkStatus::Silent;
        }

        LinkStatus::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_monitor_connected() {
        let monitor = LinkMonitor::new();
        assert_eq!(monitor.check(1_000_000_000), LinkStatus::Connected);
        assert!(!monitor.beacon_overdue(1_000_000_000));
    }

    #[test]
    fn test_silence_detected() {
        let mut monitor = LinkMonitor::new();
        monitor.heard(0);
        assert_eq!(monitor.check(BEACON_TIMEOUT_US - 1), LinkStatus::Connected);
        assert_eq!(monitor.check(BEACON_TIMEOUT_US), LinkStatus::Silent);
    }

    #[test]
    fn test_short_outage() {
        let mut monitor = LinkMonitor::new();
        monitor.link_lost(10_000_000);
        monitor.link_lost(20_000_000); // keeps first outage time
        assert_eq!(
            monitor.check(70_000_000),
            LinkStatus::Lost {
                outage_us: 60_000_000
            }
        );
        assert_eq!(monitor.link_restored(70_000_000), Some(60_000_000));
        assert!(monitor.is_connected());
    }

    #[test]
    fn test_outage_expires() {
        let mut monitor = LinkMonitor::new();
        monitor.link_lost(0);
        assert_eq!(monitor.check(EPOCH_STALE_US), LinkStatus::Expired);
    }

    #[test]
    fn test_outage_dated_from_last_frame() {
        let mut monitor = LinkMonitor::new();
        monitor.heard(7_000_000);
        // Silence noticed a beacon timeout later
        monitor.link_lost(7_000_000 + BEACON_TIMEOUT_US);

        assert_eq!(
            monitor.check(126_000_000),
            LinkStatus::Lost {
                outage_us: 119_000_000
            }
        );
        assert_eq!(monitor.check(7_000_000 + EPOCH_STALE_US), LinkStatus::Expired);
        assert_eq!(monitor.link_restored(130_000_000), Some(123_000_000));
    }

    #[test]
    fn test_restore_without_outage() {
        let mut monitor = LinkMonitor::new();
        assert_eq!(monitor.link_restored(5), None);
    }
}
