use std::fmt;

/// Whether a pair's book reflects the exchange
///
/// Only `Synced` books accept diffs or get handed out. A reconnect moves
/// every synced book to `OutOfSync` until the server resends a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No snapshot seen for this pair yet
    Uninitialized,
    Synced,
    /// Transport was replaced; the held book may have missed updates
    OutOfSync,
}

impl SyncStatus {
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncStatus::Uninitialized => "uninitialized",
            SyncStatus::Synced => "synced",
            SyncStatus::OutOfSync => "out-of-sync",
        };
        f.write_str(label)
    }
}
