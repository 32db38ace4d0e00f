use std::fmt;

/// Where a collection stands between its cached and authoritative copies.
///
/// ```text
/// Empty ──hydrate──► Hydrated ──bulk load──► Syncing ──ok──► Synced
///   └─────────────bulk load────────────────────┘  │
///                          ◄──────failed──────────┘ (back to prior phase)
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    /// Nothing loaded yet.
    #[default]
    Empty,
    /// Serving a cached snapshot from a previous run.
    Hydrated,
    /// A bulk load is in flight.
    Syncing,
    /// Holding data confirmed by the remote service.
    Synced,
}

impl SyncPhase {
    /// Phase after hydrating; only a non-empty snapshot moves `Empty` forward.
    pub fn hydrated(self, found_records: bool) -> SyncPhase {
        match self {
            SyncPhase::Empty if found_records => SyncPhase::Hydrated,
            other => other,
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Empty => "empty",
            SyncPhase::Hydrated => "hydrated",
            SyncPhase::Syncing => "syncing",
            SyncPhase::Synced => "synced",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hydrate_only_advances_from_empty() {
        assert_eq!(SyncPhase::Empty.hydrated(true), SyncPhase::Hydrated);
        assert_eq!(SyncPhase::Empty.hydrated(false), SyncPhase::Empty);
        assert_eq!(SyncPhase::Synced.hydrated(true), SyncPhase::Synced);
    }
}
