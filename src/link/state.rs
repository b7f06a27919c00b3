//! Link lifecycle states.

use std::fmt;

use crate::error::Severity;

/// Where the session is in the connect/discover/liveness lifecycle.
///
/// ```text
///            start_scan                countdown hits 0
///   Idle ──────────────► Scanning ─────────────────────► Idle
///    │                      │
///    │ connect              │ connect
///    ▼                      ▼
///   Connecting ──connected──► ServiceDiscovery ──first frame──► Ready
///    │                          │                                │
///    │ disconnect / error /     │ disconnect / error /           │ disconnect
///    │ watchdog                 │ watchdog                       │      │ watchdog
///    ▼                          ▼                                ▼      ▼
///   Failed ◄────────────────────┴─────────────────────────── Failed  TimedOut
/// ```
///
/// `Failed` and `TimedOut` are terminal until a new connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Idle,
    Scanning,
    Connecting,
    ServiceDiscovery,
    Ready,
    Failed,
    TimedOut,
}

impl LinkState {
    /// A peripheral is attached or being attached.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            LinkState::Connecting | LinkState::ServiceDiscovery | LinkState::Ready
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LinkState::Failed | LinkState::TimedOut)
    }

    /// User-facing message for states worth announcing.
    pub fn notice(&self) -> Option<(Severity, &'static str)> {
        match self {
            LinkState::Failed => Some((Severity::Error, "Connection failed")),
            LinkState::TimedOut => Some((Severity::Error, "Connection timed out")),
            _ => None,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Idle => "idle",
            LinkState::Scanning => "scanning",
            LinkState::Connecting => "connecting",
            LinkState::ServiceDiscovery => "service-discovery",
            LinkState::Ready => "ready",
            LinkState::Failed => "failed",
            LinkState::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}
