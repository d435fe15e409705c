//! Connectivity monitor.
//!
//! Tracks whether the remote store is reachable. The initial state comes from
//! a [`ConnectivityProbe`]; afterwards the host reports transitions through
//! [`ConnectivityMonitor::set_online`]. Observers subscribe to a watch
//! channel and react to `Offline -> Online` by draining the pending queue.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

/// Reachability of the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    #[must_use]
    pub const fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Effect of reporting a connectivity signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Offline -> Online. Pending changes should be drained.
    CameOnline,
    /// Online -> Offline.
    WentOffline,
    /// The signal matched the current state.
    Unchanged,
}

/// Source of the platform's connectivity signal.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl ConnectivityProbe for StaticProbe {
    fn is_online(&self) -> bool {
        self.0
    }
}

/// Probe that opens a TCP connection to the backend.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    /// Probe the host and port of `url`.
    ///
    /// Returns `None` if the url has no host.
    #[must_use]
    pub fn for_url(url: &str, timeout: Duration) -> Option<Self> {
        let parsed = reqwest::Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        let port = parsed.port_or_known_default()?;
        Some(Self {
            address: format!("{host}:{port}"),
            timeout,
        })
    }
}

impl ConnectivityProbe for TcpProbe {
    fn is_online(&self) -> bool {
        let Ok(addrs) = self.address.to_socket_addrs() else {
            return false;
        };
        addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, self.timeout).is_ok())
    }
}

/// Two-state online/offline tracker.
pub struct ConnectivityMonitor {
    state: watch::Sender<Connectivity>,
}

impl ConnectivityMonitor {
    #[must_use]
    pub fn new(initial: Connectivity) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    /// Start in whatever state the probe reports.
    #[must_use]
    pub fn from_probe(probe: &dyn ConnectivityProbe) -> Self {
        let initial = Connectivity::from_online(probe.is_online());
        info!(%initial, "Initial connectivity");
        Self::new(initial)
    }

    #[must_use]
    pub fn current(&self) -> Connectivity {
        *self.state.borrow()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    /// Report the platform's current signal.
    pub fn set_online(&self, online: bool) -> Transition {
        let next = Connectivity::from_online(online);
        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });

        if !changed {
            return Transition::Unchanged;
        }
        if online {
            info!("Connectivity restored");
            Transition::CameOnline
        } else {
            warn!("Connectivity lost");
            Transition::WentOffline
        }
    }

    /// Watch connectivity changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        assert!(!monitor.is_online());

        assert_eq!(monitor.set_online(false), Transition::Unchanged);
        assert_eq!(monitor.set_online(true), Transition::CameOnline);
        assert_eq!(monitor.set_online(true), Transition::Unchanged);
        assert_eq!(monitor.set_online(false), Transition::WentOffline);
    }

    #[test]
    fn test_from_probe() {
        assert!(ConnectivityMonitor::from_probe(&StaticProbe(true)).is_online());
        assert!(!ConnectivityMonitor::from_probe(&StaticProbe(false)).is_online());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        let mut rx = monitor.subscribe();

        monitor.set_online(true);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Connectivity::Online);
    }

    #[test]
    fn test_tcp_probe_address() {
        let probe = TcpProbe::for_url("http://localhost:8080/api", Duration::from_millis(10)).unwrap();
        assert_eq!(probe.address, "localhost:8080");

        let probe = TcpProbe::for_url("https://example.com", Duration::from_millis(10)).unwrap();
        assert_eq!(probe.address, "example.com:443");

        assert!(TcpProbe::for_url("not a url", Duration::from_millis(10)).is_none());
    }
}
