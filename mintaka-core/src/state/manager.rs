//! Connection manager: discovery, phase tracking and edge-triggered
//! status notifications.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::device::{DeviceIds, HidBackend};
use crate::error::MintakaError;
use crate::state::connection::{ConnectionPhase, ConnectionStatus};

/// Fixed delay between connection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

type StatusCallback = Box<dyn FnMut(ConnectionStatus) + Send + 'static>;

/// Owns the HID backend and the connection phase.
///
/// Status callbacks fire once per edge: entering `Connected` or
/// entering `Disconnected` (including the first failed attempt after
/// startup). Staying in either state is silent.
pub struct ConnectionManager<B: HidBackend> {
    backend: B,
    ids: DeviceIds,
    phase: ConnectionPhase,
    reconnect_delay: Duration,
    last_reported: Option<ConnectionStatus>,
    callbacks: Vec<StatusCallback>,
}

impl<B: HidBackend> ConnectionManager<B> {
    pub fn new(backend: B, ids: DeviceIds) -> Self {
        Self {
            backend,
            ids,
            phase: ConnectionPhase::Disconnected,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            last_reported: None,
            callbacks: Vec::new(),
        }
    }

    /// Override the delay between attempts (tests use zero).
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Register a callback for connect/disconnect edges.
    pub fn on_status<F>(&mut self, f: F)
    where
        F: FnMut(ConnectionStatus) + Send + 'static,
    {
        self.callbacks.push(Box::new(f));
    }

    pub fn phase(&self) -> &ConnectionPhase {
        &self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase.is_connected()
    }

    pub fn ids(&self) -> &DeviceIds {
        &self.ids
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// Make one connection attempt.
    ///
    /// On success the caller owns the open channel until it reports a
    /// failure through [`mark_disconnected`](Self::mark_disconnected).
    pub fn connect(&mut self) -> Result<B::Channel, MintakaError> {
        self.phase.begin_connect()?;
        debug!("looking for {}", self.ids);

        match self.backend.open(&self.ids) {
            Ok(channel) => {
                self.phase.complete_connect()?;
                self.publish_status();
                Ok(channel)
            }
            Err(e) => {
                self.phase.fail_connect()?;
                self.publish_status();
                Err(e)
            }
        }
    }

    /// Drop to `Disconnected` after a failure mid-session. Any error
    /// ends the session; only the log line tells link loss apart.
    pub fn mark_disconnected(&mut self, cause: &MintakaError) {
        if self.phase.is_connected() {
            if cause.is_link_loss() {
                warn!("device link lost: {cause}");
            } else {
                warn!("closing device session after error: {cause}");
            }
        }
        self.phase.force_disconnect();
        self.publish_status();
    }

    /// Report the current status if it differs from the last one
    /// reported. Safe to call every loop iteration.
    pub fn publish_status(&mut self) {
        let status = self.phase.status();
        if self.last_reported == Some(status) {
            return;
        }
        self.last_reported = Some(status);
        info!("{status}");
        for callback in &mut self.callbacks {
            callback(status);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockDevice;
    use std::sync::{Arc, Mutex};

    fn recorder(
        manager: &mut ConnectionManager<MockDevice>,
    ) -> Arc<Mutex<Vec<ConnectionStatus>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.on_status(move |s| sink.lock().unwrap().push(s));
        seen
    }

    #[test]
    fn connect_to_present_device() {
        let dev = MockDevice::plugged();
        let mut mgr = ConnectionManager::new(dev.clone(), DeviceIds::default());
        let seen = recorder(&mut mgr);

        assert!(mgr.connect().is_ok());
        assert!(mgr.is_connected());
        assert_eq!(*seen.lock().unwrap(), vec![ConnectionStatus::Connected]);
        assert_eq!(dev.open_count(), 1);
    }

    #[test]
    fn steady_connected_state_notifies_once() {
        let mut mgr = ConnectionManager::new(MockDevice::plugged(), DeviceIds::default());
        let seen = recorder(&mut mgr);

        mgr.connect().unwrap();
        for _ in 0..5 {
            mgr.publish_status();
        }
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn each_edge_notifies_once() {
        let dev = MockDevice::plugged();
        let mut mgr = ConnectionManager::new(dev.clone(), DeviceIds::default());
        mgr.connect().unwrap();
        mgr.publish_status();

        let seen = recorder(&mut mgr);
        let cause = MintakaError::Transport("write: gone".into());

        // Connected → Disconnected → Connected, polled repeatedly.
        mgr.mark_disconnected(&cause);
        mgr.publish_status();
        mgr.publish_status();
        mgr.connect().unwrap();
        mgr.publish_status();
        mgr.publish_status();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ConnectionStatus::Disconnected, ConnectionStatus::Connected]
        );
    }

    #[test]
    fn repeated_failures_notify_once() {
        let dev = MockDevice::new();
        let mut mgr = ConnectionManager::new(dev.clone(), DeviceIds::default())
            .with_reconnect_delay(Duration::ZERO);
        let seen = recorder(&mut mgr);

        for _ in 0..5 {
            let err = mgr.connect().unwrap_err();
            assert!(matches!(err, MintakaError::DeviceNotConnected));
        }
        assert!(mgr.phase().is_disconnected());
        assert_eq!(*seen.lock().unwrap(), vec![ConnectionStatus::Disconnected]);

        dev.plug();
        mgr.connect().unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ConnectionStatus::Disconnected, ConnectionStatus::Connected]
        );
    }

    #[test]
    fn connect_while_connected_is_rejected() {
        let mut mgr = ConnectionManager::new(MockDevice::plugged(), DeviceIds::default());
        mgr.connect().unwrap();
        assert!(matches!(
            mgr.connect(),
            Err(MintakaError::InvalidTransition(_))
        ));
    }

    #[test]
    fn any_session_error_disconnects() {
        let mut mgr = ConnectionManager::new(MockDevice::plugged(), DeviceIds::default());
        let seen = recorder(&mut mgr);
        mgr.connect().unwrap();

        let cause = MintakaError::InvalidFrameSize {
            expected: 1024,
            actual: 3,
        };
        assert!(!cause.is_link_loss());
        mgr.mark_disconnected(&cause);
        assert!(mgr.phase().is_disconnected());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ConnectionStatus::Connected, ConnectionStatus::Disconnected]
        );
    }

    #[test]
    fn default_delay_is_one_second() {
        let mgr = ConnectionManager::new(MockDevice::new(), DeviceIds::default());
        assert_eq!(mgr.reconnect_delay(), Duration::from_secs(1));
    }
}
