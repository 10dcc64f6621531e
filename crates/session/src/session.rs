//! The live remote session and its reconnect loop.

use sharecopy_protocol::{
    ConnectStage, EventSink, FileStore, NegotiatedLimits, ShareClient, ShareConnector,
    TransferEvent,
};
use tracing::{debug, error, info, warn};

use crate::error::SessionError;
use crate::types::{ConnectionState, RetryPolicy, SessionConfig};

/// The protocol objects behind a connected session.
///
/// Both halves always exist together: a session either has a client that
/// is attached to the share, or it has nothing.
struct LiveSession {
    client: Box<dyn ShareClient>,
    store: Box<dyn FileStore>,
}

impl LiveSession {
    /// Detaches the share, logs off and drops the transport. Errors are
    /// logged and swallowed.
    async fn teardown(self) {
        if let Err(e) = self.store.disconnect().await {
            debug!(error = %e, "tree disconnect failed during teardown");
        }
        if let Err(e) = self.client.logoff().await {
            debug!(error = %e, "logoff failed during teardown");
        }
        self.client.disconnect().await;
    }
}

/// Runs the connect sequence once. Any partially established state is
/// released before an error is returned.
async fn establish(
    connector: &dyn ShareConnector,
    config: &SessionConfig,
    events: &EventSink,
) -> Result<LiveSession, SessionError> {
    events.emit(TransferEvent::Connecting {
        address: config.address.clone(),
        share: config.share.clone(),
    });
    debug!(address = %config.address, share = %config.share, "connecting");

    let client = connector.client();

    if let Err(e) = client.connect(&config.address).await {
        events.emit(TransferEvent::ConnectFailed {
            stage: ConnectStage::Connect,
            error: e.clone(),
        });
        client.disconnect().await;
        return Err(SessionError::Connect {
            address: config.address.clone(),
            source: e,
        });
    }

    if let Err(e) = client.login(&config.domain, &config.credentials).await {
        events.emit(TransferEvent::ConnectFailed {
            stage: ConnectStage::Login,
            error: e.clone(),
        });
        client.disconnect().await;
        return Err(SessionError::Login {
            domain: config.domain.clone(),
            source: e,
        });
    }

    let store = match client.tree_connect(&config.share).await {
        Ok(store) => store,
        Err(e) => {
            events.emit(TransferEvent::ConnectFailed {
                stage: ConnectStage::TreeConnect,
                error: e.clone(),
            });
            if let Err(e) = client.logoff().await {
                debug!(error = %e, "logoff failed after tree connect error");
            }
            client.disconnect().await;
            return Err(SessionError::TreeConnect {
                share: config.share.clone(),
                source: e,
            });
        }
    };

    let limits = client.limits();
    info!(
        address = %config.address,
        share = %config.share,
        max_write = limits.max_write_size,
        "connected"
    );
    events.emit(TransferEvent::Connected {
        address: config.address.clone(),
        share: config.share.clone(),
        limits,
    });

    Ok(LiveSession { client, store })
}

/// An authenticated, share-attached connection that can be re-established
/// in place.
///
/// Holders reach the share only through [`RemoteSession::store`], so
/// after a [`reconnect`](RemoteSession::reconnect) every caller observes
/// the fresh handle. A session is either fully connected or holds no
/// protocol state at all.
pub struct RemoteSession {
    connector: Box<dyn ShareConnector>,
    config: SessionConfig,
    reconnect_policy: RetryPolicy,
    events: EventSink,
    live: Option<LiveSession>,
    limits: NegotiatedLimits,
    reconnects: u32,
}

impl RemoteSession {
    /// Connects, authenticates and attaches to the configured share.
    pub async fn connect(
        connector: Box<dyn ShareConnector>,
        config: SessionConfig,
        reconnect_policy: RetryPolicy,
        events: EventSink,
    ) -> Result<Self, SessionError> {
        let live = establish(connector.as_ref(), &config, &events).await?;
        let limits = live.client.limits();
        Ok(Self {
            connector,
            config,
            reconnect_policy,
            events,
            live: Some(live),
            limits,
            reconnects: 0,
        })
    }

    /// Tears the current session down and tries to establish a new one.
    ///
    /// Each attempt waits the policy delay first. On success the new
    /// client and share handle replace the old ones together; on
    /// exhaustion the session stays disconnected and `false` is returned.
    pub async fn reconnect(&mut self) -> bool {
        if let Some(live) = self.live.take() {
            live.teardown().await;
            self.events.emit(TransferEvent::Disconnected);
        }

        let policy = self.reconnect_policy;
        for attempt in policy.attempts() {
            self.events.emit(TransferEvent::Reconnecting {
                attempt,
                max_attempts: policy.limit(),
                delay: policy.delay,
            });
            info!(
                attempt,
                max_attempts = policy.limit(),
                delay_secs = format_args!("{:.1}", policy.delay.as_secs_f64()),
                "reconnecting"
            );
            policy.wait().await;

            match establish(self.connector.as_ref(), &self.config, &self.events).await {
                Ok(live) => {
                    self.limits = live.client.limits();
                    self.live = Some(live);
                    self.reconnects += 1;
                    info!(attempt, "reconnected");
                    self.events.emit(TransferEvent::Reconnected { attempt });
                    return true;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "reconnect attempt failed");
                    self.events.emit(TransferEvent::ReconnectFailed { attempt });
                }
            }
        }

        error!(attempts = policy.limit(), "giving up on reconnect");
        self.events.emit(TransferEvent::ReconnectExhausted {
            attempts: policy.limit(),
        });
        false
    }

    /// Releases the session. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(live) = self.live.take() {
            live.teardown().await;
            info!(address = %self.config.address, "disconnected");
            self.events.emit(TransferEvent::Disconnected);
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.live.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.live.is_some()
    }

    /// The current share handle.
    pub fn store(&self) -> Result<&dyn FileStore, SessionError> {
        self.live
            .as_ref()
            .map(|live| live.store.as_ref())
            .ok_or(SessionError::NotConnected)
    }

    /// Limits negotiated by the most recent successful connect.
    pub fn limits(&self) -> NegotiatedLimits {
        self.limits
    }

    /// Largest payload a single write may carry.
    pub fn max_write_size(&self) -> usize {
        self.limits.max_write_size as usize
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Successful reconnects since the session was created.
    pub fn reconnect_count(&self) -> u32 {
        self.reconnects
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            warn!(address = %self.config.address, "session dropped while connected");
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(live.teardown());
            }
        }
    }
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("address", &self.config.address)
            .field("share", &self.config.share)
            .field("state", &self.state())
            .field("reconnects", &self.reconnects)
            .finish()
    }
}
