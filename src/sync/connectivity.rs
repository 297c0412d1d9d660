//! Connectivity observer
//!
//! Holds the current online/offline belief. Observers see only the latest
//! value: there is no transition history, so a poller can miss a flip that
//! was reverted before it looked.
//!
//! "Online" means a network path looked usable the last time anyone checked,
//! not that the next request will succeed.

use crate::sync::task::TaskHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Latest-value online/offline state shared across components
#[derive(Clone)]
pub struct ConnectivityObserver {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ConnectivityObserver {
    /// Assume online until a signal source says otherwise
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityObserver {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Publish a new belief; repeating the current value notifies nobody
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            if online {
                info!("Network: ONLINE");
            } else {
                warn!("Network: OFFLINE");
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Reachability probe feeding a `ConnectivityObserver`
///
/// Any HTTP response counts as online (even 4xx/5xx: the network path
/// exists); a transport error or timeout counts as offline.
#[derive(Clone)]
pub struct ConnectivityProbe {
    client: reqwest::Client,
    url: String,
}

impl ConnectivityProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Probe once and return the result without publishing it
    pub async fn check(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                debug!("Probe {} answered {}", self.url, response.status());
                true
            }
            Err(e) => {
                debug!("Probe {} failed: {}", self.url, e);
                false
            }
        }
    }

    /// Probe once and publish the result
    pub async fn refresh(&self, observer: &ConnectivityObserver) -> bool {
        let online = self.check().await;
        observer.set_online(online);
        online
    }

    /// Probe immediately, then every `period`, until stopped
    pub fn spawn(self, observer: ConnectivityObserver, period: Duration) -> TaskHandle {
        TaskHandle::spawn("Connectivity probe", move |mut shutdown_rx| async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Probing {} every {:?}", self.url, period);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        self.refresh(&observer).await;
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        })
    }
}
