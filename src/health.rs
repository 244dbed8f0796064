//! Backend reachability monitoring.
//!
//! The `HealthMonitor` probes the backend on a fixed interval, classifies
//! connection quality from latency, and re-probes immediately on two
//! edge-triggered external events: the page regaining foreground
//! visibility and the network coming back online. Consumers read the
//! current status or subscribe to a watch channel; nobody but the
//! monitor ever writes it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// Default probe interval.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;

/// Something that can answer "are you reachable, and how fast".
///
/// The HTTP backend implements this against `GET /health`; tests supply
/// scripted probes.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Returns measured latency in milliseconds on success.
    async fn probe(&self) -> Result<u64, StoreError>;
}

/// Coarse connection quality derived from probe latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Poor,
    Unreachable,
}

impl std::fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionQuality::Excellent => write!(f, "excellent"),
            ConnectionQuality::Good => write!(f, "good"),
            ConnectionQuality::Poor => write!(f, "poor"),
            ConnectionQuality::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Latency thresholds for quality classification.
///
/// Tunables, not a contract — but classification is monotonic by
/// construction: lower latency never yields a worse quality.
#[derive(Debug, Clone, Copy)]
pub struct QualityBands {
    pub excellent_below_ms: u64,
    pub good_below_ms: u64,
}

impl Default for QualityBands {
    fn default() -> Self {
        Self {
            excellent_below_ms: 100,
            good_below_ms: 400,
        }
    }
}

impl QualityBands {
    pub fn classify(&self, latency_ms: u64) -> ConnectionQuality {
        if latency_ms < self.excellent_below_ms {
            ConnectionQuality::Excellent
        } else if latency_ms < self.good_below_ms.max(self.excellent_below_ms) {
            ConnectionQuality::Good
        } else {
            ConnectionQuality::Poor
        }
    }
}

/// Configuration for the monitor.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Fixed probe interval; failed probes are never retried faster.
    pub interval: Duration,
    pub bands: QualityBands,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
            bands: QualityBands::default(),
        }
    }
}

impl HealthConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }
}

/// One probe result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSample {
    pub reachable: bool,
    pub latency_ms: Option<u64>,
    pub timestamp: DateTime<Utc>,
    pub consecutive_failures: u32,
}

/// Current connectivity state, as exposed to consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub online: bool,
    /// A probe is in flight right now
    pub connecting: bool,
    pub quality: ConnectionQuality,
    pub latency_ms: Option<u64>,
    pub consecutive_errors: u32,
    pub last_checked: Option<DateTime<Utc>>,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            online: false,
            connecting: false,
            quality: ConnectionQuality::Unreachable,
            latency_ms: None,
            consecutive_errors: 0,
            last_checked: None,
        }
    }
}

/// Periodic backend reachability prober.
pub struct HealthMonitor {
    probe: Arc<dyn HealthProbe>,
    config: HealthConfig,
    status_tx: watch::Sender<HealthStatus>,
    /// Present while the probe loop is running.
    cancel: Mutex<Option<CancellationToken>>,
    /// Last observed page visibility / network state, for edge detection.
    visible: AtomicBool,
    network_online: AtomicBool,
}

impl HealthMonitor {
    pub fn new(probe: Arc<dyn HealthProbe>, config: HealthConfig) -> Self {
        let (status_tx, _) = watch::channel(HealthStatus::default());
        Self {
            probe,
            config,
            status_tx,
            cancel: Mutex::new(None),
            visible: AtomicBool::new(true),
            network_online: AtomicBool::new(true),
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Current status snapshot.
    pub fn status(&self) -> HealthStatus {
        self.status_tx.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<HealthStatus> {
        self.status_tx.subscribe()
    }

    /// Start periodic probing: one probe immediately, then one per
    /// interval. Calling `start` while already running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let token = {
            let mut guard = self.cancel.lock().expect("health monitor lock poisoned");
            if guard.is_some() {
                tracing::debug!("Health monitor already running, start() ignored");
                return;
            }
            let token = CancellationToken::new();
            *guard = Some(token.clone());
            token
        };

        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.config.interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    // The first tick fires immediately.
                    _ = ticker.tick() => {
                        monitor.check_now().await;
                    }
                }
            }
            tracing::debug!("Health monitor probe loop stopped");
        });
    }

    /// Stop periodic probing and cancel the pending timer.
    pub fn stop(&self) {
        let token = self
            .cancel
            .lock()
            .expect("health monitor lock poisoned")
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }

    /// Whether the probe loop is currently running.
    pub fn is_running(&self) -> bool {
        self.cancel
            .lock()
            .expect("health monitor lock poisoned")
            .is_some()
    }

    /// Probe immediately, regardless of the timer.
    pub async fn check_now(&self) -> HealthSample {
        self.status_tx.send_modify(|status| status.connecting = true);
        let result = self.probe.probe().await;
        let timestamp = Utc::now();

        let mut sample = HealthSample {
            reachable: false,
            latency_ms: None,
            timestamp,
            consecutive_failures: 0,
        };
        self.status_tx.send_modify(|status| {
            status.connecting = false;
            status.last_checked = Some(timestamp);
            match &result {
                Ok(latency_ms) => {
                    status.online = true;
                    status.latency_ms = Some(*latency_ms);
                    status.consecutive_errors = 0;
                    status.quality = self.config.bands.classify(*latency_ms);
                    sample.reachable = true;
                    sample.latency_ms = Some(*latency_ms);
                }
                Err(_) => {
                    status.online = false;
                    status.latency_ms = None;
                    status.consecutive_errors = status.consecutive_errors.saturating_add(1);
                    status.quality = ConnectionQuality::Unreachable;
                    sample.consecutive_failures = status.consecutive_errors;
                }
            }
        });

        match &result {
            Ok(latency_ms) => {
                tracing::debug!(latency_ms, "Backend probe succeeded");
            }
            Err(err) => {
                tracing::warn!(
                    consecutive_errors = sample.consecutive_failures,
                    error = %err,
                    "Backend probe failed"
                );
            }
        }
        sample
    }

    /// Report a page visibility change. Re-probes only on the
    /// hidden -> visible transition.
    pub async fn notify_visibility(&self, visible: bool) {
        let was_visible = self.visible.swap(visible, Ordering::SeqCst);
        if visible && !was_visible {
            tracing::debug!("Page became visible, re-probing backend");
            self.check_now().await;
        }
    }

    /// Report a network connectivity change. Re-probes only on the
    /// offline -> online transition.
    pub async fn notify_network(&self, online: bool) {
        let was_online = self.network_online.swap(online, Ordering::SeqCst);
        if online && !was_online {
            tracing::debug!("Network came back online, re-probing backend");
            self.check_now().await;
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        // Component teardown must not leak the periodic probe task.
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;

    /// Probe returning a scripted sequence, then repeating the last entry.
    struct ScriptedProbe {
        script: Mutex<VecDeque<Result<u64, StoreError>>>,
        calls: AtomicU32,
    }

    impl ScriptedProbe {
        fn new(script: Vec<Result<u64, StoreError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HealthProbe for ScriptedProbe {
        async fn probe(&self) -> Result<u64, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script
                    .front()
                    .cloned()
                    .unwrap_or(Ok(50))
            }
        }
    }

    fn network_err() -> Result<u64, StoreError> {
        Err(StoreError::Network {
            message: "connection refused".to_string(),
        })
    }

    #[test]
    fn quality_bands_are_monotonic() {
        let bands = QualityBands::default();
        let mut previous = bands.classify(0);
        for latency in 0..1000 {
            let quality = bands.classify(latency);
            let rank = |q: ConnectionQuality| match q {
                ConnectionQuality::Excellent => 0,
                ConnectionQuality::Good => 1,
                ConnectionQuality::Poor => 2,
                ConnectionQuality::Unreachable => 3,
            };
            assert!(rank(quality) >= rank(previous));
            previous = quality;
        }
    }

    #[test]
    fn quality_band_thresholds() {
        let bands = QualityBands::default();
        assert_eq!(bands.classify(50), ConnectionQuality::Excellent);
        assert_eq!(bands.classify(100), ConnectionQuality::Good);
        assert_eq!(bands.classify(399), ConnectionQuality::Good);
        assert_eq!(bands.classify(400), ConnectionQuality::Poor);
        assert_eq!(bands.classify(5000), ConnectionQuality::Poor);
    }

    #[tokio::test]
    async fn three_failures_then_success_resets_counter() {
        let probe = ScriptedProbe::new(vec![
            network_err(),
            network_err(),
            network_err(),
            Ok(42),
        ]);
        let monitor = HealthMonitor::new(probe, HealthConfig::default());

        for expected in 1..=3u32 {
            let sample = monitor.check_now().await;
            assert!(!sample.reachable);
            assert_eq!(sample.consecutive_failures, expected);
        }
        let status = monitor.status();
        assert_eq!(status.consecutive_errors, 3);
        assert_eq!(status.quality, ConnectionQuality::Unreachable);
        assert!(!status.online);

        let sample = monitor.check_now().await;
        assert!(sample.reachable);
        assert_eq!(sample.consecutive_failures, 0);
        let status = monitor.status();
        assert_eq!(status.consecutive_errors, 0);
        assert!(status.online);
        assert_eq!(status.quality, ConnectionQuality::Excellent);
    }

    #[tokio::test]
    async fn start_probes_immediately_and_is_idempotent() {
        let probe = ScriptedProbe::new(vec![Ok(10)]);
        let monitor = Arc::new(HealthMonitor::new(
            probe.clone(),
            HealthConfig::with_interval(Duration::from_secs(3600)),
        ));

        monitor.start();
        monitor.start(); // no duplicate timer
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(probe.calls(), 1, "duplicate start must not double-probe");
        assert!(monitor.is_running());
        monitor.stop();
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn stop_cancels_the_probe_loop() {
        let probe = ScriptedProbe::new(vec![Ok(10)]);
        let monitor = Arc::new(HealthMonitor::new(
            probe.clone(),
            HealthConfig::with_interval(Duration::from_millis(10)),
        ));

        monitor.start();
        tokio::time::sleep(Duration::from_millis(35)).await;
        monitor.stop();
        let calls_at_stop = probe.calls();
        assert!(calls_at_stop >= 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(
            probe.calls() <= calls_at_stop + 1,
            "probing must stop after stop()"
        );
    }

    #[tokio::test]
    async fn restart_after_stop_is_allowed() {
        let probe = ScriptedProbe::new(vec![Ok(10)]);
        let monitor = Arc::new(HealthMonitor::new(
            probe.clone(),
            HealthConfig::with_interval(Duration::from_secs(3600)),
        ));
        monitor.start();
        tokio::time::sleep(Duration::from_millis(20)).await;
        monitor.stop();
        monitor.start();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(probe.calls(), 2);
        monitor.stop();
    }

    #[tokio::test]
    async fn visibility_reprobe_is_edge_triggered() {
        let probe = ScriptedProbe::new(vec![Ok(10)]);
        let monitor = HealthMonitor::new(probe.clone(), HealthConfig::default());

        // Already visible: no edge, no probe.
        monitor.notify_visibility(true).await;
        assert_eq!(probe.calls(), 0);

        monitor.notify_visibility(false).await;
        assert_eq!(probe.calls(), 0);

        // hidden -> visible is the edge.
        monitor.notify_visibility(true).await;
        assert_eq!(probe.calls(), 1);

        // Repeated visible notifications are not edges.
        monitor.notify_visibility(true).await;
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn network_reprobe_is_edge_triggered() {
        let probe = ScriptedProbe::new(vec![Ok(10)]);
        let monitor = HealthMonitor::new(probe.clone(), HealthConfig::default());

        monitor.notify_network(false).await;
        assert_eq!(probe.calls(), 0);
        monitor.notify_network(true).await;
        assert_eq!(probe.calls(), 1);
        monitor.notify_network(true).await;
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn subscribers_see_status_updates() {
        let probe = ScriptedProbe::new(vec![Ok(42)]);
        let monitor = HealthMonitor::new(probe, HealthConfig::default());
        let mut rx = monitor.subscribe();

        monitor.check_now().await;
        rx.changed().await.unwrap();
        let status = rx.borrow().clone();
        assert!(status.online);
        assert_eq!(status.latency_ms, Some(42));
    }
}
