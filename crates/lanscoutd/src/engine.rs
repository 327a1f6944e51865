//! Discovery engine — lifecycle around the scan loops.
//!
//! Stopped → Running → Stopped. `start` resolves the subnets, opens the
//! session socket and spawns the broadcast, listener and monitor tasks.
//! `stop` signals shutdown and awaits all three before returning, so no loop
//! outlives its session. Both are idempotent. Errors never leave the engine:
//! a session that cannot be opened is logged and the engine stays stopped.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use lanscout_core::config::LanscoutConfig;
use lanscout_core::SubnetPrefix;
use lanscout_services::{
    resolve_local_endpoint, scan_subnets, subnet_prefix, ConnectionRecord, ConnectionRegistry,
    NotificationHub, RegistryEvent,
};

use crate::scan::broadcast::{broadcast_loop, Probe};
use crate::scan::listener::{listener_loop, ReplyHandler};
use crate::scan::monitor::{monitor_loop, MonitorPolicy};
use crate::scan::make_scan_socket;

/// Resources owned by one Running period.
struct ScanSession {
    socket: Arc<UdpSocket>,
    subnets: Arc<Vec<SubnetPrefix>>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

pub struct DiscoveryEngine {
    config: LanscoutConfig,
    registry: ConnectionRegistry,
    running: AtomicBool,
    session: Mutex<Option<ScanSession>>,
}

impl DiscoveryEngine {
    /// Build a stopped engine with an empty roster.
    pub fn new(config: LanscoutConfig) -> Self {
        Self {
            config,
            registry: ConnectionRegistry::new(NotificationHub::new()),
            running: AtomicBool::new(false),
            session: Mutex::new(None),
        }
    }

    /// Build an engine and start it when `scan.auto_start` is set.
    pub async fn launch(config: LanscoutConfig) -> Self {
        let auto_start = config.scan.auto_start;
        let engine = Self::new(config);
        if auto_start {
            engine.start().await;
        }
        engine
    }

    pub fn config(&self) -> &LanscoutConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Registry events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.registry.hub().subscribe()
    }

    pub fn snapshot(&self) -> Vec<ConnectionRecord> {
        self.registry.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Local endpoint of the session socket, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let session = self.session.lock().await;
        session.as_ref().and_then(|s| s.socket.local_addr().ok())
    }

    /// Subnets probed by the current session. Empty while stopped.
    pub async fn subnets(&self) -> Vec<SubnetPrefix> {
        let session = self.session.lock().await;
        session
            .as_ref()
            .map(|s| s.subnets.as_ref().clone())
            .unwrap_or_default()
    }

    /// Start scanning. No-op if already running.
    pub async fn start(&self) {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return;
        }

        match self.open_session() {
            Ok(opened) => {
                tracing::info!(
                    local = ?opened.socket.local_addr().ok(),
                    subnets = ?opened.subnets.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                    "discovery started"
                );
                *session = Some(opened);
                self.running.store(true, Ordering::Release);
            }
            Err(e) => tracing::error!(error = %format!("{e:#}"), "failed to start discovery"),
        }
    }

    /// Stop scanning and wait for the loops to exit. No-op if already stopped.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        let Some(current) = session.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);

        let _ = current.shutdown_tx.send(());
        for task in current.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "scan task ended abnormally");
            }
        }
        // Socket and subnet list go with the session.
        drop(current.socket);
        tracing::info!("discovery stopped");
    }

    /// Remove every offline device. Safe whether running or not.
    pub fn purge_list(&self) -> usize {
        self.registry.purge_offline()
    }

    fn open_session(&self) -> Result<ScanSession> {
        let network = &self.config.network;

        let local = match network.local_address {
            Some(addr) => Some(SubnetPrefix::of(addr)),
            None => match resolve_local_endpoint() {
                Ok(endpoint) => Some(subnet_prefix(endpoint)),
                Err(e) => {
                    tracing::warn!(error = %e, "local subnet unresolved, probing configured subnets only");
                    None
                }
            },
        };
        let subnets = Arc::new(scan_subnets(
            local,
            network.bridged_subnet,
            &network.extra_subnets,
        ));

        let probes: Vec<Probe> = network.probes.iter().filter_map(|k| k.probe()).collect();
        if probes.is_empty() {
            tracing::warn!("no probes configured, listening passively");
        }

        let socket = make_scan_socket().context("failed to create scan socket")?;
        let socket = Arc::new(
            UdpSocket::from_std(socket).context("failed to convert to tokio UdpSocket")?,
        );

        let scan = &self.config.scan;
        let policy = MonitorPolicy {
            frequency: scan.scan_frequency(),
            disconnect_timeout: scan.disconnect_timeout(),
            remove_on_disconnect: scan.remove_on_disconnect,
        };
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let tasks = vec![
            tokio::spawn(broadcast_loop(
                socket.clone(),
                subnets.clone(),
                probes,
                network.probe_port,
                policy.frequency,
                shutdown_tx.subscribe(),
            )),
            tokio::spawn(listener_loop(
                socket.clone(),
                ReplyHandler::new(self.registry.clone(), network.bridged_subnet),
                shutdown_tx.subscribe(),
            )),
            tokio::spawn(monitor_loop(
                self.registry.clone(),
                policy,
                shutdown_tx.subscribe(),
            )),
        ];

        Ok(ScanSession {
            socket,
            subnets,
            shutdown_tx,
            tasks,
        })
    }
}

impl Drop for DiscoveryEngine {
    fn drop(&mut self) {
        // Dropped without stop(): signal and abort, nothing can be awaited here.
        if let Some(session) = self.session.get_mut().take() {
            let _ = session.shutdown_tx.send(());
            for task in &session.tasks {
                task.abort();
            }
        }
    }
}
