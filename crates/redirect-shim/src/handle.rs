//! Lazy, exactly-once startup of the shim listener
//!
//! The listener address is only known after binding, yet rewritten literals
//! need it. `ShimHandle` binds on first demand and publishes the port; every
//! later caller takes a lock-free fast path.
//!
//! ## Startup sequence
//! 1. Fast path: port already published -> return it
//! 2. Lock state, re-check (another thread may have finished meanwhile)
//! 3. Bind `127.0.0.1:0` synchronously, so the port is known before returning
//! 4. Hand the listener to a dedicated thread running its own tokio runtime
//! 5. Publish the port, then mark `Running`
//!
//! Failure at any step is terminal. The shim is never retried.

use std::io;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};

use redirect_core::{LdcTransform, LegacyUrlMapper, MapperError, UrlRoot};

use crate::config::ShimConfig;
use crate::error::StartError;
use crate::routes::{create_router, AppState};

/// Worker threads for the shim runtime; it serves a single local client
const SHIM_WORKER_THREADS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShimState {
    NotStarted,
    Starting,
    Running(u16),
    /// Terminal; carries the startup error message
    Failed(String),
}

/// Owner of the shim's lifecycle
pub struct ShimHandle {
    config: Option<Arc<ShimConfig>>,
    state: Mutex<ShimState>,
    /// Bound port, 0 until running
    port: AtomicU16,
}

impl ShimHandle {
    pub fn new(config: ShimConfig) -> Self {
        Self::with_config(Some(config))
    }

    /// Handle without a backend; starting it fails with `MissingConfig`
    pub fn unconfigured() -> Self {
        Self::with_config(None)
    }

    fn with_config(config: Option<ShimConfig>) -> Self {
        Self {
            config: config.map(Arc::new),
            state: Mutex::new(ShimState::NotStarted),
            port: AtomicU16::new(0),
        }
    }

    /// Start the shim if it isn't running yet and return its port.
    ///
    /// Safe to call from any number of threads: exactly one listener is ever
    /// bound, and late callers block until the first one finishes.
    pub fn ensure_started(&self) -> Result<u16, StartError> {
        if let Some(port) = self.current_port() {
            return Ok(port);
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            ShimState::Running(port) => return Ok(*port),
            ShimState::Failed(reason) => return Err(StartError::PreviouslyFailed(reason.clone())),
            ShimState::NotStarted | ShimState::Starting => {}
        }

        *state = ShimState::Starting;
        match self.start() {
            Ok(port) => {
                self.port.store(port, Ordering::Release);
                *state = ShimState::Running(port);
                tracing::info!(port, "Shim is running");
                Ok(port)
            }
            Err(e) => {
                tracing::error!(error = %e, "Shim failed to start");
                *state = ShimState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Port of the running shim, `None` if it isn't up yet. Never blocks.
    pub fn current_port(&self) -> Option<u16> {
        match self.port.load(Ordering::Acquire) {
            0 => None,
            port => Some(port),
        }
    }

    /// Snapshot of the lifecycle state. Blocks while a start is in progress.
    pub fn state(&self) -> ShimState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Base URL legacy literals are redirected to
    pub fn local_url(&self) -> Option<String> {
        self.current_port().map(|port| format!("http://127.0.0.1:{port}"))
    }

    fn start(&self) -> Result<u16, StartError> {
        let config = self.config.clone().ok_or(StartError::MissingConfig)?;
        let app_state = AppState::new(config).map_err(StartError::Client)?;
        let router = create_router(Arc::new(app_state));

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(StartError::Bind)?;
        listener.set_nonblocking(true).map_err(StartError::Bind)?;
        let port = listener.local_addr().map_err(StartError::Bind)?.port();

        let (ready_tx, ready_rx) = mpsc::channel::<io::Result<()>>();
        std::thread::Builder::new()
            .name("redirect-shim".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(SHIM_WORKER_THREADS)
                    .thread_name("redirect-shim-worker")
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(listener) {
                        Ok(listener) => listener,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));

                    if let Err(e) = axum::serve(listener, router).await {
                        tracing::error!(error = %e, "Shim listener stopped");
                    }
                });
            })
            .map_err(StartError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(port),
            Ok(Err(e)) => Err(StartError::Runtime(e)),
            Err(_) => Err(StartError::Runtime(io::Error::new(
                io::ErrorKind::Other,
                "shim thread exited before reporting readiness",
            ))),
        }
    }
}

impl Default for ShimHandle {
    fn default() -> Self {
        Self::unconfigured()
    }
}

impl UrlRoot for ShimHandle {
    fn base_url(&self) -> Result<String, MapperError> {
        let port = self
            .ensure_started()
            .map_err(|e| MapperError::from_source("local shim unavailable", e))?;
        Ok(format!("http://127.0.0.1:{port}"))
    }
}

/// Rewrite unit redirecting legacy skin literals to the lazily started shim
pub type SkinRedirectUnit = LdcTransform<LegacyUrlMapper<Arc<ShimHandle>>>;

/// Wire a fresh shim handle into a legacy URL rewrite unit.
///
/// Nothing is bound until the first matching literal is seen.
pub fn create_transform_unit(config: Option<ShimConfig>) -> SkinRedirectUnit {
    let handle = Arc::new(ShimHandle::with_config(config));
    LdcTransform::new(LegacyUrlMapper::new(handle))
}
