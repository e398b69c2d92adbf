use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::metrics::INTEGRITY_EVENTS_TOTAL;
use crate::core::time::now_utc;
use crate::domain::models::IntegrityEvent;
use crate::domain::types::IntegrityEventKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("permission denied: {0}")]
    Denied(String),
    #[error("device unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ProctoringError {
    #[error("Camera access is required to start this test ({0}). Allow camera access and try again.")]
    CameraDenied(PermissionError),
}

/// Host capabilities the monitor drives. A browser shell maps these onto
/// `getUserMedia` and the fullscreen API.
#[async_trait]
pub trait ProctoringEnvironment: Send + Sync {
    async fn request_camera(&self) -> Result<(), PermissionError>;
    async fn request_fullscreen(&self) -> Result<(), PermissionError>;
}

/// Environment with fixed answers. Used by the headless runner and tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticEnvironment {
    pub camera: bool,
    pub fullscreen: bool,
}

impl StaticEnvironment {
    pub fn permissive() -> Self {
        Self { camera: true, fullscreen: true }
    }
}

#[async_trait]
impl ProctoringEnvironment for StaticEnvironment {
    async fn request_camera(&self) -> Result<(), PermissionError> {
        if self.camera {
            Ok(())
        } else {
            Err(PermissionError::Denied("camera".to_string()))
        }
    }

    async fn request_fullscreen(&self) -> Result<(), PermissionError> {
        if self.fullscreen {
            Ok(())
        } else {
            Err(PermissionError::Unavailable("fullscreen".to_string()))
        }
    }
}

/// Best-effort lockdown plus a local integrity event log.
pub struct ProctoringMonitor {
    environment: Arc<dyn ProctoringEnvironment>,
    require_camera: bool,
    camera_granted: AtomicBool,
    fullscreen_active: AtomicBool,
    events: Mutex<Vec<IntegrityEvent>>,
}

impl ProctoringMonitor {
    pub fn new(environment: Arc<dyn ProctoringEnvironment>, require_camera: bool) -> Self {
        Self {
            environment,
            require_camera,
            camera_granted: AtomicBool::new(false),
            fullscreen_active: AtomicBool::new(false),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Camera gate checked before a session may enter InProgress. When the
    /// camera is optional a denial is only logged.
    pub async fn acquire_camera(&self) -> Result<(), ProctoringError> {
        match self.environment.request_camera().await {
            Ok(()) => {
                self.camera_granted.store(true, Ordering::SeqCst);
                tracing::info!("Camera access granted");
                Ok(())
            }
            Err(err) if self.require_camera => {
                tracing::warn!(error = %err, "Camera access denied; start blocked");
                Err(ProctoringError::CameraDenied(err))
            }
            Err(err) => {
                tracing::warn!(error = %err, "Camera access denied; continuing without camera");
                Ok(())
            }
        }
    }

    /// Never blocks the session. Returns whether fullscreen was entered.
    pub async fn enter_fullscreen(&self) -> bool {
        match self.environment.request_fullscreen().await {
            Ok(()) => {
                self.fullscreen_active.store(true, Ordering::SeqCst);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to enter fullscreen");
                false
            }
        }
    }

    pub fn record(&self, kind: IntegrityEventKind) {
        if kind == IntegrityEventKind::FullscreenExit {
            self.fullscreen_active.store(false, Ordering::SeqCst);
        }
        let event = IntegrityEvent { kind, at: now_utc() };
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
        metrics::counter!(INTEGRITY_EVENTS_TOTAL, "kind" => kind.as_str()).increment(1);
        tracing::debug!(kind = kind.as_str(), "Integrity event recorded");
    }

    /// Events in the order they were recorded.
    pub fn events(&self) -> Vec<IntegrityEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn camera_granted(&self) -> bool {
        self.camera_granted.load(Ordering::SeqCst)
    }

    pub fn fullscreen_active(&self) -> bool {
        self.fullscreen_active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(camera: bool, fullscreen: bool, require_camera: bool) -> ProctoringMonitor {
        ProctoringMonitor::new(Arc::new(StaticEnvironment { camera, fullscreen }), require_camera)
    }

    #[tokio::test]
    async fn required_camera_denial_blocks() {
        let monitor = monitor(false, true, true);
        let err = monitor.acquire_camera().await.unwrap_err();
        assert!(matches!(err, ProctoringError::CameraDenied(PermissionError::Denied(_))));
        assert!(err.to_string().contains("Allow camera access"));
        assert!(!monitor.camera_granted());
    }

    #[tokio::test]
    async fn optional_camera_denial_is_tolerated() {
        let monitor = monitor(false, true, false);
        assert!(monitor.acquire_camera().await.is_ok());
        assert!(!monitor.camera_granted());
    }

    #[tokio::test]
    async fn fullscreen_failure_does_not_error() {
        let monitor = monitor(true, false, true);
        monitor.acquire_camera().await.expect("camera");
        assert!(!monitor.enter_fullscreen().await);
        assert!(!monitor.fullscreen_active());
    }

    #[tokio::test]
    async fn events_keep_recording_order() {
        let monitor = monitor(true, true, true);
        assert!(monitor.enter_fullscreen().await);
        monitor.record(IntegrityEventKind::TabBlur);
        monitor.record(IntegrityEventKind::TabFocus);
        monitor.record(IntegrityEventKind::FullscreenExit);

        let kinds: Vec<_> = monitor.events().into_iter().map(|event| event.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IntegrityEventKind::TabBlur,
                IntegrityEventKind::TabFocus,
                IntegrityEventKind::FullscreenExit
            ]
        );
        assert!(!monitor.fullscreen_active());
    }
}
