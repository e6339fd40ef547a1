use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::key_host::KeyCapability;

/// Blocks generation until the host reports a selected key.
///
/// A missing capability is not an error: checks report `false` and selection
/// requests only log a warning.
pub struct KeyGate {
    capability: Option<Arc<dyn KeyCapability>>,
    present: AtomicBool,
}

impl KeyGate {
    pub fn new(capability: Option<Arc<dyn KeyCapability>>) -> Self {
        Self {
            capability,
            present: AtomicBool::new(false),
        }
    }

    pub fn capability(&self) -> Option<Arc<dyn KeyCapability>> {
        self.capability.clone()
    }

    /// Last observed state, without asking the host again.
    pub fn is_open(&self) -> bool {
        self.present.load(Ordering::Acquire)
    }

    pub async fn check_key(&self) -> bool {
        let present = match &self.capability {
            Some(capability) => capability.has_selected_key().await,
            None => false,
        };
        self.present.store(present, Ordering::Release);
        tracing::debug!(present, "checked API key selection");
        present
    }

    pub async fn request_key_selection(&self) {
        let Some(capability) = &self.capability else {
            tracing::warn!("key selection is not available in this environment");
            return;
        };

        if let Err(err) = capability.open_key_selection().await {
            tracing::warn!("key selection flow failed: {err}");
        }
    }

    /// Runs the selection flow and re-checks, since the flow only reports
    /// completion.
    pub async fn select_and_verify(&self) -> bool {
        self.request_key_selection().await;
        self.check_key().await
    }

    pub fn invalidate(&self) {
        self.present.store(false, Ordering::Release);
    }
}
