use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::error::{ApiError, Result};
use crate::database::ProjectManager;

/// The device identity decoded from the encrypted device header.
#[derive(Clone)]
pub struct DeviceIdentity {
    pub id: String,
}

/// The manager identity established from a verified bearer token.
#[derive(Clone)]
pub struct ManagerIdentity {
    pub manager: ProjectManager,
}

#[derive(Default, Clone)]
pub struct ContextData {
    pub device: Option<DeviceIdentity>,
    pub manager: Option<ManagerIdentity>,
}

/// Per-request identity state, filled in by the auth middleware chain and
/// read by the handlers.
#[derive(Default, Clone)]
pub struct RequestContext(Arc<RwLock<ContextData>>);

impl RequestContext {
    pub async fn set_device(&self, identity: DeviceIdentity) {
        let mut guard = self.0.write().await;
        guard.device = Some(identity);
    }

    pub async fn set_manager(&self, identity: ManagerIdentity) {
        let mut guard = self.0.write().await;
        guard.manager = Some(identity);
    }

    pub async fn device(&self) -> Option<DeviceIdentity> {
        self.0.read().await.deref().device.clone()
    }

    pub async fn manager(&self) -> Option<ManagerIdentity> {
        self.0.read().await.deref().manager.clone()
    }

    pub async fn require_device(&self) -> Result<DeviceIdentity> {
        self.device().await.ok_or(ApiError::Unauthorized)
    }

    pub async fn require_manager(&self) -> Result<ManagerIdentity> {
        self.manager().await.ok_or(ApiError::Unauthorized)
    }
}
