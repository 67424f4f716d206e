//! Role resolution through the access-control service.

use async_trait::async_trait;
use cl_02_access_control::AccessControlService;
use shared_types::{Address, RoleSnapshot};

use crate::ports::RoleResolver;

#[async_trait]
impl RoleResolver for AccessControlService {
    async fn resolve(&self, address: Address) -> RoleSnapshot {
        self.check_roles(address).await
    }
}
