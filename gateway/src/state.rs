//! 网关共享状态

use std::sync::Arc;

use gam_authz_core::{DecisionEngine, PolicyRepository};

/// 网关共享状态
///
/// 引擎持有策略门面；仓储句柄给管理面直接使用。
#[derive(Clone)]
pub struct AppState {
    pub engine: DecisionEngine,
    pub policies: Arc<dyn PolicyRepository>,
}
