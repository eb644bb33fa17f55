//! AppError 的 HTTP 响应映射

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gam_errors::AppError;
use tracing::error;

/// 网关侧错误包装
///
/// 授权拒绝不会走这里 (中间件直接返回通用拒绝响应)；
/// 这里只负责管理面与基础设施错误的 Problem Details 渲染。
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        (status, Json(self.0.to_problem_details())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
