use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::entity::notification::Model as NotificationModel;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: i32,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationModel> for NotificationResponse {
    fn from(model: NotificationModel) -> Self {
        Self {
            id: model.id,
            message: model.message,
            is_read: model.is_read,
            created_at: model.created_at,
        }
    }
}
