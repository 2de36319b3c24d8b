use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Named topic grouping for posts. `name` is unique and doubles as the display
// slug; channels are immutable once created.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Channel {
    pub fn new(name: String, description: Option<String>, created_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            icon_url: None,
            created_by,
            created_at: Utc::now(),
        }
    }
}
