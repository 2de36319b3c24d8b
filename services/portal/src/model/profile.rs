//! Profile and role model definitions.
//!
//! # Purpose
//! Defines the per-identity profile row, the closed role enumeration, and the
//! roster entry shape returned by the admin API.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One profile per identity. `id` equals the identity store's subject and is
/// never assigned client-side.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub room_number: Option<String>,
    pub phone: Option<String>,
    pub batch: Option<String>,
    pub branch: Option<String>,
    pub avatar_url: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Fresh profile with self-service fields empty and approval pending.
    pub fn new(id: Uuid, email: String, full_name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            full_name,
            room_number: None,
            phone: None,
            batch: None,
            branch: None,
            avatar_url: None,
            emergency_contact: None,
            emergency_phone: None,
            is_approved: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update over the self-service profile fields. `None` leaves the
/// field unchanged; approval and role are not reachable from here.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub room_number: Option<String>,
    pub phone: Option<String>,
    pub batch: Option<String>,
    pub branch: Option<String>,
    pub avatar_url: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(full_name) = &self.full_name {
            profile.full_name = full_name.clone();
        }
        if let Some(room_number) = &self.room_number {
            profile.room_number = Some(room_number.clone());
        }
        if let Some(phone) = &self.phone {
            profile.phone = Some(phone.clone());
        }
        if let Some(batch) = &self.batch {
            profile.batch = Some(batch.clone());
        }
        if let Some(branch) = &self.branch {
            profile.branch = Some(branch.clone());
        }
        if let Some(avatar_url) = &self.avatar_url {
            profile.avatar_url = Some(avatar_url.clone());
        }
        if let Some(emergency_contact) = &self.emergency_contact {
            profile.emergency_contact = Some(emergency_contact.clone());
        }
        if let Some(emergency_phone) = &self.emergency_phone {
            profile.emergency_phone = Some(emergency_phone.clone());
        }
        profile.updated_at = Utc::now();
    }
}

/// Closed role enumeration. Every gated operation matches on this
/// exhaustively; roles are never compared as strings.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Steward,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Steward => "steward",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "member" => Some(Role::Member),
            "steward" => Some(Role::Steward),
            _ => None,
        }
    }
}

/// Profile joined with its resolved role, as listed by the admin roster.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RosterEntry {
    pub profile: Profile,
    pub role: Role,
}
