//! Data models for PrepSquad entities.
//!
//! - `User`, `HealthStatus`: account and service status
//! - `Group`, `NewGroup`, `PrepType`, `RegistrationStatus`: study groups
//! - `Profile`, `ProfileUpdate`: user profiles
//!
//! Wire records (`GroupRecord`, `ProfileRecord`) accept any subset of fields
//! and are normalized into the domain types when a response is loaded.

pub mod group;
pub mod profile;
pub mod user;

pub use group::{
    CreateGroupRequest, Group, GroupRecord, NewGroup, PrepType, RegistrationStatus,
    DEFAULT_MAX_MEMBERS,
};
pub use profile::{Profile, ProfileRecord, ProfileUpdate};
pub use user::{HealthStatus, User};
