pub use app::{Action, AppState, ClubApp, RemoteWrite, Tab};
pub use auth::{provider_from_config, AccessToken, RefreshTokenFlow, StaticToken, TokenProvider};
pub use client::{SheetsApi, SheetsClient};
pub use config::{SheetLayout, SheetsConfig};
pub use error::{AuthFailure, Result, SheetsError};
pub use manager::{AutoSyncHandle, DataManager};
pub use model::*;
pub use permission::{Capability, PermissionConfig, Role, Session};

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod permission;
pub mod sheets;
pub mod stats;

#[cfg(test)]
mod testing;
