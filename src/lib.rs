//! RBAC Console - terminal client for role-based access control
//!
//! Lists, inspects and edits roles, groups, users and workspaces over the
//! RBAC REST API, and seeds them in bulk from a payload file.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod seed;
pub mod tui;

pub use api::{create_api, HttpApi, MockApi, Mutation, Query, RbacApi};
pub use cache::{QueryCache, QueryKey};
pub use config::ConsoleConfig;
pub use error::{FixSuggestion, RbacError};
pub use model::{Entity, EntityKind};
pub use seed::{run_seed, SeedOutcome, SeedPayload, SeedSummary};
