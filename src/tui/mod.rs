//! TUI Module - RBAC management console
//!
//! Architecture:
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     UI LAYER (app.rs, widgets/)                     │
//! │  Pure rendering. Draws the focused screen from cache + local state. │
//! └─────────────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ Effects (mutate, invalidate, status, navigate)
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │           DOMAIN LAYER (events.rs, list.rs, detail.rs, nav.rs)      │
//! │  Key → Action dispatch. Synchronous per-screen reducers.            │
//! └─────────────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ QueryCache + AppMessage
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   CONNECTOR LAYER (runtime/)                        │
//! │  Executor. Async IO on tokio tasks over the RbacApi trait.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`ScreenHarness`] drives the same session headlessly against a
//! [`MockApi`](crate::api::MockApi) for tests.

mod app;
mod detail;
mod events;
mod harness;
mod list;
mod nav;
mod screen;
mod session;
mod state;
mod status;
mod theme;

pub mod runtime;
pub mod widgets;

use std::sync::Arc;

pub use app::TuiApp;
pub use detail::{DetailMode, DetailScreen};
pub use events::{dispatch, Action, DispatchContext};
pub use harness::{parse_key, ScreenHarness};
pub use list::{ListMode, ListScreen};
pub use nav::NavigationPath;
pub use screen::{Effect, MountToken, Navigation, Screen, ScreenSpec};
pub use session::{Session, Work};
pub use state::{ModeKind, Pagination, TabKind};
pub use status::{StatusKind, StatusMessage};
pub use theme::ConsoleTheme;

use crate::api::RbacApi;

/// Run the console starting at `start`
pub async fn run(api: Arc<dyn RbacApi>, start: ScreenSpec, page_size: usize) -> anyhow::Result<()> {
    tracing::info!(backend = api.name(), screen = ?start, page_size, "console started");
    let app = TuiApp::new(api, start, page_size);
    app.run().await
}
