//! Self-destructing pastebin service.
//!
//! Pastes are created with an optional time-to-live and view limit, and are
//! removed once either runs out. The view protocol lives in
//! [`application::lifecycle`]; everything under [`infrastructure`] adapts a
//! key-value store to it.

pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod state;

pub use app::build_router;
pub use application::lifecycle::{LifecycleEngine, ViewResult};
pub use domain::errors::{PasteError, StoreError};
pub use domain::paste::{Paste, PasteView};
pub use state::AppState;
