//! Environment management.
//!
//! Environments are named variable sets, usually scoped to a workspace. Each
//! workspace has at most one active environment; activation is the only way
//! to make an environment active and it deactivates its siblings in the same
//! atomic step.
//!
//! # Example
//!
//! ```
//! use rest_workbench::environment::{EnvironmentStore, InMemoryEnvironmentStore, NewEnvironment};
//!
//! let store = InMemoryEnvironmentStore::new();
//! let dev = store
//!     .create(NewEnvironment::new("dev").in_workspace("ws-1").with_variable("baseUrl", "http://localhost"))
//!     .unwrap();
//! store.activate(&dev.id, None).unwrap();
//!
//! let active = store.get_active_for_workspace("ws-1").unwrap().unwrap();
//! assert_eq!(active.name, "dev");
//! ```

pub mod models;
pub mod store;

pub use models::{Environment, EnvironmentUpdate, NewEnvironment};
pub use store::{EnvironmentStore, InMemoryEnvironmentStore};
