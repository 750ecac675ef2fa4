//! The two search orchestrators.
//!
//! Both modes share one shape: validate parameters, enumerate containers
//! (drives/folders or databases/tables), delegate to the traversal or query
//! component, downgrade per-container failures to warnings, and honor the
//! run's single cancellation token at every checkpoint. Cancellation always
//! wins: once observed, the run transitions to `Cancelled` and nothing else
//! is appended. Containers are processed strictly sequentially so progress
//! ordering stays deterministic and connection usage stays bounded.

mod database;
mod files;

pub use database::DatabaseSearchOrchestrator;
pub use files::FileSearchOrchestrator;
