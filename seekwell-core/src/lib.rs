//! Core engine for seekwell: keyword search over file trees (local or on
//! remote administrative shares) and over SQL Server data and schemas.
//!
//! The crate is organized around two orchestrators that drive a run from
//! validated parameters to a terminal [`RunStatus`]:
//!
//! - [`FileSearchOrchestrator`] walks configured folders, matching keywords
//!   line by line, connecting to `\\server\X$` shares first implicitly and
//!   then with explicit credentials.
//! - [`DatabaseSearchOrchestrator`] discovers user databases and their
//!   schemas, then runs parameterized per-table keyword queries and exact
//!   column-name matching.
//!
//! Both report progress through a [`ProgressSink`] and offer CSV export
//! through a [`ResultSink`], so frontends decide how lines are shown and
//! where files land. Failures inside a folder, database, or table are
//! downgraded to warnings; only invalid parameters or an unusable server
//! fail a whole run.

pub mod error;
pub mod export;
pub mod fswalk;
pub mod logging;
pub mod models;
pub mod mssql;
pub mod orchestrator;
pub mod progress;
pub mod share;

pub use error::{Result, SeekwellError};
pub use models::{
    ColumnDetail, ColumnNameResult, Credentials, DatabaseRunReport, DatabaseSearchParameters,
    FileMatch, FileRunReport, FileSearchParameters, KeywordDataResult, KeywordMatchMode,
    ParameterViolation, RunStatus, TableInfo,
};
pub use orchestrator::{DatabaseSearchOrchestrator, FileSearchOrchestrator};
pub use progress::{ProgressSink, ResultSink};
