//! Faceted search and relevance ranking for the beatmap queue service.
//!
//! A request travels through four stages:
//!
//! 1. [`model`] parses JSON (or a [`codec`] token) into a validated
//!    [`SearchSchema`], checked against the [`catalog`].
//! 2. [`plan`] composes one parameterized Postgres statement.
//! 3. [`service`] runs it through a [`SearchStore`] and paginates.
//! 4. [`service::dump`] trims records for the caller.
//!
//! This crate has no database driver; `mapqueue-postgres` supplies the store.

pub mod catalog;
pub mod codec;
pub mod error;
pub mod model;
pub mod plan;
pub mod ports;
pub mod service;

pub use catalog::{Category, FieldCatalog, ModelField, Scope};
pub use error::{Result, SearchError};
pub use model::{RawQuery, SearchSchema};
pub use plan::{SqlParam, Statement};
pub use ports::{SearchRow, SearchStore};
pub use service::{DumpMode, Pagination, SearchOptions, SearchOutcome, SearchService};
