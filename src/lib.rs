//! Per-teacher timetables aggregated from per-group schedule exports.
//!
//! Raw payloads (calendar exports or API JSON) are parsed into lessons,
//! teacher names are canonicalised, duplicates dropped, and the result is a
//! `TeacherIndex` that can be searched and rendered as a timetable grid.

pub mod aggregate;
pub mod calendar;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fetch;
pub mod grid;
pub mod index;
pub mod names;
pub mod parser;
pub mod search;
pub mod sources;
pub mod store;
pub mod subject;
pub mod teachers;

pub use aggregate::{AggregateReport, Aggregation, SkipReason, SkippedSource, aggregate};
pub use config::{Config, FetchConfig, ParityCodes, SourceFormat};
pub use error::{Error, Result};
pub use fetch::{Fetch, FetchError, HttpFetcher};
pub use grid::{TimetableGrid, build_grid};
pub use index::TeacherIndex;
pub use names::canonicalize;
pub use parser::{EventParser, ParseStats};
pub use search::{Resolution, resolve, search};
pub use timetable_types::{GroupRecord, Lesson, LessonEntry, WeekParity};
