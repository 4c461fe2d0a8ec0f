//! One aggregation run: fetch every source on a bounded worker pool, parse
//! each payload, then fold the results into the index on the calling thread.

use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;
use timetable_types::GroupRecord;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchError};
use crate::index::{IndexBuilder, TeacherIndex};
use crate::parser::{EventParser, ParseStats, ParsedPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Fetch(FetchError),
    /// Fetched, but neither a calendar nor a lesson list
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{e}"),
            Self::Unreadable(reason) => write!(f, "unreadable payload ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    pub source: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    /// Every source tried, in input order
    pub attempted: Vec<String>,
    pub skipped: Vec<SkippedSource>,
    pub parse: ParseStats,
}

impl AggregateReport {
    pub fn resolved(&self) -> usize {
        self.attempted.len() - self.skipped.len()
    }

    /// Sources the portal refused for lack of a session.
    pub fn auth_rejected(&self) -> Vec<String> {
        self.skipped
            .iter()
            .filter(|s| matches!(&s.reason, SkipReason::Fetch(e) if e.is_auth()))
            .map(|s| s.source.clone())
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct Aggregation {
    pub index: TeacherIndex,
    /// Parsed lessons per group code
    pub groups: BTreeMap<String, GroupRecord>,
    pub report: AggregateReport,
}

/// Fetch, parse and index every source.
///
/// Failing sources are skipped and listed in the report. The run fails only
/// when there is nothing to fetch or no source yields a payload.
pub fn aggregate<F>(fetcher: &F, sources: &[String], config: &Config) -> Result<Aggregation>
where
    F: Fetch + ?Sized,
{
    if sources.is_empty() {
        return Err(Error::NoSources);
    }

    let parser = EventParser::new(config);
    let workers = config.fan_out().min(sources.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("fetch-{i}"))
        .build()?;
    info!(sources = sources.len(), workers, "fetching sources");

    // Workers only fetch and parse; the index is folded below, in input order.
    let outcomes: Vec<std::result::Result<ParsedPayload, SkipReason>> = pool.install(|| {
        sources
            .par_iter()
            .map(|source| fetch_and_parse(fetcher, &parser, source))
            .collect()
    });

    let mut builder = IndexBuilder::default();
    let mut report = AggregateReport {
        attempted: sources.to_vec(),
        ..Default::default()
    };
    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome {
            Ok(parsed) => {
                info!(
                    source = %source,
                    group = %parsed.group,
                    lessons = parsed.lessons.len(),
                    "source parsed"
                );
                builder.add(source, parsed);
            }
            Err(reason) => {
                warn!(source = %source, %reason, "skipping source");
                report.skipped.push(SkippedSource {
                    source: source.clone(),
                    reason,
                });
            }
        }
    }

    if report.resolved() == 0 {
        let rejected = report.auth_rejected();
        return Err(if rejected.is_empty() {
            Error::NoSourcesResolved {
                attempted: report.attempted,
            }
        } else {
            Error::AuthenticationRequired { sources: rejected }
        });
    }

    report.parse = builder.stats;
    Ok(Aggregation {
        index: builder.index,
        groups: builder.groups,
        report,
    })
}

fn fetch_and_parse<F>(
    fetcher: &F,
    parser: &EventParser,
    source: &str,
) -> std::result::Result<ParsedPayload, SkipReason>
where
    F: Fetch + ?Sized,
{
    let payload = fetcher.fetch(source).map_err(SkipReason::Fetch)?;
    parser
        .parse_payload(source, &payload)
        .map_err(|e| SkipReason::Unreadable(e.to_string()))
}
