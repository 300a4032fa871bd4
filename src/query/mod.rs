//! Filter-and-aggregate query engine
//!
//! A query is a pure function of an immutable [`Dataset`] and a
//! [`FilterSpec`]. It never mutates shared state, so concurrent queries over
//! the same dataset need no locking.

pub mod address;
pub mod aggregates;
pub mod filter;
pub mod predicate;

pub use address::{search_addresses, AddressSearch, DEFAULT_MATCH_LIMIT};
pub use aggregates::{summarize, ValueStats};
pub use filter::{FilterSpec, UtilityFilter, ALL_CATEGORIES};
pub use predicate::{build_combined_mask, predicates_for, Predicate, RowMask};

use crate::data::{Dataset, ParcelRecord};

/// Matching rows and the unit-value statistics over them
#[derive(Debug, Clone)]
pub struct QueryResult<'a> {
    pub records: Vec<&'a ParcelRecord>,
    /// None when none of the matching rows carries a unit value
    pub stats: Option<ValueStats>,
}

impl<'a> QueryResult<'a> {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }
}

/// Outcome of a query; an empty subset is its own state, never zero stats
#[derive(Debug, Clone)]
pub enum QueryOutcome<'a> {
    NoMatches,
    Matched(QueryResult<'a>),
}

impl<'a> QueryOutcome<'a> {
    pub fn row_count(&self) -> usize {
        match self {
            QueryOutcome::NoMatches => 0,
            QueryOutcome::Matched(result) => result.row_count(),
        }
    }

    pub fn records(&self) -> &[&'a ParcelRecord] {
        match self {
            QueryOutcome::NoMatches => &[],
            QueryOutcome::Matched(result) => &result.records,
        }
    }
}

/// Row mask of every active predicate of `spec`
pub fn matching_rows(dataset: &Dataset, spec: &FilterSpec) -> RowMask {
    let predicates = predicates_for(spec);
    build_combined_mask(dataset.records(), &predicates)
}

/// Filter the dataset and summarize the unit value over the subset
pub fn run_query<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> QueryOutcome<'a> {
    let mask = matching_rows(dataset, spec);
    if mask.none() {
        return QueryOutcome::NoMatches;
    }

    let mut records: Vec<&ParcelRecord> = Vec::with_capacity(mask.count());
    records.extend(mask.indices().into_iter().map(|i| &dataset.records()[i]));

    let stats = summarize(records.iter().map(|r| r.unit_value));
    QueryOutcome::Matched(QueryResult { records, stats })
}
