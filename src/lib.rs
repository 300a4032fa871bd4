//! Cadastre: Parcel Dataset Filter & Export Service
//!
//! An authenticated HTTP service over a semicolon-delimited table of land
//! parcels. Users filter parcels by land category, utility availability,
//! cadastral block and address, get summary statistics of the unit cadastral
//! value, and download matching rows as a spreadsheet.
//!
//! # Features
//!
//! - **Dataset Loading**: Local file or a public Yandex Disk share, cached with a TTL
//! - **Header Normalization**: Dirty source headers mapped to canonical names
//! - **Filtering**: Independent predicates ANDed over a row mask
//! - **Statistics**: Mean, min and max of the unit cadastral value
//! - **Address Search**: Case-insensitive substring lookup with a match limit
//! - **Export**: Single-sheet XLSX of the matching rows
//! - **Journals**: CSV query log and access-request list
//! - **Sessions**: bcrypt-verified logins with expiring bearer tokens
//!
//! # Example
//!
//! ```no_run
//! use cadastre::data::{parse_dataset, ColumnMapping, Utility};
//! use cadastre::query::{run_query, FilterSpec, UtilityFilter};
//!
//! let csv = std::fs::read("parcels.csv").unwrap();
//! let outcome = parse_dataset(&csv, &ColumnMapping::builtin()).unwrap();
//!
//! let filters = FilterSpec::new()
//!     .with_category("Земли населённых пунктов")
//!     .with_utility(Utility::Water, UtilityFilter::RequireTrue);
//!
//! let result = run_query(&outcome.dataset, &filters);
//! println!("{} parcels", result.row_count());
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod export;
pub mod journal;
pub mod query;

// Re-export commonly used types
pub use config::ServerConfig;
pub use data::{Dataset, LoadError, ParcelRecord, Value};
pub use query::{run_query, FilterSpec, QueryOutcome, QueryResult};
