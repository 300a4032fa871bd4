pub mod cache;
pub mod loader;
pub mod record;
pub mod schema;
pub mod value;

pub use cache::{CacheStats, DatasetCache};
pub use loader::{parse_dataset, DatasetLoader, DatasetSource, LoadError, ParseOutcome};
pub use record::{Dataset, ParcelRecord, Utility};
pub use schema::{ColumnMapping, MappingError};
pub use value::{DataType, Value};
