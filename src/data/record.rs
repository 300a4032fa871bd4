use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::schema;
use super::value::{DataType, Value};

/// Utility services tracked per parcel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Utility {
    Water,
    Gas,
    Sewer,
    Heat,
    Electricity,
}

impl Utility {
    pub const ALL: [Utility; 5] = [
        Utility::Water,
        Utility::Gas,
        Utility::Sewer,
        Utility::Heat,
        Utility::Electricity,
    ];

    /// Canonical column holding this flag
    pub fn column(&self) -> &'static str {
        match self {
            Utility::Water => schema::WATER,
            Utility::Gas => schema::GAS,
            Utility::Sewer => schema::SEWER,
            Utility::Heat => schema::HEAT,
            Utility::Electricity => schema::ELECTRICITY,
        }
    }

    fn index(&self) -> usize {
        match self {
            Utility::Water => 0,
            Utility::Gas => 1,
            Utility::Sewer => 2,
            Utility::Heat => 3,
            Utility::Electricity => 4,
        }
    }
}

/// One land parcel
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRecord {
    pub number: Option<i64>,
    pub cadastral_block: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub utilities: [Option<bool>; 5],
    pub land_use: Option<String>,
    /// Present only when finite and non-negative
    pub unit_value: Option<f64>,
    /// Every cell of the source row, aligned with [`Dataset::columns`]
    pub cells: Vec<Value>,
}

impl ParcelRecord {
    pub fn utility(&self, utility: Utility) -> Option<bool> {
        self.utilities[utility.index()]
    }
}

/// The canonical parcel table. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<ParcelRecord>,
    categories: Vec<String>,
    addresses: Vec<String>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<ParcelRecord>) -> Self {
        let categories: BTreeSet<String> = records
            .iter()
            .filter_map(|r| r.category.clone())
            .collect();
        let addresses: BTreeSet<String> = records
            .iter()
            .filter_map(|r| r.address.clone())
            .collect();

        Self {
            columns,
            records,
            categories: categories.into_iter().collect(),
            addresses: addresses.into_iter().collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[ParcelRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted distinct land categories
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Sorted distinct addresses
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Inferred type of every column, merged over all rows
    pub fn schema(&self) -> Vec<(String, DataType)> {
        let mut types: HashMap<usize, DataType> = HashMap::new();
        for record in &self.records {
            for (idx, cell) in record.cells.iter().enumerate() {
                let dtype = DataType::from_value(cell);
                types
                    .entry(idx)
                    .and_modify(|t| *t = t.merge(&dtype))
                    .or_insert(dtype);
            }
        }

        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                (
                    name.clone(),
                    types.get(&idx).copied().unwrap_or(DataType::Null),
                )
            })
            .collect()
    }
}

#[cfg(test)]
impl ParcelRecord {
    /// A record with only the fields the query engine looks at
    pub(crate) fn new(category: impl Into<String>, unit_value: f64) -> Self {
        Self {
            number: None,
            cadastral_block: None,
            address: None,
            category: Some(category.into()),
            utilities: [None; 5],
            land_use: None,
            unit_value: Some(unit_value),
            cells: Vec::new(),
        }
    }

    pub(crate) fn with_utility(mut self, utility: Utility, value: bool) -> Self {
        self.utilities[utility.index()] = Some(value);
        self
    }

    pub(crate) fn with_block(mut self, block: impl Into<String>) -> Self {
        self.cadastral_block = Some(block.into());
        self
    }

    pub(crate) fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

#[cfg(test)]
impl Dataset {
    /// Build a dataset directly from records (no raw cells)
    pub(crate) fn from_records(records: Vec<ParcelRecord>) -> Self {
        Self::new(Vec::new(), records)
    }

    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_sorted_lookups() {
        let dataset = Dataset::from_records(vec![
            ParcelRecord::new("Б", 1.0).with_address("Street 12"),
            ParcelRecord::new("А", 2.0).with_address("Avenue 5"),
            ParcelRecord::new("Б", 3.0).with_address("Street 12"),
        ]);

        assert_eq!(dataset.categories(), ["А", "Б"]);
        assert_eq!(dataset.addresses(), ["Avenue 5", "Street 12"]);
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn test_utility_accessors() {
        let record = ParcelRecord::new("А", 1.0).with_utility(Utility::Gas, false);
        assert_eq!(record.utility(Utility::Gas), Some(false));
        assert_eq!(record.utility(Utility::Water), None);
    }

    #[test]
    fn test_schema_merges_cell_types() {
        let mut first = ParcelRecord::new("А", 1.0);
        first.cells = vec![Value::Int64(1), Value::String("x".into())];
        let mut second = ParcelRecord::new("А", 1.0);
        second.cells = vec![Value::Float64(2.5), Value::Null];

        let dataset = Dataset::new(vec!["a".into(), "b".into()], vec![first, second]);
        let schema = dataset.schema();
        assert_eq!(schema[0], ("a".to_string(), DataType::Float64));
        assert_eq!(schema[1], ("b".to_string(), DataType::String));
    }
}
