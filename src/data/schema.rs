//! Canonical column names and header normalization
//!
//! Upstream snapshots of the parcel table are inconsistent about column
//! spelling and whitespace. Every header goes through [`ColumnMapping::normalize`]
//! before any column is looked up by its canonical name.

use std::collections::HashMap;
use std::path::Path;

pub const PARCEL_NUMBER: &str = "Номер";
pub const CADASTRAL_BLOCK: &str = "Кадастровый квартал";
pub const KLADR_CODE: &str = "Код КЛАДР";
pub const ADDRESS: &str = "Адрес по КЛАДР";
pub const LAND_CATEGORY: &str = "Категория земель";
pub const WATER: &str = "Наличие центрального водоснабжения";
pub const GAS: &str = "Наличие центрального газоснабжения";
pub const SEWER: &str = "Наличие центральной канализации";
pub const HEAT: &str = "Наличие центрального теплоснабжения";
pub const ELECTRICITY: &str = "Наличие центрального электроснабжения";
pub const LAND_USE: &str = "Вид использования участка по документу";
pub const UNIT_VALUE: &str = "Удельный показатель кадастровой стоимости";

/// Columns kept as text even when they look numeric
pub const STRING_COLUMNS: [&str; 2] = [KLADR_CODE, CADASTRAL_BLOCK];

/// Columns the query engine cannot work without
pub const REQUIRED_COLUMNS: [&str; 9] = [
    LAND_CATEGORY,
    WATER,
    GAS,
    SEWER,
    HEAT,
    ELECTRICITY,
    CADASTRAL_BLOCK,
    ADDRESS,
    UNIT_VALUE,
];

/// Variants seen in upstream snapshots
const DEFAULT_RENAMES: &[(&str, &str)] = &[
    ("Категория земли", LAND_CATEGORY),
    ("категория земель", LAND_CATEGORY),
    ("Категория_земель", LAND_CATEGORY),
    ("Категория Земель", LAND_CATEGORY),
    ("Наличие центрального водоснабжения ", WATER),
    ("Наличие центрального газоснабжения ", GAS),
    ("Наличие центральной канализации ", SEWER),
    ("Наличие центрального теплоснабжения ", HEAT),
    ("Наличие центрального электроснабжения ", ELECTRICITY),
    ("Удельный показатель кадастровой стоимости ", UNIT_VALUE),
    ("Адрес по КЛАДР ", ADDRESS),
    ("Кадастровый квартал ", CADASTRAL_BLOCK),
];

/// Strip surrounding whitespace, a byte-order mark, and embedded line breaks
pub fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Rename table from header variants to canonical column names
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    renames: HashMap<String, String>,
}

impl ColumnMapping {
    /// Built-in mapping for the known upstream variants
    pub fn builtin() -> Self {
        let renames = DEFAULT_RENAMES
            .iter()
            .map(|(from, to)| (clean_header(from), to.to_string()))
            .filter(|(from, to)| from != to)
            .collect();
        Self { renames }
    }

    /// Create a mapping from explicit pairs, rejecting chained renames
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut mapping = Self {
            renames: HashMap::new(),
        };
        mapping.extend(pairs)?;
        Ok(mapping)
    }

    /// Add renames on top of the existing table
    pub fn extend<I, K, V>(&mut self, pairs: I) -> Result<(), MappingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut staged = self.renames.clone();
        for (from, to) in pairs {
            let from = clean_header(from.as_ref());
            let to = clean_header(to.as_ref());
            if from.is_empty() || to.is_empty() {
                return Err(MappingError::Empty);
            }
            if from != to {
                staged.insert(from, to);
            }
        }
        validate(&staged)?;
        self.renames = staged;
        Ok(())
    }

    /// Load extra renames from a JSON object file (`{"variant": "canonical"}`)
    /// and layer them over the built-in table
    pub fn builtin_with_file(path: &Path) -> Result<Self, MappingError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MappingError::Io(path.display().to_string(), e))?;
        let extra: HashMap<String, String> = serde_json::from_str(&text)?;

        let mut mapping = Self::builtin();
        mapping.extend(extra)?;
        Ok(mapping)
    }

    /// Normalize one header: clean it, then map a known variant to its
    /// canonical name. Unknown names pass through cleaned but otherwise
    /// unchanged.
    pub fn normalize(&self, raw: &str) -> String {
        let cleaned = clean_header(raw);
        match self.renames.get(&cleaned) {
            Some(canonical) => canonical.clone(),
            None => cleaned,
        }
    }

    pub fn normalize_all<'a, I>(&self, headers: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        headers.into_iter().map(|h| self.normalize(h)).collect()
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A rename target must never itself be renamed
fn validate(renames: &HashMap<String, String>) -> Result<(), MappingError> {
    for (from, to) in renames {
        if renames.contains_key(to) {
            return Err(MappingError::Chained {
                from: from.clone(),
                via: to.clone(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("Column mapping entries must not be empty")]
    Empty,

    #[error("Column mapping is chained: '{from}' maps to '{via}', which is itself renamed")]
    Chained { from: String, via: String },

    #[error("Failed to read column mapping {0}: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("Invalid column mapping JSON: {0}")]
    Json(#[from] serde_json::Error),
}
