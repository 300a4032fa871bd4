//! Dataset loading
//!
//! Turns semicolon-delimited parcel text into a [`Dataset`]. Rows with the
//! wrong number of fields are skipped and counted rather than failing the
//! whole load. The bytes come either from a local file or from a public
//! Yandex Disk share.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::record::{Dataset, ParcelRecord, Utility};
use super::schema::{self, ColumnMapping};
use super::value::{parse_decimal, parse_flag, Value};

/// Yandex Disk endpoint that resolves a public share into a download link
pub const YANDEX_DOWNLOAD_API: &str =
    "https://cloud-api.yandex.net/v1/disk/public/resources/download";

/// Result of parsing: the dataset plus the number of rows dropped
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub dataset: Dataset,
    pub skipped_rows: usize,
}

/// Where the raw dataset bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    LocalFile(PathBuf),
    YandexDisk { public_key: String },
}

impl DatasetSource {
    /// Public share URL for a Yandex Disk key (already a URL is kept as is)
    pub fn share_url(public_key: &str) -> String {
        if public_key.starts_with("http://") || public_key.starts_with("https://") {
            public_key.to_string()
        } else {
            format!("https://disk.yandex.ru/d/{}", public_key)
        }
    }
}

impl std::fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetSource::LocalFile(path) => write!(f, "file {}", path.display()),
            DatasetSource::YandexDisk { public_key } => {
                write!(f, "yandex disk {}", Self::share_url(public_key))
            }
        }
    }
}

#[derive(Deserialize)]
struct DownloadLink {
    href: String,
}

/// Fetches and parses the parcel dataset
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    source: DatasetSource,
    mapping: ColumnMapping,
    http_client: reqwest::Client,
    download_api: String,
}

impl DatasetLoader {
    pub fn new(source: DatasetSource, mapping: ColumnMapping) -> Result<Self, LoadError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LoadError::Fetch(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            source,
            mapping,
            http_client,
            download_api: YANDEX_DOWNLOAD_API.to_string(),
        })
    }

    /// Override the link-resolution endpoint
    #[cfg(test)]
    pub(crate) fn with_download_api(mut self, url: impl Into<String>) -> Self {
        self.download_api = url.into();
        self
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    /// Load and parse the dataset from the configured source
    pub async fn load(&self) -> Result<ParseOutcome, LoadError> {
        let bytes = match &self.source {
            DatasetSource::LocalFile(path) => read_local(path).await?,
            DatasetSource::YandexDisk { public_key } => self.fetch_remote(public_key).await?,
        };

        let outcome = parse_dataset(&bytes, &self.mapping)?;
        if outcome.skipped_rows > 0 {
            tracing::warn!(
                skipped = outcome.skipped_rows,
                "Skipped malformed rows while loading dataset from {}",
                self.source
            );
        }
        tracing::info!(
            rows = outcome.dataset.len(),
            columns = outcome.dataset.columns().len(),
            "Loaded dataset from {}",
            self.source
        );

        Ok(outcome)
    }

    async fn fetch_remote(&self, public_key: &str) -> Result<Vec<u8>, LoadError> {
        let share_url = DatasetSource::share_url(public_key);

        let response = self
            .http_client
            .get(&self.download_api)
            .query(&[("public_key", share_url.as_str())])
            .send()
            .await
            .map_err(|e| LoadError::Fetch(format!("Failed to resolve download link: {}", e)))?;

        if !response.status().is_success() {
            return Err(LoadError::Fetch(format!(
                "Download link request returned status {}",
                response.status()
            )));
        }

        let link: DownloadLink = response
            .json()
            .await
            .map_err(|e| LoadError::Fetch(format!("Invalid download link response: {}", e)))?;

        tracing::debug!(href = %link.href, "Resolved dataset download link");

        let response = self
            .http_client
            .get(&link.href)
            .send()
            .await
            .map_err(|e| LoadError::Fetch(format!("Failed to download dataset: {}", e)))?;

        if !response.status().is_success() {
            return Err(LoadError::Fetch(format!(
                "Dataset download returned status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoadError::Fetch(format!("Failed to read dataset body: {}", e)))?;

        Ok(bytes.to_vec())
    }
}

async fn read_local(path: &Path) -> Result<Vec<u8>, LoadError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LoadError::NotFound(path.display().to_string()))
        }
        Err(e) => Err(LoadError::Io(e)),
    }
}

/// Column positions of the canonical fields within a normalized header
struct ColumnIndex {
    number: Option<usize>,
    block: usize,
    address: usize,
    category: usize,
    utilities: [usize; 5],
    land_use: Option<usize>,
    unit_value: usize,
}

impl ColumnIndex {
    fn resolve(columns: &[String]) -> Result<Self, LoadError> {
        let find = |name: &str| columns.iter().position(|c| c == name);
        let require =
            |name: &str| find(name).ok_or_else(|| LoadError::MissingColumn(name.to_string()));

        for name in schema::REQUIRED_COLUMNS {
            require(name)?;
        }

        let mut utilities = [0usize; 5];
        for (slot, utility) in utilities.iter_mut().zip(Utility::ALL) {
            *slot = require(utility.column())?;
        }

        Ok(Self {
            number: find(schema::PARCEL_NUMBER),
            block: require(schema::CADASTRAL_BLOCK)?,
            address: require(schema::ADDRESS)?,
            category: require(schema::LAND_CATEGORY)?,
            utilities,
            land_use: find(schema::LAND_USE),
            unit_value: require(schema::UNIT_VALUE)?,
        })
    }
}

fn text_cell(row: &csv::StringRecord, idx: usize) -> Option<String> {
    row.get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_number(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        parse_decimal(trimmed)
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

/// Parse semicolon-delimited text into the canonical dataset
pub fn parse_dataset(bytes: &[u8], mapping: &ColumnMapping) -> Result<ParseOutcome, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| LoadError::Malformed(format!("Unreadable header: {}", e)))?
        .clone();

    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::Malformed("Dataset has no header row".to_string()));
    }

    let columns = mapping.normalize_all(headers.iter());
    let index = ColumnIndex::resolve(&columns)?;
    let forced_string: Vec<bool> = columns
        .iter()
        .map(|c| schema::STRING_COLUMNS.contains(&c.as_str()))
        .collect();

    let mut records = Vec::new();
    let mut skipped_rows = 0;

    for (line, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::debug!(row = line + 1, "Skipping unreadable row: {}", e);
                skipped_rows += 1;
                continue;
            }
        };

        if row.len() != columns.len() {
            tracing::debug!(
                row = line + 1,
                expected = columns.len(),
                found = row.len(),
                "Skipping row with wrong field count"
            );
            skipped_rows += 1;
            continue;
        }

        let mut utilities = [None; 5];
        for (slot, idx) in utilities.iter_mut().zip(index.utilities) {
            *slot = row.get(idx).and_then(parse_flag);
        }

        let cells = row
            .iter()
            .zip(&forced_string)
            .map(|(raw, force)| Value::from_cell(raw, *force))
            .collect();

        records.push(ParcelRecord {
            number: index.number.and_then(|i| row.get(i)).and_then(parse_number),
            cadastral_block: text_cell(&row, index.block),
            address: text_cell(&row, index.address),
            category: text_cell(&row, index.category),
            utilities,
            land_use: index.land_use.and_then(|i| text_cell(&row, i)),
            unit_value: row
                .get(index.unit_value)
                .and_then(parse_decimal)
                .filter(|v| *v >= 0.0),
            cells,
        });
    }

    Ok(ParseOutcome {
        dataset: Dataset::new(columns, records),
        skipped_rows,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Dataset file not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Malformed dataset: {0}")]
    Malformed(String),

    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(String),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{extract::State, routing::get, Json, Router};
    use std::sync::Arc;

    pub(crate) const HEADER: &str = "Номер;Код КЛАДР;Кадастровый квартал ;Адрес по КЛАДР;Категория земли;\
Наличие центрального водоснабжения ;Наличие центрального газоснабжения;\
Наличие центральной канализации;Наличие центрального теплоснабжения;\
Наличие центрального электроснабжения;Вид использования участка по документу;\
Удельный показатель кадастровой стоимости";

    pub(crate) fn sample_csv() -> String {
        [
            HEADER,
            "1;0100000100000;78:12:0305002;г. Санкт-Петербург, ул. Садовая, 1;Земли населённых пунктов;True;False;True;True;True;ИЖС;1000",
            "2;0100000100000;78:12:0305003;г. Санкт-Петербург, ул. Садовая, 12;Земли населённых пунктов;False;False;True;False;True;ИЖС;2000,5",
            "3;0200000000000;47:07:0101001;Ленинградская обл., д. Лесная;Земли лесного фонда;True;False;False;False;False;Лесной участок;500",
            "4;broken row;only three",
            "5;0200000000000;;Ленинградская обл., д. Лесная;Земли лесного фонда;;;;;;;",
        ]
        .join("\n")
    }

    #[test]
    fn test_parse_sample_dataset() {
        let outcome = parse_dataset(sample_csv().as_bytes(), &ColumnMapping::builtin()).unwrap();

        assert_eq!(outcome.skipped_rows, 1);
        assert_eq!(outcome.dataset.len(), 4);
        assert!(outcome
            .dataset
            .columns()
            .contains(&schema::LAND_CATEGORY.to_string()));
        assert!(outcome
            .dataset
            .columns()
            .contains(&schema::CADASTRAL_BLOCK.to_string()));

        let first = &outcome.dataset.records()[0];
        assert_eq!(first.number, Some(1));
        assert_eq!(first.cadastral_block.as_deref(), Some("78:12:0305002"));
        assert_eq!(first.utility(Utility::Water), Some(true));
        assert_eq!(first.utility(Utility::Gas), Some(false));
        assert_eq!(first.unit_value, Some(1000.0));

        let second = &outcome.dataset.records()[1];
        assert_eq!(second.unit_value, Some(2000.5));

        let last = &outcome.dataset.records()[3];
        assert_eq!(last.cadastral_block, None);
        assert_eq!(last.unit_value, None);
        assert_eq!(last.utility(Utility::Water), None);
    }

    #[test]
    fn test_string_columns_keep_leading_zeros() {
        let outcome = parse_dataset(sample_csv().as_bytes(), &ColumnMapping::builtin()).unwrap();
        let kladr = outcome.dataset.column_index(schema::KLADR_CODE).unwrap();
        assert_eq!(
            outcome.dataset.records()[0].cells[kladr],
            Value::String("0100000100000".to_string())
        );
        let number = outcome.dataset.column_index(schema::PARCEL_NUMBER).unwrap();
        assert_eq!(outcome.dataset.records()[0].cells[number], Value::Int64(1));
    }

    #[test]
    fn test_loading_is_idempotent() {
        let text = sample_csv();
        let mapping = ColumnMapping::builtin();
        let first = parse_dataset(text.as_bytes(), &mapping).unwrap();
        let second = parse_dataset(text.as_bytes(), &mapping).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_byte_order_mark_in_header() {
        let text = format!("\u{feff}{}", sample_csv());
        let outcome = parse_dataset(text.as_bytes(), &ColumnMapping::builtin()).unwrap();
        assert_eq!(outcome.dataset.records()[0].number, Some(1));
    }

    #[test]
    fn test_missing_required_column() {
        let text = "Номер;Адрес по КЛАДР\n1;ул. Садовая";
        let result = parse_dataset(text.as_bytes(), &ColumnMapping::builtin());
        assert!(matches!(result, Err(LoadError::MissingColumn(_))));
    }

    #[test]
    fn test_empty_input_is_malformed() {
        let result = parse_dataset(b"", &ColumnMapping::builtin());
        assert!(matches!(result, Err(LoadError::Malformed(_))));
    }

    #[test]
    fn test_text_cells_are_trimmed() {
        let text = format!(
            "{}\n1;0; 78:1 ; ул. А ;Земли лесного фонда ;1;1;1;1;1;ИЖС;5",
            HEADER
        );
        let outcome = parse_dataset(text.as_bytes(), &ColumnMapping::builtin()).unwrap();
        let record = &outcome.dataset.records()[0];
        assert_eq!(record.category.as_deref(), Some("Земли лесного фонда"));
        assert_eq!(record.address.as_deref(), Some("ул. А"));
        assert_eq!(record.cadastral_block.as_deref(), Some("78:1"));
        assert_eq!(outcome.dataset.categories(), ["Земли лесного фонда"]);
    }

    #[test]
    fn test_negative_unit_value_is_missing() {
        let text = format!(
            "{}\n1;0;78:1;ул. А;Земли;1;1;1;1;1;ИЖС;-5",
            HEADER
        );
        let outcome = parse_dataset(text.as_bytes(), &ColumnMapping::builtin()).unwrap();
        assert_eq!(outcome.dataset.records()[0].unit_value, None);
    }

    #[tokio::test]
    async fn test_load_missing_local_file() {
        let loader = DatasetLoader::new(
            DatasetSource::LocalFile(PathBuf::from("/nonexistent/parcels.csv")),
            ColumnMapping::builtin(),
        )
        .unwrap();
        let result = loader.load().await;
        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcels.csv");
        std::fs::write(&path, sample_csv()).unwrap();

        let loader =
            DatasetLoader::new(DatasetSource::LocalFile(path), ColumnMapping::builtin()).unwrap();
        let outcome = loader.load().await.unwrap();
        assert_eq!(outcome.dataset.len(), 4);
    }

    #[tokio::test]
    async fn test_load_from_public_share() {
        async fn resolve(State(base): State<Arc<String>>) -> Json<serde_json::Value> {
            Json(serde_json::json!({ "href": format!("{}/file.csv", base) }))
        }

        async fn file() -> String {
            sample_csv()
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = Router::new()
            .route("/download", get(resolve))
            .route("/file.csv", get(file))
            .with_state(Arc::new(base.clone()));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let loader = DatasetLoader::new(
            DatasetSource::YandexDisk {
                public_key: "DB_test".to_string(),
            },
            ColumnMapping::builtin(),
        )
        .unwrap()
        .with_download_api(format!("{}/download", base));

        let outcome = loader.load().await.unwrap();
        assert_eq!(outcome.dataset.len(), 4);
        assert_eq!(outcome.skipped_rows, 1);
    }

    #[test]
    fn test_share_url() {
        assert_eq!(
            DatasetSource::share_url("DB_EoNBlaIoLMg"),
            "https://disk.yandex.ru/d/DB_EoNBlaIoLMg"
        );
        assert_eq!(
            DatasetSource::share_url("https://disk.yandex.ru/d/x"),
            "https://disk.yandex.ru/d/x"
        );
    }
}
