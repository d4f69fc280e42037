//! Directory-backed metadata store using the dump1090 JSON block layout
//!
//! Aircraft entries are spread over `<prefix>.json` files. A block holds the
//! entries whose key starts with its prefix (stored without the prefix) and
//! may list longer prefixes in `children` when part of its range was split
//! off into a separate file.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{AircraftRecord, MetadataStore, OperatorRecord, TypeRecord};
use crate::error::MetadataError;

const TYPES_FILE: &str = "aircraft_types/icao_aircraft_types.json";
const OPERATORS_FILE: &str = "operators.json";
const OVERRIDES_FILE: &str = "overrides.json";

type Block = Arc<Map<String, Value>>;

pub struct JsonDb {
    root: PathBuf,
    /// Loaded blocks by prefix; `None` caches a missing file
    blocks: Mutex<HashMap<String, Option<Block>>>,
    types: Mutex<Option<Arc<HashMap<String, TypeRecord>>>>,
    operators: Mutex<Option<Arc<HashMap<String, OperatorRecord>>>>,
    overrides: Mutex<HashMap<String, AircraftRecord>>,
}

impl JsonDb {
    /// Open the database directory. Fails with
    /// [`MetadataError::DatabaseUnavailable`] when it is missing or not a
    /// directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, MetadataError> {
        let root = root.into();
        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(|e| MetadataError::DatabaseUnavailable {
                path: root.clone(),
                reason: e.to_string(),
            })?;
        if !meta.is_dir() {
            return Err(MetadataError::DatabaseUnavailable {
                path: root,
                reason: "not a directory".to_string(),
            });
        }

        let overrides: HashMap<String, AircraftRecord> =
            read_json(&root.join(OVERRIDES_FILE)).await?.unwrap_or_default();
        info!(
            "Metadata database at {} ({} overrides)",
            root.display(),
            overrides.len()
        );

        Ok(Self {
            root,
            blocks: Mutex::new(HashMap::new()),
            types: Mutex::new(None),
            operators: Mutex::new(None),
            overrides: Mutex::new(overrides),
        })
    }

    fn block_path(&self, prefix: &str) -> PathBuf {
        self.root.join(format!("{}.json", prefix))
    }

    async fn block(&self, prefix: &str) -> Result<Option<Block>, MetadataError> {
        let mut blocks = self.blocks.lock().await;
        if let Some(block) = blocks.get(prefix) {
            return Ok(block.clone());
        }

        let block = read_json::<Map<String, Value>>(&self.block_path(prefix))
            .await?
            .map(Arc::new);
        debug!("Loaded metadata block {} (present={})", prefix, block.is_some());
        blocks.insert(prefix.to_string(), block.clone());
        Ok(block)
    }

    async fn lookup_blocks(&self, key: &str) -> Result<Option<AircraftRecord>, MetadataError> {
        if !key.is_ascii() {
            return Ok(None);
        }

        let mut level = 1;
        while level < key.len() {
            let (prefix, rest) = key.split_at(level);
            let Some(block) = self.block(prefix).await? else {
                return Ok(None);
            };

            if let Some(entry) = block.get(rest) {
                return serde_json::from_value(entry.clone())
                    .map(Some)
                    .map_err(|source| MetadataError::Parse {
                        path: self.block_path(prefix),
                        source,
                    });
            }

            let child = &key[..level + 1];
            let split = block
                .get("children")
                .and_then(Value::as_array)
                .map_or(false, |c| c.iter().any(|v| v.as_str() == Some(child)));
            if !split {
                return Ok(None);
            }
            level += 1;
        }
        Ok(None)
    }

    async fn table<T: DeserializeOwned>(
        &self,
        slot: &Mutex<Option<Arc<HashMap<String, T>>>>,
        file: &str,
    ) -> Result<Arc<HashMap<String, T>>, MetadataError> {
        let mut slot = slot.lock().await;
        if let Some(table) = slot.as_ref() {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(read_json(&self.root.join(file)).await?.unwrap_or_default());
        *slot = Some(Arc::clone(&table));
        Ok(table)
    }
}

#[async_trait]
impl MetadataStore for JsonDb {
    async fn aircraft(&self, key: &str) -> Result<Option<AircraftRecord>, MetadataError> {
        let key = key.to_ascii_uppercase();
        let stored = self.lookup_blocks(&key).await?;
        let edited = self.overrides.lock().await.get(&key).cloned();

        Ok(match (edited, stored) {
            (Some(edited), Some(stored)) => Some(edited.overlaid_on(stored)),
            (edited, stored) => edited.or(stored),
        })
    }

    async fn aircraft_type(&self, designator: &str) -> Result<Option<TypeRecord>, MetadataError> {
        let types = self.table(&self.types, TYPES_FILE).await?;
        Ok(types.get(&designator.to_ascii_uppercase()).cloned())
    }

    async fn operator(&self, code: &str) -> Result<Option<OperatorRecord>, MetadataError> {
        let operators = self.table(&self.operators, OPERATORS_FILE).await?;
        Ok(operators.get(&code.to_ascii_uppercase()).cloned())
    }

    async fn store_aircraft(&self, key: &str, record: AircraftRecord) -> Result<(), MetadataError> {
        let mut overrides = self.overrides.lock().await;
        overrides.insert(key.to_ascii_uppercase(), record);

        let path = self.root.join(OVERRIDES_FILE);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&*overrides).map_err(MetadataError::Encode)?;
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|source| MetadataError::Io { path: tmp.clone(), source })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| MetadataError::Io { path: path.clone(), source })?;

        debug!("Stored metadata override for {}", key);
        Ok(())
    }
}

/// Read and decode a JSON file; a missing file is `Ok(None)`
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, MetadataError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| MetadataError::Parse {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(MetadataError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
