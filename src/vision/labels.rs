use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Static class index -> dish name table.
#[derive(Debug, Clone)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read class labels {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    /// Parses `{"0": "apple_pie", "1": "baby_back_ribs", ...}`. Indices must be
    /// contiguous from zero.
    pub fn from_json(raw: &str) -> Result<Self> {
        let map: HashMap<String, String> = serde_json::from_str(raw)?;

        let names = (0..map.len())
            .map(|i| {
                map.get(&i.to_string())
                    .cloned()
                    .ok_or_else(|| Error::config(format!("Class labels missing index {}", i)))
            })
            .collect::<Result<Vec<_>>>()?;

        let labels = Self { names };
        if labels.is_empty() {
            return Err(Error::config("Class labels are empty"));
        }
        Ok(labels)
    }

    pub fn name(&self, index: usize) -> Result<&str> {
        self.names.get(index).map(String::as_str).ok_or_else(|| {
            Error::model(format!(
                "Classifier predicted index {} but only {} labels are known",
                index,
                self.names.len()
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
