use std::path::Path;

use anyhow::Context;
use serde_json::Value as JsonValue;

/// One entry of the seed file: a page to visit and the stem of the file to
/// write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seed {
    pub id: String,
    pub href: String,
    pub name: String,
}

impl Seed {
    /// Lenient decode. Keys match case-insensitively and the last one in the
    /// document wins, anything that is not a string is left empty.
    pub fn from_json(value: &JsonValue) -> Self {
        let mut seed = Seed::default();
        let Some(object) = value.as_object() else {
            tracing::warn!("seed entry is not an object: {}", value);
            return seed;
        };
        for (key, value) in object {
            let slot = match key.to_ascii_lowercase().as_str() {
                "id" => &mut seed.id,
                "href" => &mut seed.href,
                "name" => &mut seed.name,
                _ => continue,
            };
            match value.as_str() {
                Some(s) => *slot = s.to_owned(),
                None => tracing::warn!(key, "seed field is not a string: {}", value),
            }
        }
        seed
    }
}

/// Reads the seed file at `path`.
///
/// Failing to read the file is an error; everything after that is
/// best-effort. A document that is not valid JSON or not an array yields an
/// empty list.
pub fn load(path: &Path) -> anyhow::Result<Vec<Seed>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read seed file '{}'", path.display()))?;
    Ok(decode(&bytes))
}

pub fn decode(bytes: &[u8]) -> Vec<Seed> {
    let document: JsonValue = match serde_json::from_slice(bytes) {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!("seed file is not valid JSON: {}", err);
            return Vec::new();
        }
    };
    match document.as_array() {
        Some(entries) => entries.iter().map(Seed::from_json).collect(),
        None => {
            tracing::warn!("seed file is not a JSON array");
            Vec::new()
        }
    }
}
