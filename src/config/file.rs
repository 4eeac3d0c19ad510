//! JSON file configuration.
//!
//! Sections nest as objects, so `monitor.max_events` reads
//! `{"monitor": {"max_events": 500}}`. A missing file is an empty config.

use std::path::PathBuf;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::ConfigResult;
use super::provider::ConfigProvider;

pub struct FileConfigProvider {
    path: PathBuf,
    data: RwLock<Option<Map<String, Value>>>,
}

impl FileConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn load(&self) -> ConfigResult<Map<String, Value>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Map::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, data: &Map<String, Value>) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(data)?).await?;
        Ok(())
    }

    /// Drop the cached contents so the next read hits the file again.
    pub async fn reload(&self) -> ConfigResult<()> {
        let fresh = self.load().await?;
        *self.data.write().await = Some(fresh);
        Ok(())
    }

    async fn with_data<R>(&self, f: impl FnOnce(&Map<String, Value>) -> R) -> ConfigResult<R> {
        {
            let data = self.data.read().await;
            if let Some(map) = data.as_ref() {
                return Ok(f(map));
            }
        }
        self.reload().await?;
        let data = self.data.read().await;
        Ok(f(data.as_ref().unwrap_or(&Map::new())))
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let first = map.get(parts.next()?)?;
    parts.try_fold(first, |value, part| value.get(part))
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", prefix, k)
                };
                flatten(&key, v, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

#[async_trait::async_trait]
impl ConfigProvider for FileConfigProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        self.with_data(|map| match lookup(map, key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(v) => Some(v.to_string()),
        })
        .await
    }

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        self.with_data(|_| ()).await?;
        let mut data = self.data.write().await;
        let map = data.get_or_insert_with(Map::new);

        let json_value = serde_json::from_str(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        let mut target = &mut *map;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            let entry = target
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                unreachable!("entry was just made an object");
            };
            target = next;
        }
        target.insert(leaf.to_string(), json_value);

        self.save(map).await
    }

    async fn delete(&self, key: &str) -> ConfigResult<bool> {
        self.with_data(|_| ()).await?;
        let mut data = self.data.write().await;
        let Some(map) = data.as_mut() else {
            return Ok(false);
        };

        let removed = match key.rsplit_once('.') {
            Some((parents, leaf)) => {
                let mut target = Some(&mut *map);
                for part in parents.split('.') {
                    target = target
                        .and_then(|m| m.get_mut(part))
                        .and_then(Value::as_object_mut);
                }
                target.and_then(|m| m.remove(leaf)).is_some()
            }
            None => map.remove(key).is_some(),
        };

        if removed {
            self.save(map).await?;
        }
        Ok(removed)
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        self.with_data(|map| {
            let mut keys = Vec::new();
            flatten("", &Value::Object(map.clone()), &mut keys);
            keys.retain(|k| k.starts_with(prefix));
            keys.sort();
            keys
        })
        .await
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .finish()
    }
}
