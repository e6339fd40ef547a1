use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use toml::map::Map;
use toml::Value;

use crate::gemini::{
    GeminiSettings, DEFAULT_API_BASE_URL, DEFAULT_IMAGE_SIZE, DEFAULT_MODEL, IMAGE_SIZES,
};

const DEFAULT_PORT: i64 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_KEY_ENV: &str = "GEMINI_API_KEY";
const DEFAULT_KEY_FILE: &str = "api_key.txt";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug)]
pub struct ConfigStore {
    pub path: PathBuf,
    doc: Value,
}

impl ConfigStore {
    /// Loads the file, filling in and persisting defaults. A missing file is
    /// created.
    pub fn new(path: PathBuf) -> Result<Self> {
        let doc = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("failed to parse TOML: {}", path.display()))?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create config directory: {}", parent.display())
                })?;
            }
            Value::Table(Map::new())
        };

        let mut store = Self { path, doc };
        store.normalize_doc();
        store.save()?;
        Ok(store)
    }

    pub fn save(&self) -> Result<()> {
        let text = toml::to_string_pretty(&self.doc).context("failed to serialize TOML")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write config: {}", self.path.display()))
    }

    pub fn server_port(&self) -> u16 {
        self.table("app")
            .and_then(|t| t.get("server_port"))
            .and_then(value_to_i64)
            .and_then(|v| u16::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_PORT as u16)
    }

    pub fn log_level(&self) -> String {
        self.string_or("app", "log_level", DEFAULT_LOG_LEVEL)
    }

    pub fn api_base_url(&self) -> String {
        self.string_or("provider", "api_base_url", DEFAULT_API_BASE_URL)
    }

    pub fn model(&self) -> String {
        self.string_or("provider", "model", DEFAULT_MODEL)
    }

    pub fn image_size(&self) -> String {
        self.string_or("provider", "image_size", DEFAULT_IMAGE_SIZE)
    }

    pub fn api_key_env(&self) -> Option<String> {
        Some(self.string_or("provider", "api_key_env", "")).filter(|v| !v.is_empty())
    }

    /// Key file path; relative paths resolve against the config directory.
    pub fn api_key_file(&self) -> Option<PathBuf> {
        let raw = self.string_or("provider", "api_key_file", "");
        if raw.is_empty() {
            return None;
        }
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            return Some(path);
        }
        Some(self.config_dir().join(path))
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            api_base_url: self.api_base_url(),
            model: self.model(),
        }
    }

    fn config_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn string_or(&self, table: &str, key: &str, fallback: &str) -> String {
        self.table(table)
            .and_then(|t| t.get(key))
            .and_then(Value::as_str)
            .map(str::trim)
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| fallback.to_string())
    }

    fn normalize_doc(&mut self) {
        if !self.doc.is_table() {
            self.doc = Value::Table(Map::new());
        }

        {
            let app = self.ensure_table_mut("app");

            let port = app
                .get("server_port")
                .and_then(value_to_i64)
                .filter(|v| (1..=65_535).contains(v))
                .unwrap_or(DEFAULT_PORT);
            app.insert("server_port".to_string(), Value::Integer(port));

            let level = app
                .get("log_level")
                .and_then(Value::as_str)
                .map(|v| v.trim().to_ascii_lowercase())
                .filter(|v| LOG_LEVELS.contains(&v.as_str()))
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
            app.insert("log_level".to_string(), Value::String(level));
        }

        {
            let provider = self.ensure_table_mut("provider");

            let base_url = provider
                .get("api_base_url")
                .and_then(Value::as_str)
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| v.starts_with("http://") || v.starts_with("https://"))
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
            provider.insert("api_base_url".to_string(), Value::String(base_url));

            let model = provider
                .get("model")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_MODEL)
                .to_string();
            provider.insert("model".to_string(), Value::String(model));

            let size = provider
                .get("image_size")
                .and_then(Value::as_str)
                .map(|v| v.trim().to_ascii_uppercase())
                .filter(|v| IMAGE_SIZES.contains(&v.as_str()))
                .unwrap_or_else(|| DEFAULT_IMAGE_SIZE.to_string());
            provider.insert("image_size".to_string(), Value::String(size));

            if provider.get("api_key_env").and_then(Value::as_str).is_none() {
                provider.insert(
                    "api_key_env".to_string(),
                    Value::String(DEFAULT_KEY_ENV.to_string()),
                );
            }

            if provider.get("api_key_file").and_then(Value::as_str).is_none() {
                provider.insert(
                    "api_key_file".to_string(),
                    Value::String(DEFAULT_KEY_FILE.to_string()),
                );
            }
        }
    }

    fn table(&self, name: &str) -> Option<&Map<String, Value>> {
        self.doc
            .as_table()
            .and_then(|root| root.get(name))
            .and_then(Value::as_table)
    }

    fn root_table_mut(&mut self) -> &mut Map<String, Value> {
        if !self.doc.is_table() {
            self.doc = Value::Table(Map::new());
        }
        match &mut self.doc {
            Value::Table(root) => root,
            _ => unreachable!("root is a table after normalization"),
        }
    }

    fn ensure_table_mut(&mut self, name: &str) -> &mut Map<String, Value> {
        let root = self.root_table_mut();
        let table = root
            .entry(name.to_string())
            .or_insert_with(|| Value::Table(Map::new()));
        if !table.is_table() {
            *table = Value::Table(Map::new());
        }
        match table {
            Value::Table(table) => table,
            _ => unreachable!("entry is a table after normalization"),
        }
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    value
        .as_integer()
        .or_else(|| value.as_float().map(|v| v as i64))
        .or_else(|| value.as_str().and_then(|v| v.trim().parse::<i64>().ok()))
}
