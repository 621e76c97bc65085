#![forbid(unsafe_code)]

//! The parameter mapping threaded through every pipeline stage.
//!
//! A `Parameters` value is never mutated in place by a stage. Stages read a
//! snapshot and hand back a delta; the runner folds deltas in with
//! [`Parameters::merged`], so keys only ever accumulate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const URL: &str = "url";
pub const DOWNLOAD_PATH: &str = "download_path";
pub const COOKIE_PATH: &str = "cookie_path";
pub const METADATA_PATH: &str = "metadata_path";
pub const ORIGINAL_FILENAME: &str = "original_filename";
pub const TO_PROCESS: &str = "to_process";
pub const INPUT_VIDEO_PATH: &str = "input_video_path";
pub const VIDEO_DOWNLOAD: &str = "video_download";
pub const UPLOADER: &str = "uploader";
pub const VIDEO_DATE: &str = "video_date";
pub const VIDEO_TITLE: &str = "video_title";
pub const EXT: &str = "ext";
pub const USERNAME: &str = "username";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Map<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used when assembling the initial mapping and
    /// stage deltas.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts `value` only when it is `Some`, leaving the key absent
    /// otherwise.
    #[must_use]
    pub fn with_opt<V: Into<Value>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Like [`get_str`](Self::get_str) but treats blank strings as absent.
    pub fn get_non_empty_str(&self, key: &str) -> Option<&str> {
        self.get_str(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns a new mapping holding every key of `self` overlaid with the
    /// keys of `delta`.
    #[must_use]
    pub fn merged(&self, delta: Parameters) -> Parameters {
        let mut merged = self.0.clone();
        merged.extend(delta.0);
        Parameters(merged)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.0)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
