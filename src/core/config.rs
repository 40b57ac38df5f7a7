// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Configuration file loading.
//!
//! The configuration is a JSON document with `architecture`, `paths`, and
//! `output` sections. A typed [`Config`] starts from defaults and is
//! updated from whatever keys the document supplies; unknown keys are
//! ignored.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::encoder::Endianness;

#[derive(Debug, Clone)]
pub struct Config {
    pub endianness: Endianness,
    pub word_size: u8,
    pub instruction_set: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub generate_lst: bool,
    pub generate_bin: bool,
    pub generate_hex: bool,
    pub generate_map: bool,
    pub enable_macros: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endianness: Endianness::Little,
            word_size: 32,
            instruction_set: None,
            output_dir: PathBuf::from("output/assembly_build"),
            generate_lst: true,
            generate_bin: true,
            generate_hex: true,
            generate_map: true,
            enable_macros: true,
        }
    }
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError {
            message: format!("cannot read config {}: {e}", path.display()),
        })?;
        let doc: Value = serde_json::from_str(&text).map_err(|e| ConfigError {
            message: format!("invalid config JSON in {}: {e}", path.display()),
        })?;
        let mut config = Config::default();
        config.update_from_value(&doc)?;
        Ok(config)
    }

    pub fn update_from_value(&mut self, doc: &Value) -> Result<(), ConfigError> {
        if let Some(arch) = doc.get("architecture") {
            if let Some(endianness) = arch.get("endianness").and_then(Value::as_str) {
                self.endianness = match endianness.to_ascii_lowercase().as_str() {
                    "little" => Endianness::Little,
                    "big" => Endianness::Big,
                    other => {
                        return Err(ConfigError {
                            message: format!("bad architecture.endianness '{other}'"),
                        })
                    }
                };
            }
            if let Some(word_size) = arch.get("word_size").and_then(Value::as_u64) {
                if word_size != 16 && word_size != 32 {
                    return Err(ConfigError {
                        message: format!("bad architecture.word_size {word_size}"),
                    });
                }
                self.word_size = word_size as u8;
            }
        }

        if let Some(paths) = doc.get("paths") {
            if let Some(path) = paths.get("instruction_set").and_then(Value::as_str) {
                self.instruction_set = Some(PathBuf::from(path));
            }
            if let Some(dir) = paths.get("output_dir").and_then(Value::as_str) {
                self.output_dir = PathBuf::from(dir);
            }
        }

        if let Some(output) = doc.get("output") {
            let read_bool = |key: &str, current: bool| {
                output.get(key).and_then(Value::as_bool).unwrap_or(current)
            };
            self.generate_lst = read_bool("generate_lst", self.generate_lst);
            self.generate_bin = read_bool("generate_bin", self.generate_bin);
            self.generate_hex = read_bool("generate_hex", self.generate_hex);
            self.generate_map = read_bool("generate_map", self.generate_map);
            self.enable_macros = read_bool("enable_macros", self.enable_macros);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_little_endian_with_all_outputs() {
        let config = Config::default();
        assert_eq!(config.endianness, Endianness::Little);
        assert_eq!(config.word_size, 32);
        assert!(config.generate_lst && config.generate_bin);
        assert!(config.generate_hex && config.generate_map);
        assert!(config.enable_macros);
    }

    #[test]
    fn updates_from_json_document() {
        let doc: Value = serde_json::from_str(
            r#"{
                "architecture": { "endianness": "big", "word_size": 16 },
                "paths": { "instruction_set": "isa.csv", "output_dir": "build" },
                "output": { "generate_hex": false, "enable_macros": false }
            }"#,
        )
        .unwrap();
        let mut config = Config::default();
        config.update_from_value(&doc).unwrap();
        assert_eq!(config.endianness, Endianness::Big);
        assert_eq!(config.word_size, 16);
        assert_eq!(config.instruction_set.as_deref(), Some(Path::new("isa.csv")));
        assert_eq!(config.output_dir, PathBuf::from("build"));
        assert!(!config.generate_hex);
        assert!(!config.enable_macros);
        // Untouched keys keep their defaults.
        assert!(config.generate_bin);
    }

    #[test]
    fn rejects_bad_endianness() {
        let doc: Value =
            serde_json::from_str(r#"{ "architecture": { "endianness": "middle" } }"#).unwrap();
        let mut config = Config::default();
        assert!(config.update_from_value(&doc).is_err());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let doc: Value = serde_json::from_str(r#"{ "logging": { "level": "debug" } }"#).unwrap();
        let mut config = Config::default();
        config.update_from_value(&doc).unwrap();
        assert_eq!(config.endianness, Endianness::Little);
    }
}
