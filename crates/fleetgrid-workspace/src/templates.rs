//! TemplateStore — validated load/save of `template.yml`.
//!
//! Loads go through `serde_yaml::Value` rather than a derived struct so
//! that numeric fields written as quoted strings still parse (the on-disk
//! format predates this implementation) while genuinely missing or
//! malformed fields fail with a field-precise error.

use std::fs;

use fleet_core::TemplateSpec;
use serde_yaml::{Mapping, Value};

use crate::error::{WorkspaceError, WorkspaceResult};
use crate::paths::FleetPaths;

/// Disk-backed template spec store. Every call re-reads the filesystem.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    paths: FleetPaths,
}

impl TemplateStore {
    pub fn new(paths: FleetPaths) -> Self {
        Self { paths }
    }

    /// Load and validate a template's spec. All four numeric fields are
    /// required; the name is optional.
    pub fn load(&self, name: &str) -> WorkspaceResult<TemplateSpec> {
        let file = self.paths.template_config_file(name);
        if !file.exists() {
            return Err(WorkspaceError::MissingConfig(file));
        }
        let content = fs::read_to_string(&file)?;
        let value: Value = serde_yaml::from_str(&content)
            .map_err(|_| WorkspaceError::EmptyConfig(file.clone()))?;
        if value.is_null() {
            return Err(WorkspaceError::EmptyConfig(file));
        }
        Ok(TemplateSpec {
            name: read_string(&value, "templateName"),
            max_ram_mb: read_int(&value, "maxRamMb")?,
            max_players: read_int(&value, "maxPlayers")?,
            server_min: read_int(&value, "serverMin")?,
            server_max: read_int(&value, "serverMax")?,
        })
    }

    /// Write a template's spec, creating the template directory if needed.
    /// An empty name is omitted so it stays inferrable from the directory.
    pub fn save(&self, name: &str, spec: &TemplateSpec) -> WorkspaceResult<()> {
        let file = self.paths.template_config_file(name);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut data = Mapping::new();
        if let Some(explicit) = spec.explicit_name() {
            data.insert("templateName".into(), explicit.into());
        }
        data.insert("maxRamMb".into(), spec.max_ram_mb.into());
        data.insert("maxPlayers".into(), spec.max_players.into());
        data.insert("serverMin".into(), spec.server_min.into());
        data.insert("serverMax".into(), spec.server_max.into());
        let content = serde_yaml::to_string(&data)
            .map_err(|e| WorkspaceError::Serialize(e.to_string()))?;
        fs::write(file, content)?;
        Ok(())
    }

    /// Tolerant read of the spec an instance inherited through its payload
    /// copy. Any failure means "no identity" rather than an error: the
    /// aggregator falls back to name-derived data.
    pub fn load_instance_identity(&self, instance: &str) -> Option<TemplateSpec> {
        let file = self.paths.instance_dir(instance).join("template.yml");
        let content = fs::read_to_string(file).ok()?;
        let value: Value = serde_yaml::from_str(&content).ok()?;
        Some(TemplateSpec {
            name: read_string(&value, "templateName"),
            max_ram_mb: read_int(&value, "maxRamMb").ok()?,
            max_players: read_int(&value, "maxPlayers").ok()?,
            server_min: read_int(&value, "serverMin").ok()?,
            server_max: read_int(&value, "serverMax").ok()?,
        })
    }
}

fn read_int(value: &Value, field: &'static str) -> WorkspaceResult<i32> {
    match value.get(field) {
        None | Some(Value::Null) => Err(WorkspaceError::MissingField(field)),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| WorkspaceError::InvalidField {
                field,
                value: n.to_string(),
            }),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| WorkspaceError::InvalidField {
            field,
            value: s.clone(),
        }),
        Some(other) => Err(WorkspaceError::InvalidField {
            field,
            value: format!("{other:?}"),
        }),
    }
}

fn read_string(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FleetPaths, TemplateStore) {
        let dir = tempfile::tempdir().unwrap();
        let paths = FleetPaths::new(dir.path());
        let store = TemplateStore::new(paths.clone());
        (dir, paths, store)
    }

    fn spec(name: Option<&str>) -> TemplateSpec {
        TemplateSpec {
            name: name.map(str::to_string),
            max_ram_mb: 512,
            max_players: 20,
            server_min: 2,
            server_max: 4,
        }
    }

    #[test]
    fn save_then_load() {
        let (_dir, _paths, store) = store();
        store.save("lobby", &spec(Some("lobby"))).unwrap();

        let loaded = store.load("lobby").unwrap();
        assert_eq!(loaded, spec(Some("lobby")));
    }

    #[test]
    fn save_omits_empty_name() {
        let (_dir, paths, store) = store();
        store.save("lobby", &spec(None)).unwrap();

        let raw = fs::read_to_string(paths.template_config_file("lobby")).unwrap();
        assert!(!raw.contains("templateName"));
        assert!(store.load("lobby").unwrap().name.is_none());
    }

    #[test]
    fn load_missing_file_fails() {
        let (_dir, _paths, store) = store();
        assert!(matches!(
            store.load("ghost"),
            Err(WorkspaceError::MissingConfig(_))
        ));
    }

    #[test]
    fn load_missing_field_fails() {
        let (_dir, paths, store) = store();
        paths.ensure_template("lobby").unwrap();
        fs::write(
            paths.template_config_file("lobby"),
            "maxRamMb: 512\nmaxPlayers: 20\nserverMin: 1\n",
        )
        .unwrap();

        assert!(matches!(
            store.load("lobby"),
            Err(WorkspaceError::MissingField("serverMax"))
        ));
    }

    #[test]
    fn load_non_numeric_field_fails() {
        let (_dir, paths, store) = store();
        paths.ensure_template("lobby").unwrap();
        fs::write(
            paths.template_config_file("lobby"),
            "maxRamMb: lots\nmaxPlayers: 20\nserverMin: 1\nserverMax: 0\n",
        )
        .unwrap();

        assert!(matches!(
            store.load("lobby"),
            Err(WorkspaceError::InvalidField { field: "maxRamMb", .. })
        ));
    }

    #[test]
    fn load_accepts_quoted_numbers() {
        let (_dir, paths, store) = store();
        paths.ensure_template("lobby").unwrap();
        fs::write(
            paths.template_config_file("lobby"),
            "maxRamMb: \"512\"\nmaxPlayers: \"20\"\nserverMin: \"1\"\nserverMax: \"0\"\n",
        )
        .unwrap();

        let loaded = store.load("lobby").unwrap();
        assert_eq!(loaded.max_ram_mb, 512);
        assert_eq!(loaded.server_max, 0);
    }

    #[test]
    fn load_empty_file_fails() {
        let (_dir, paths, store) = store();
        paths.ensure_template("lobby").unwrap();
        fs::write(paths.template_config_file("lobby"), "").unwrap();

        assert!(matches!(
            store.load("lobby"),
            Err(WorkspaceError::EmptyConfig(_))
        ));
    }

    #[test]
    fn instance_identity_is_tolerant() {
        let (_dir, paths, store) = store();
        assert!(store.load_instance_identity("lobby-1").is_none());

        paths.ensure_template("lobby").unwrap();
        store.save("lobby", &spec(Some("lobby"))).unwrap();
        paths.copy_template_to_instance("lobby", "lobby-1").unwrap();

        let identity = store.load_instance_identity("lobby-1").unwrap();
        assert_eq!(identity.name.as_deref(), Some("lobby"));

        // Corrupt identity reads as absent, not as an error.
        fs::write(paths.instance_dir("lobby-1").join("template.yml"), "maxRamMb: {").unwrap();
        assert!(store.load_instance_identity("lobby-1").is_none());
    }
}
