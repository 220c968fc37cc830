//! Path layout and directory operations under the system root.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{WorkspaceError, WorkspaceResult};

/// Cheap handle over the system root. All paths are derived, no state is
/// held beyond the root itself.
#[derive(Debug, Clone)]
pub struct FleetPaths {
    root: PathBuf,
}

impl FleetPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    pub fn template_dir(&self, name: &str) -> PathBuf {
        self.templates_dir().join(name)
    }

    pub fn template_config_file(&self, name: &str) -> PathBuf {
        self.template_dir(name).join("template.yml")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    pub fn instance_dir(&self, name: &str) -> PathBuf {
        self.tmp_dir().join(name)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.yml")
    }

    // ── Directory lifecycle ────────────────────────────────────────

    pub fn ensure_root(&self) -> WorkspaceResult<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn ensure_tmp(&self) -> WorkspaceResult<()> {
        fs::create_dir_all(self.tmp_dir())?;
        Ok(())
    }

    pub fn ensure_template(&self, name: &str) -> WorkspaceResult<()> {
        fs::create_dir_all(self.template_dir(name))?;
        Ok(())
    }

    pub fn template_exists(&self, name: &str) -> bool {
        self.template_dir(name).exists()
    }

    pub fn instance_exists(&self, name: &str) -> bool {
        self.instance_dir(name).exists()
    }

    // ── Listings ───────────────────────────────────────────────────

    /// Template directory names, sorted. Empty when the templates dir
    /// does not exist yet.
    pub fn list_templates(&self) -> WorkspaceResult<Vec<String>> {
        list_subdirs(&self.templates_dir())
    }

    /// Instance directory names, sorted. Empty when the tmp dir does not
    /// exist yet.
    pub fn list_instances(&self) -> WorkspaceResult<Vec<String>> {
        list_subdirs(&self.tmp_dir())
    }

    // ── Copy & delete ──────────────────────────────────────────────

    /// Clone a template's payload into a fresh instance directory.
    pub fn copy_template_to_instance(
        &self,
        template: &str,
        instance: &str,
    ) -> WorkspaceResult<()> {
        let source = self.template_dir(template);
        if !source.exists() {
            return Err(WorkspaceError::TemplateNotFound(template.to_string()));
        }
        copy_dir_contents(&source, &self.instance_dir(instance))
    }

    pub fn delete_instance(&self, name: &str) -> WorkspaceResult<()> {
        remove_dir_if_exists(&self.instance_dir(name))
    }

    pub fn delete_tmp(&self) -> WorkspaceResult<()> {
        remove_dir_if_exists(&self.tmp_dir())
    }

    pub fn delete_template(&self, name: &str) -> WorkspaceResult<()> {
        remove_dir_if_exists(&self.template_dir(name))
    }
}

fn list_subdirs(dir: &Path) -> WorkspaceResult<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn copy_dir_contents(source: &Path, target: &Path) -> WorkspaceResult<()> {
    fs::create_dir_all(target)?;
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            WorkspaceError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::other("walk failed")
            }))
        })?;
        let path = entry.path();
        if path == source {
            continue;
        }
        // WalkDir yields paths under `source`, so strip_prefix cannot fail.
        let relative = path.strip_prefix(source).expect("walked path under source");
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &destination)?;
        }
    }
    Ok(())
}

fn remove_dir_if_exists(dir: &Path) -> WorkspaceResult<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> (tempfile::TempDir, FleetPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = FleetPaths::new(dir.path());
        (dir, paths)
    }

    #[test]
    fn listings_are_empty_before_creation() {
        let (_dir, paths) = paths();
        assert!(paths.list_templates().unwrap().is_empty());
        assert!(paths.list_instances().unwrap().is_empty());
    }

    #[test]
    fn listings_are_sorted_and_skip_files() {
        let (_dir, paths) = paths();
        paths.ensure_template("lobby").unwrap();
        paths.ensure_template("arena").unwrap();
        fs::write(paths.templates_dir().join("stray.txt"), "x").unwrap();

        assert_eq!(paths.list_templates().unwrap(), vec!["arena", "lobby"]);
    }

    #[test]
    fn copy_clones_nested_payload() {
        let (_dir, paths) = paths();
        paths.ensure_template("lobby").unwrap();
        let template = paths.template_dir("lobby");
        fs::write(template.join("server.jar"), b"jar").unwrap();
        fs::create_dir_all(template.join("world/region")).unwrap();
        fs::write(template.join("world/region/r.0.mca"), b"chunk").unwrap();

        paths.copy_template_to_instance("lobby", "lobby-1").unwrap();

        let instance = paths.instance_dir("lobby-1");
        assert!(instance.join("server.jar").exists());
        assert!(instance.join("world/region/r.0.mca").exists());
        assert_eq!(paths.list_instances().unwrap(), vec!["lobby-1"]);
    }

    #[test]
    fn copy_missing_template_fails() {
        let (_dir, paths) = paths();
        let err = paths.copy_template_to_instance("ghost", "ghost-1").unwrap_err();
        assert!(matches!(err, WorkspaceError::TemplateNotFound(name) if name == "ghost"));
    }

    #[test]
    fn delete_instance_and_tmp() {
        let (_dir, paths) = paths();
        paths.ensure_template("lobby").unwrap();
        paths.copy_template_to_instance("lobby", "lobby-1").unwrap();
        paths.copy_template_to_instance("lobby", "lobby-2").unwrap();

        paths.delete_instance("lobby-1").unwrap();
        assert_eq!(paths.list_instances().unwrap(), vec!["lobby-2"]);

        paths.delete_tmp().unwrap();
        assert!(paths.list_instances().unwrap().is_empty());

        // Deleting what is already gone is a no-op.
        paths.delete_instance("lobby-1").unwrap();
        paths.delete_tmp().unwrap();
    }

    #[test]
    fn delete_template_removes_payload() {
        let (_dir, paths) = paths();
        paths.ensure_template("lobby").unwrap();
        fs::write(paths.template_dir("lobby").join("server.jar"), b"jar").unwrap();

        paths.delete_template("lobby").unwrap();
        assert!(!paths.template_exists("lobby"));
        paths.delete_template("lobby").unwrap();
    }
}
