//! `server.properties` helpers — declared-port read/patch and launch jar
//! discovery inside an instance directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{WorkspaceError, WorkspaceResult};

const PROPERTIES_FILE: &str = "server.properties";
const SERVER_PORT_KEY: &str = "server-port";
const QUERY_PORT_KEY: &str = "query.port";

/// Read the declared listen port from an instance directory.
///
/// Absent file, unreadable file, missing key, or an unparsable value all
/// mean "no declared port"; such an instance is never probed.
pub fn read_declared_port(dir: &Path) -> Option<u16> {
    let content = fs::read_to_string(dir.join(PROPERTIES_FILE)).ok()?;
    for line in content.lines() {
        if let Some(value) = line.strip_prefix(&format!("{SERVER_PORT_KEY}=")) {
            return value.trim().parse().ok();
        }
    }
    None
}

/// Rewrite the `server-port=` and `query.port=` lines to the allocated
/// port, appending either line when not already present.
///
/// A missing properties file is tolerated with a warning — the instance
/// will simply have no declared port.
pub fn patch_declared_port(dir: &Path, port: u16) -> WorkspaceResult<()> {
    let file = dir.join(PROPERTIES_FILE);
    if !file.exists() {
        warn!(dir = ?dir.file_name(), "missing server.properties, port not patched");
        return Ok(());
    }
    let content = fs::read_to_string(&file)?;
    let mut updated = Vec::with_capacity(content.lines().count() + 2);
    let mut replaced_server = false;
    let mut replaced_query = false;
    for line in content.lines() {
        if line.starts_with(&format!("{SERVER_PORT_KEY}=")) {
            updated.push(format!("{SERVER_PORT_KEY}={port}"));
            replaced_server = true;
        } else if line.starts_with(&format!("{QUERY_PORT_KEY}=")) {
            updated.push(format!("{QUERY_PORT_KEY}={port}"));
            replaced_query = true;
        } else {
            updated.push(line.to_string());
        }
    }
    if !replaced_query {
        updated.push(format!("{QUERY_PORT_KEY}={port}"));
    }
    if !replaced_server {
        updated.push(format!("{SERVER_PORT_KEY}={port}"));
    }
    fs::write(file, updated.join("\n") + "\n")?;
    Ok(())
}

/// Pick the launch executable: the lexicographically first regular file
/// with a `.jar` extension in the instance directory.
pub fn find_launch_jar(dir: &Path) -> WorkspaceResult<PathBuf> {
    let mut jars = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_jar = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"));
        if entry.file_type()?.is_file() && is_jar {
            jars.push(path);
        }
    }
    jars.sort();
    jars.into_iter()
        .next()
        .ok_or_else(|| WorkspaceError::NoLaunchJar(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn read_port_absent_file() {
        let d = dir();
        assert_eq!(read_declared_port(d.path()), None);
    }

    #[test]
    fn read_port_missing_or_bad_value() {
        let d = dir();
        fs::write(d.path().join(PROPERTIES_FILE), "motd=hi\n").unwrap();
        assert_eq!(read_declared_port(d.path()), None);

        fs::write(d.path().join(PROPERTIES_FILE), "server-port=notaport\n").unwrap();
        assert_eq!(read_declared_port(d.path()), None);
    }

    #[test]
    fn patch_replaces_existing_lines() {
        let d = dir();
        fs::write(
            d.path().join(PROPERTIES_FILE),
            "motd=hi\nserver-port=25565\nquery.port=25565\n",
        )
        .unwrap();

        patch_declared_port(d.path(), 30001).unwrap();

        let content = fs::read_to_string(d.path().join(PROPERTIES_FILE)).unwrap();
        assert!(content.contains("server-port=30001"));
        assert!(content.contains("query.port=30001"));
        assert!(content.contains("motd=hi"));
        assert!(!content.contains("25565"));
        assert_eq!(read_declared_port(d.path()), Some(30001));
    }

    #[test]
    fn patch_appends_missing_lines() {
        let d = dir();
        fs::write(d.path().join(PROPERTIES_FILE), "motd=hi\n").unwrap();

        patch_declared_port(d.path(), 30002).unwrap();

        assert_eq!(read_declared_port(d.path()), Some(30002));
        let content = fs::read_to_string(d.path().join(PROPERTIES_FILE)).unwrap();
        assert!(content.contains("query.port=30002"));
    }

    #[test]
    fn patch_tolerates_missing_file() {
        let d = dir();
        patch_declared_port(d.path(), 30003).unwrap();
        assert_eq!(read_declared_port(d.path()), None);
    }

    #[test]
    fn launch_jar_picks_first_lexicographic() {
        let d = dir();
        fs::write(d.path().join("zulu.jar"), b"z").unwrap();
        fs::write(d.path().join("alpha.JAR"), b"a").unwrap();
        fs::write(d.path().join("readme.txt"), b"t").unwrap();

        let jar = find_launch_jar(d.path()).unwrap();
        assert_eq!(jar.file_name().unwrap(), "alpha.JAR");
    }

    #[test]
    fn launch_jar_missing_fails() {
        let d = dir();
        fs::write(d.path().join("readme.txt"), b"t").unwrap();
        assert!(matches!(
            find_launch_jar(d.path()),
            Err(WorkspaceError::NoLaunchJar(_))
        ));
    }
}
