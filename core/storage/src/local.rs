//! Local filesystem storage provider.
//!
//! Vaults live flat in one directory as `<root>/<env>.vault`. The directory
//! is created owner-only (0700) and every vault file is written owner-only
//! (0600). Replacement writes go to a sibling temp file which is synced and
//! renamed over the target, then the directory is synced.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::provider::StorageProvider;
use envsecrets_common::{EnvName, Error, Result};

/// Default vault directory, relative to the working directory.
pub const DEFAULT_VAULT_DIR: &str = ".envsecrets";

/// File extension of vault files.
pub const VAULT_EXTENSION: &str = "vault";

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Local filesystem storage provider.
pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    /// Create a provider rooted at `root`.
    ///
    /// The directory is not touched until the first vault is written, so
    /// existence probes have no side effects.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the vault files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the vault file for `env`.
    pub fn vault_path(&self, env: &EnvName) -> PathBuf {
        self.root
            .join(format!("{}.{}", env.as_str(), VAULT_EXTENSION))
    }

    fn ensure_root(&self) -> Result<()> {
        if self.root.is_dir() {
            return restrict_dir(&self.root);
        }
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        builder.create(&self.root)?;
        debug!("Created vault directory {}", self.root.display());
        Ok(())
    }

    fn temp_path(&self, target: &Path) -> PathBuf {
        let file_name = target
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("vault");
        self.root
            .join(format!(".{}.tmp.{}", file_name, Uuid::new_v4()))
    }
}

/// Open options for a new owner-only file that must not already exist.
fn owner_only_new_file() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    options
}

fn write_synced(mut file: File, data: &[u8]) -> io::Result<()> {
    file.write_all(data)?;
    file.sync_all()
}

/// Tighten an existing directory to owner-only access.
#[cfg(unix)]
fn restrict_dir(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)?.permissions().mode();
    if mode & 0o077 != 0 {
        fs::set_permissions(path, fs::Permissions::from_mode(DIR_MODE))?;
        debug!("Restricted vault directory {} to owner-only", path.display());
    }
    Ok(())
}

#[cfg(not(unix))]
fn restrict_dir(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> io::Result<()> {
    File::open(path)?.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn not_found(env: &EnvName, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::NotFound(format!("vault not found for environment {:?}", env.as_str()))
    } else {
        Error::Io(err)
    }
}

impl StorageProvider for LocalProvider {
    fn location(&self, env: &EnvName) -> String {
        self.vault_path(env).display().to_string()
    }

    fn exists(&self, env: &EnvName) -> Result<bool> {
        Ok(self.vault_path(env).is_file())
    }

    fn create(&self, env: &EnvName, data: &[u8]) -> Result<()> {
        self.ensure_root()?;
        let path = self.vault_path(env);

        let file = owner_only_new_file().open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                Error::AlreadyExists(format!("vault {} already exists", env))
            } else {
                Error::Io(e)
            }
        })?;

        if let Err(e) = write_synced(file, data) {
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }
        fsync_dir(&self.root)?;

        debug!("Created vault file {}", path.display());
        Ok(())
    }

    fn upload(&self, env: &EnvName, data: &[u8]) -> Result<()> {
        self.ensure_root()?;
        let path = self.vault_path(env);
        let temp = self.temp_path(&path);

        let written = owner_only_new_file()
            .open(&temp)
            .and_then(|file| write_synced(file, data))
            .and_then(|_| fs::rename(&temp, &path));

        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        fsync_dir(&self.root)?;

        debug!("Wrote vault file {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    fn download(&self, env: &EnvName) -> Result<Vec<u8>> {
        fs::read(self.vault_path(env)).map_err(|e| not_found(env, e))
    }

    fn delete(&self, env: &EnvName) -> Result<()> {
        let path = self.vault_path(env);
        fs::remove_file(&path).map_err(|e| not_found(env, e))?;
        debug!("Removed vault file {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(name: &str) -> EnvName {
        EnvName::new(name).unwrap()
    }

    #[test]
    fn test_flat_path_scheme() {
        let provider = LocalProvider::new("/tmp/x/.envsecrets");
        assert_eq!(
            provider.vault_path(&env("prod")),
            PathBuf::from("/tmp/x/.envsecrets/prod.vault")
        );
    }

    #[test]
    fn test_exists_has_no_side_effects() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".envsecrets");
        let provider = LocalProvider::new(&root);

        assert!(!provider.exists(&env("prod")).unwrap());
        assert!(!root.exists());
    }

    #[test]
    fn test_create_and_download() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path().join(".envsecrets"));

        provider.create(&env("prod"), b"{}").unwrap();

        assert!(provider.exists(&env("prod")).unwrap());
        assert_eq!(provider.download(&env("prod")).unwrap(), b"{}");
    }

    #[test]
    fn test_create_twice_fails() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path());

        provider.create(&env("prod"), b"first").unwrap();
        let result = provider.create(&env("prod"), b"second");

        assert!(matches!(result, Err(Error::AlreadyExists(_))));
        assert_eq!(provider.download(&env("prod")).unwrap(), b"first");
    }

    #[test]
    fn test_upload_replaces_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path());

        provider.create(&env("prod"), b"old").unwrap();
        provider.upload(&env("prod"), b"new content").unwrap();

        assert_eq!(provider.download(&env("prod")).unwrap(), b"new content");
        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["prod.vault".to_string()]);
    }

    #[test]
    fn test_download_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path());

        assert!(matches!(
            provider.download(&env("prod")),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(provider.delete(&env("prod")), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path());

        provider.create(&env("prod"), b"data").unwrap();
        provider.delete(&env("prod")).unwrap();

        assert!(!provider.exists(&env("prod")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".envsecrets");
        let provider = LocalProvider::new(&root);

        provider.create(&env("prod"), b"data").unwrap();
        let dir_mode = fs::metadata(&root).unwrap().permissions().mode() & 0o777;
        let file_mode = fs::metadata(provider.vault_path(&env("prod")))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
        assert_eq!(file_mode, 0o600);

        provider.upload(&env("prod"), b"data2").unwrap();
        let file_mode = fs::metadata(provider.vault_path(&env("prod")))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(file_mode, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_loose_directory_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".envsecrets");
        fs::create_dir(&root).unwrap();
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();
        let provider = LocalProvider::new(&root);

        provider.create(&env("prod"), b"data").unwrap();

        let dir_mode = fs::metadata(&root).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }
}
