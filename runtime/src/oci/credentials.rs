//! Registry credentials.
//!
//! Credentials saved by `a3s-imagetools login` live at
//! `~/.a3s/auth/credentials.json` (written atomically via tmp + rename).
//! Lookups fall back to the Docker CLI config (`~/.docker/config.json`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use a3s_imagetools_core::error::{Result, ToolsError};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Per-registry credential entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialEntry {
    username: String,
    password: String,
}

/// Persistent credential file format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    registries: HashMap<String, CredentialEntry>,
}

/// Subset of the Docker CLI config file holding inline credentials.
#[derive(Debug, Default, Deserialize)]
struct DockerConfigFile {
    #[serde(default)]
    auths: HashMap<String, DockerAuthEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct DockerAuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Persistent credential store for container registries.
pub struct CredentialStore {
    path: PathBuf,
    docker_config: Option<PathBuf>,
}

impl CredentialStore {
    /// Create a credential store at the default path (`~/.a3s/auth/credentials.json`),
    /// with the Docker CLI config as fallback.
    pub fn default_path() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            ToolsError::CredentialError(
                "Cannot determine home directory for credential store".to_string(),
            )
        })?;
        Ok(Self {
            path: home.join(".a3s").join("auth").join("credentials.json"),
            docker_config: Some(docker_config_path(&home)),
        })
    }

    /// Create a credential store at a custom path, without Docker fallback.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            docker_config: None,
        }
    }

    /// Also consult a Docker CLI config file on lookup.
    pub fn with_docker_config(mut self, path: PathBuf) -> Self {
        self.docker_config = Some(path);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store credentials for a registry. Overwrites existing entry.
    pub fn store(&self, registry: &str, username: &str, password: &str) -> Result<()> {
        let mut file = self.load()?;
        file.registries.insert(
            normalize_registry(registry),
            CredentialEntry {
                username: username.to_string(),
                password: password.to_string(),
            },
        );
        self.save(&file)
    }

    /// Get credentials for a registry. Returns `(username, password)`.
    ///
    /// The imagetools store wins over the Docker CLI config.
    pub fn get(&self, registry: &str) -> Result<Option<(String, String)>> {
        let key = normalize_registry(registry);
        let file = self.load()?;
        if let Some(entry) = file.registries.get(&key) {
            return Ok(Some((entry.username.clone(), entry.password.clone())));
        }
        match self.docker_config {
            Some(ref path) => docker_config_lookup(path, &key),
            None => Ok(None),
        }
    }

    /// Remove credentials for a registry. Returns true if entry existed.
    pub fn remove(&self, registry: &str) -> Result<bool> {
        let mut file = self.load()?;
        let removed = file
            .registries
            .remove(&normalize_registry(registry))
            .is_some();
        if removed {
            self.save(&file)?;
        }
        Ok(removed)
    }

    /// Load the credential file from disk. Returns empty if not found.
    fn load(&self) -> Result<CredentialFile> {
        if !self.path.exists() {
            return Ok(CredentialFile::default());
        }
        let data = std::fs::read_to_string(&self.path).map_err(|e| {
            ToolsError::CredentialError(format!(
                "Failed to read credential store {}: {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            ToolsError::CredentialError(format!(
                "Failed to parse credential store {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Save the credential file to disk atomically (write tmp, rename).
    fn save(&self, file: &CredentialFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ToolsError::CredentialError(format!(
                    "Failed to create credential store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let tmp_path = self.path.with_extension("tmp");
        let data = serde_json::to_string_pretty(file)?;
        std::fs::write(&tmp_path, &data).map_err(|e| {
            ToolsError::CredentialError(format!(
                "Failed to write credential store {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            ToolsError::CredentialError(format!(
                "Failed to rename credential store {} -> {}: {}",
                tmp_path.display(),
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

fn docker_config_path(home: &Path) -> PathBuf {
    match std::env::var_os("DOCKER_CONFIG") {
        Some(dir) => PathBuf::from(dir).join("config.json"),
        None => home.join(".docker").join("config.json"),
    }
}

/// Look up inline credentials in a Docker CLI config file.
///
/// Entries may be keyed by bare host or by URL (`https://index.docker.io/v1/`).
fn docker_config_lookup(path: &Path, key: &str) -> Result<Option<(String, String)>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path).map_err(|e| {
        ToolsError::CredentialError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let config: DockerConfigFile = serde_json::from_str(&data).map_err(|e| {
        ToolsError::CredentialError(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    let entry = config
        .auths
        .iter()
        .find(|(server, _)| normalize_registry(&strip_server_url(server)) == key)
        .map(|(_, entry)| entry);
    let Some(entry) = entry else {
        return Ok(None);
    };

    if let (Some(u), Some(p)) = (&entry.username, &entry.password) {
        return Ok(Some((u.clone(), p.clone())));
    }
    let Some(ref auth) = entry.auth else {
        return Ok(None);
    };
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth.trim())
        .map_err(|e| ToolsError::CredentialError(format!("Invalid auth entry for {}: {}", key, e)))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|e| ToolsError::CredentialError(format!("Invalid auth entry for {}: {}", key, e)))?;
    match decoded.split_once(':') {
        Some((u, p)) => Ok(Some((u.to_string(), p.to_string()))),
        None => Err(ToolsError::CredentialError(format!(
            "Invalid auth entry for {}: expected user:password",
            key
        ))),
    }
}

/// `https://index.docker.io/v1/` → `index.docker.io`
fn strip_server_url(server: &str) -> String {
    let s = server
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    s.split('/').next().unwrap_or(s).to_string()
}

/// Normalize registry names (e.g., "docker.io" and "index.docker.io" → "index.docker.io").
pub fn normalize_registry(registry: &str) -> String {
    let r = registry.trim().to_lowercase();
    if r == "docker.io" || r == "registry-1.docker.io" {
        "index.docker.io".to_string()
    } else {
        r
    }
}
