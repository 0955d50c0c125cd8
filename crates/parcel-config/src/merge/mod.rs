//! Configuration lookup, fallback logic, and environment overrides

use camino::{Utf8Path, Utf8PathBuf};
use parcel_core::error::ParcelError;
use std::collections::HashMap;
use tracing::debug;

use crate::toml::{load_from_file, ParcelToml};
use crate::ConfigResult;

/// Project configuration file name
pub const CONFIG_FILE: &str = "parcel.toml";

/// Names the config file explicitly
pub const ENV_CONFIG: &str = "PARCEL_CONFIG";

/// Overrides the local repository root
pub const ENV_HOME: &str = "PARCEL_HOME";

/// Overrides the default archive type
pub const ENV_ARCHIVE: &str = "PARCEL_DEFAULT_ARCHIVE";

/// Main configuration loading interface
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Directory the upward search starts from
    cwd: Utf8PathBuf,
    /// `--config` on the command line
    explicit: Option<Utf8PathBuf>,
    /// `PARCEL_*` environment snapshot
    env: HashMap<String, String>,
    /// Home directory for the global config and `~` expansion
    home: Option<Utf8PathBuf>,
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// `--config` flag
    CommandLine(Utf8PathBuf),
    /// `$PARCEL_CONFIG`
    Environment(Utf8PathBuf),
    /// `parcel.toml` in the working directory or a parent
    Project(Utf8PathBuf),
    /// `~/.parcel/config.toml`
    Global(Utf8PathBuf),
    /// No file found
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            ConfigSource::CommandLine(path)
            | ConfigSource::Environment(path)
            | ConfigSource::Project(path)
            | ConfigSource::Global(path) => Some(path.as_path()),
            ConfigSource::Defaults => None,
        }
    }
}

impl ConfigLoader {
    /// Create a loader searching from `cwd` with an empty environment
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self {
            cwd,
            explicit: None,
            env: HashMap::new(),
            home: home_dir(),
        }
    }

    /// Create a loader for the current process: working directory and
    /// `PARCEL_*` variables
    pub fn from_environment() -> ConfigResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| ParcelError::io("Failed to read the working directory", e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| ParcelError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("working directory is not valid UTF-8: {}", e),
        })?;

        Ok(Self::new(cwd).with_env(ConfigLayering::collect_env_overrides()))
    }

    pub fn with_explicit(mut self, path: Option<Utf8PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_home(mut self, home: Option<Utf8PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn home(&self) -> Option<&Utf8Path> {
        self.home.as_deref()
    }

    /// Locate the configuration file.
    ///
    /// Order: `--config`, `$PARCEL_CONFIG`, `parcel.toml` here or in a
    /// parent directory, `~/.parcel/config.toml`. An explicitly named file
    /// must exist.
    pub fn locate(&self) -> ConfigResult<ConfigSource> {
        if let Some(path) = &self.explicit {
            return self.require(path, "--config").map(ConfigSource::CommandLine);
        }

        if let Some(path) = self.env.get(ENV_CONFIG) {
            let path = Utf8PathBuf::from(path);
            return self.require(&path, ENV_CONFIG).map(ConfigSource::Environment);
        }

        if let Some(path) = self.resolve_config_path(CONFIG_FILE) {
            return Ok(ConfigSource::Project(path));
        }

        if let Some(path) = self.global_config_path().filter(|path| path.is_file()) {
            return Ok(ConfigSource::Global(path));
        }

        Ok(ConfigSource::Defaults)
    }

    fn require(&self, path: &Utf8Path, origin: &str) -> ConfigResult<Utf8PathBuf> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        };

        if path.is_file() {
            Ok(path)
        } else {
            Err(ParcelError::ConfigValidation {
                field: origin.to_string(),
                reason: format!("config file {} does not exist", path),
            })
        }
    }

    /// Find `filename` in the working directory or its parents
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.is_file())
    }

    /// `~/.parcel/config.toml`
    pub fn global_config_path(&self) -> Option<Utf8PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(".parcel").join("config.toml"))
    }

    /// Default repository root: `~/.parcel/repository`, or
    /// `.parcel/repository` under the working directory without a home
    pub fn default_repository(&self) -> Utf8PathBuf {
        self.home
            .as_ref()
            .unwrap_or(&self.cwd)
            .join(".parcel")
            .join("repository")
    }

    /// Load the configuration and apply environment and command-line
    /// overrides
    pub async fn load(
        &self,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<(ParcelToml, ConfigSource)> {
        let source = self.locate()?;
        let config = match source.path() {
            Some(path) => {
                debug!("Loading configuration from {}", path);
                load_from_file(path).await?
            }
            None => {
                debug!("No configuration file found, using defaults");
                ParcelToml::default()
            }
        };

        let mut merged = ConfigLayering::merge_configs(config, &self.env, cli_overrides)?;

        // Relative paths are relative to the config file
        let base = source
            .path()
            .and_then(Utf8Path::parent)
            .unwrap_or(self.cwd.as_path());
        if let Some(path) = merged.repository.path.take() {
            merged.repository.path = Some(self.anchor(&path, base));
        }
        for site in &mut merged.sites {
            if let Some(path) = site.path.take() {
                site.path = Some(self.anchor(&path, base));
            }
        }

        Ok((merged, source))
    }

    fn anchor(&self, path: &Utf8Path, base: &Utf8Path) -> Utf8PathBuf {
        let path = crate::toml::expand_home(path, self.home());
        if path.is_absolute() {
            path
        } else {
            base.join(path)
        }
    }

    /// Repository root after overrides, falling back to the default
    pub fn repository_root(&self, config: &ParcelToml) -> Utf8PathBuf {
        config
            .repository_path(self.home())
            .unwrap_or_else(|| self.default_repository())
    }
}

/// Override layering for a loaded configuration
pub struct ConfigLayering;

impl ConfigLayering {
    /// Apply environment then command-line overrides; the command line
    /// wins
    pub fn merge_configs(
        config: ParcelToml,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<ParcelToml> {
        let mut merged = config;

        Self::apply_env_overrides(&mut merged, env_overrides);
        Self::apply_cli_overrides(&mut merged, cli_overrides);

        crate::toml::validate_config(&merged)?;
        Ok(merged)
    }

    fn apply_env_overrides(config: &mut ParcelToml, overrides: &HashMap<String, String>) {
        for (key, value) in overrides {
            match key.as_str() {
                ENV_HOME => config.repository.path = Some(Utf8PathBuf::from(value)),
                ENV_ARCHIVE => config.repository.default_archive = Some(value.clone()),
                _ => {}
            }
        }
    }

    fn apply_cli_overrides(config: &mut ParcelToml, overrides: &HashMap<String, String>) {
        for (key, value) in overrides {
            match key.as_str() {
                "repository" => config.repository.path = Some(Utf8PathBuf::from(value)),
                "default-archive" => config.repository.default_archive = Some(value.clone()),
                _ => {}
            }
        }
    }

    /// Collect `PARCEL_*` environment variables
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("PARCEL_"))
            .collect()
    }
}

fn home_dir() -> Option<Utf8PathBuf> {
    dirs::home_dir().and_then(|home| Utf8PathBuf::try_from(home).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_core::ArchiveType;
    use tempfile::TempDir;

    fn utf8(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap()
    }

    fn loader(cwd: &Utf8Path, home: &Utf8Path) -> ConfigLoader {
        ConfigLoader::new(cwd.to_path_buf()).with_home(Some(home.to_path_buf()))
    }

    #[tokio::test]
    async fn test_defaults_without_config() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        let home = root.join("home");

        let loader = loader(&root, &home);
        let (config, source) = loader.load(&HashMap::new()).await.unwrap();

        assert_eq!(source, ConfigSource::Defaults);
        assert!(config.sites.is_empty());
        assert_eq!(loader.repository_root(&config), home.join(".parcel").join("repository"));
    }

    #[tokio::test]
    async fn test_project_config_found_in_parent() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        tokio::fs::write(
            root.join(CONFIG_FILE),
            concat!(
                "[repository]\npath = \"cache\"\n\n",
                "[[sites]]\nname = \"shared\"\nkind = \"filesystem\"\npath = \"/mnt/share\"\n",
            ),
        )
        .await
        .unwrap();
        let nested = root.join("a").join("b");
        tokio::fs::create_dir_all(&nested).await.unwrap();

        let loader = loader(&nested, &root.join("home"));
        let (config, source) = loader.load(&HashMap::new()).await.unwrap();

        assert_eq!(source, ConfigSource::Project(root.join(CONFIG_FILE)));
        assert_eq!(config.sites[0].name, "shared");
        assert_eq!(config.sites[0].path, Some(Utf8PathBuf::from("/mnt/share")));
        assert_eq!(loader.repository_root(&config), root.join("cache"));
    }

    #[tokio::test]
    async fn test_global_config_fallback() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        let home = root.join("home");
        let global = home.join(".parcel").join("config.toml");
        tokio::fs::create_dir_all(global.parent().unwrap()).await.unwrap();
        tokio::fs::write(&global, "[repository]\ndefault-archive = \"tar.bz2\"\n")
            .await
            .unwrap();
        let cwd = root.join("work");
        tokio::fs::create_dir_all(&cwd).await.unwrap();

        let loader = loader(&cwd, &home);
        let (config, source) = loader.load(&HashMap::new()).await.unwrap();

        assert_eq!(source, ConfigSource::Global(global));
        assert_eq!(config.default_archive().unwrap(), ArchiveType::TarBz2);
    }

    #[tokio::test]
    async fn test_explicit_and_env_config() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        let explicit = root.join("explicit.toml");
        let from_env = root.join("env.toml");
        tokio::fs::write(&explicit, "[repository]\npath = \"/srv/explicit\"\n").await.unwrap();
        tokio::fs::write(&from_env, "[repository]\npath = \"/srv/env\"\n").await.unwrap();

        let env = HashMap::from([(ENV_CONFIG.to_string(), from_env.to_string())]);

        let by_env = loader(&root, &root).with_env(env.clone());
        let (config, source) = by_env.load(&HashMap::new()).await.unwrap();
        assert_eq!(source, ConfigSource::Environment(from_env));
        assert_eq!(config.repository.path, Some(Utf8PathBuf::from("/srv/env")));

        let by_flag = loader(&root, &root)
            .with_env(env)
            .with_explicit(Some(explicit.clone()));
        let (config, source) = by_flag.load(&HashMap::new()).await.unwrap();
        assert_eq!(source, ConfigSource::CommandLine(explicit));
        assert_eq!(config.repository.path, Some(Utf8PathBuf::from("/srv/explicit")));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);

        let loader = loader(&root, &root).with_explicit(Some(root.join("nope.toml")));
        assert!(matches!(
            loader.locate(),
            Err(ParcelError::ConfigValidation { field, .. }) if field == "--config"
        ));
    }

    #[test]
    fn test_overrides_layering() {
        let config = ParcelToml::default();
        let env = HashMap::from([
            (ENV_HOME.to_string(), "/srv/parcel-home".to_string()),
            (ENV_ARCHIVE.to_string(), "tar.gz".to_string()),
            ("PARCEL_UNRELATED".to_string(), "ignored".to_string()),
        ]);
        let cli = HashMap::from([("repository".to_string(), "/tmp/cli-repo".to_string())]);

        let from_env =
            ConfigLayering::merge_configs(config.clone(), &env, &HashMap::new()).unwrap();
        assert_eq!(from_env.repository.path, Some(Utf8PathBuf::from("/srv/parcel-home")));
        assert_eq!(from_env.default_archive().unwrap(), ArchiveType::TarGz);

        let merged = ConfigLayering::merge_configs(config, &env, &cli).unwrap();
        assert_eq!(merged.repository.path, Some(Utf8PathBuf::from("/tmp/cli-repo")));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let env = HashMap::from([(ENV_ARCHIVE.to_string(), "rar".to_string())]);
        assert!(
            ConfigLayering::merge_configs(ParcelToml::default(), &env, &HashMap::new()).is_err()
        );
    }
}
