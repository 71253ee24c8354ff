use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

/// Application paths following OS conventions
#[derive(Clone, Debug)]
pub struct AppPaths {
    /// Configuration directory (backend URL, ceremony settings, policy)
    pub config: PathBuf,
    /// Data directory (bearer token and its key)
    pub data: PathBuf,
}

impl AppPaths {
    /// Resolve OS-specific paths for the auth client
    ///
    /// # Platform Paths
    ///
    /// ## Linux
    /// - Config: `~/.config/SprintsAuth/`
    /// - Data: `~/.local/share/SprintsAuth/` → session/
    ///
    /// ## macOS
    /// - Config: `~/Library/Preferences/SprintsAuth/`
    /// - Data: `~/Library/Application Support/SprintsAuth/`
    ///
    /// ## Windows
    /// - Config: `%APPDATA%\SprintsAuth\config\`
    /// - Data: `%LOCALAPPDATA%\SprintsAuth\`
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "SprintsBank", "SprintsAuth")
            .context("Failed to determine project directories")?;

        Ok(Self {
            config: proj_dirs.config_dir().to_path_buf(),
            data: proj_dirs.data_dir().to_path_buf(),
        })
    }

    /// Paths rooted under a single directory (tests, portable installs)
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config: root.join("config"),
            data: root.join("data"),
        }
    }

    /// Create all necessary directories
    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.config).context("Failed to create config directory")?;
        fs::create_dir_all(self.session_dir()).context("Failed to create session directory")?;

        log::debug!("Application directories initialized");
        log::debug!("  Config: {}", self.config.display());
        log::debug!("  Data:   {}", self.data.display());

        Ok(())
    }

    /// Get path to config file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Get path to the session directory holding the bearer token
    pub fn session_dir(&self) -> PathBuf {
        self.data.join("session")
    }
}
