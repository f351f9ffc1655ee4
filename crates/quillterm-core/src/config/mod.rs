pub mod theme;

use std::path::PathBuf;

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub use theme::{Theme, ThemeRegistry};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub ipc: IpcConfig,
    pub api: ApiConfig,
    pub background: BackgroundConfig,
    pub theme: ThemeRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub shell: String,
    pub status_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Override for the control socket path; empty means the default
    /// location under the config directory.
    pub socket_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Maximum number of concurrently running background processes.
    pub max_running: usize,
    /// Captured output cap per process, in lines. Capture keeps draining
    /// the child's pipes past the cap so the child never stalls.
    pub max_output_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeRef {
    pub name: String,
    /// Optional hex overrides (e.g. "#1e1e2e") applied on top of the named
    /// theme's colors.
    pub background: Option<String>,
    pub foreground: Option<String>,
    pub cursor: Option<String>,
}

impl Config {
    /// Load config from default path (~/.config/quillterm/config.toml)
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn config_dir() -> PathBuf {
        ProjectDirs::from("", "", "quillterm")
            .map(|d| d.config_dir().to_path_buf())
            .unwrap_or_else(|| dirs_fallback().join("quillterm"))
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn default_socket_path() -> PathBuf {
        Self::config_dir().join("quillterm.sock")
    }

    pub fn api_token_path() -> PathBuf {
        Self::config_dir().join("api_token")
    }

    /// Resolve the control socket path
    pub fn socket_path(&self) -> PathBuf {
        if !self.ipc.socket_path.is_empty() {
            return PathBuf::from(&self.ipc.socket_path);
        }
        Self::default_socket_path()
    }

    /// Resolve the shell used for background commands
    pub fn shell(&self) -> String {
        if !self.general.shell.is_empty() {
            return self.general.shell.clone();
        }
        std::env::var("SHELL").unwrap_or_else(|_| {
            if cfg!(windows) {
                "cmd".to_string()
            } else {
                "/bin/sh".to_string()
            }
        })
    }
}

fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            ipc: IpcConfig::default(),
            api: ApiConfig::default(),
            background: BackgroundConfig::default(),
            theme: ThemeRef::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            shell: String::new(),
            status_message: "Ready".to_string(),
        }
    }
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            socket_path: String::new(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 7878,
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            max_running: 16,
            max_output_lines: 10_000,
        }
    }
}

impl Default for ThemeRef {
    fn default() -> Self {
        Self {
            name: "default-dark".to_string(),
            background: None,
            foreground: None,
            cursor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.api.port, 7878);
        assert!(config.background.max_running > 0);
        assert!(config.background.max_output_lines > 0);
        assert_eq!(config.theme.name, "default-dark");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[background]\nmax_running = 4\n").unwrap();
        assert_eq!(config.background.max_running, 4);
        assert_eq!(config.background.max_output_lines, 10_000);
        assert_eq!(config.api.port, 7878);
    }

    #[test]
    fn socket_path_override() {
        let mut config = Config::default();
        config.ipc.socket_path = "/tmp/custom.sock".to_string();
        assert_eq!(config.socket_path(), PathBuf::from("/tmp/custom.sock"));
    }
}
