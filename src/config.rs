//! Runtime configuration, resolved from environment variables with sane
//! defaults. The data directory holds screenshots and export artifacts.

use std::path::PathBuf;

/// Default per-page navigation deadline.
pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 30_000;

/// Default REST API port.
pub const DEFAULT_PORT: u16 = 7800;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// REST API port.
    pub port: u16,
    /// Per-page navigation deadline in milliseconds.
    pub nav_timeout_ms: u64,
    /// Browser viewport (width, height).
    pub viewport: (u32, u32),
    /// Root directory for screenshots and export artifacts.
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Resolve configuration: `MATCHUP_PORT`, `MATCHUP_NAV_TIMEOUT_MS` and
    /// `MATCHUP_DATA_DIR` override the defaults; the data directory falls
    /// back to `~/.matchup`.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("MATCHUP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".matchup")
            });

        Self {
            port: env_parse("MATCHUP_PORT", DEFAULT_PORT),
            nav_timeout_ms: env_parse("MATCHUP_NAV_TIMEOUT_MS", DEFAULT_NAV_TIMEOUT_MS),
            viewport: (1280, 800),
            data_dir,
        }
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.data_dir.join("screenshots")
    }

    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    /// Create the screenshot and export directories if missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.screenshot_dir())?;
        std::fs::create_dir_all(self.export_dir())?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
