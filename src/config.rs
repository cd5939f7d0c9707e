use std::env;
use std::time::Duration;

/// Card colors, keyed by what the card is telling the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Error,
    Success,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPalette {
    pub error: u32,
    pub success: u32,
    pub warning: u32,
    pub info: u32,
    pub offline: u32,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            error: 0xFF0000,
            success: 0x00FF00,
            warning: 0xFFFF00,
            info: 0x0000FF,
            offline: 0xFFC0CB,
        }
    }
}

impl ColorPalette {
    pub fn get(&self, color: StatusColor) -> u32 {
        match color {
            StatusColor::Error => self.error,
            StatusColor::Success => self.success,
            StatusColor::Warning => self.warning,
            StatusColor::Info => self.info,
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            error: color_var("COLOR_ERROR").unwrap_or(defaults.error),
            success: color_var("COLOR_SUCCESS").unwrap_or(defaults.success),
            warning: color_var("COLOR_WARNING").unwrap_or(defaults.warning),
            info: color_var("COLOR_INFO").unwrap_or(defaults.info),
            offline: color_var("COLOR_OFFLINE").unwrap_or(defaults.offline),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,

    // Catalog
    pub catalog_path: String,

    // Probe
    pub probe_timeout_ms: u64,
    pub probe_protocol_version: i32,

    pub palette: ColorPalette,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            catalog_path: "servers.json".to_string(),
            probe_timeout_ms: 3000,
            probe_protocol_version: 47,
            palette: ColorPalette::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),

            catalog_path: env::var("CATALOG_PATH").unwrap_or(defaults.catalog_path),

            probe_timeout_ms: env::var("PROBE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.probe_timeout_ms),

            probe_protocol_version: env::var("PROBE_PROTOCOL_VERSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.probe_protocol_version),

            palette: ColorPalette::from_env(),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn color_var(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|v| parse_color(&v))
}

/// Accepts `0xRRGGBB`, `#RRGGBB` or bare hex.
pub fn parse_color(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .or_else(|| trimmed.strip_prefix('#'))
        .unwrap_or(trimmed);
    u32::from_str_radix(hex, 16).ok().filter(|c| *c <= 0xFFFFFF)
}
