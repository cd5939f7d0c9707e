use base64::Engine;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug)]
pub enum RecordError {
    Malformed(String),
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "Malformed server document: {}", e),
            Self::Invalid { field, reason } => write!(f, "Invalid {}: {}", field, reason),
        }
    }
}

impl std::error::Error for RecordError {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Address {
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Players {
    pub online: u32,
    pub max: u32,
}

/// Server icon in its storage form: a base64 payload plus its mime type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Icon {
    pub mime: String,
    pub data: String,
}

impl Icon {
    /// Parses `data:<mime>;base64,<payload>`.
    pub fn from_data_uri(raw: &str) -> Option<Self> {
        let (header, data) = raw.split_once(',')?;
        let mime = header
            .strip_prefix("data:")
            .and_then(|h| h.strip_suffix(";base64"))
            .filter(|m| !m.is_empty())
            .unwrap_or("image/png");
        if data.is_empty() {
            return None;
        }
        Some(Self {
            mime: mime.to_string(),
            data: data.to_string(),
        })
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(self.data.trim())
    }

    pub fn extension(&self) -> &str {
        match self.mime.as_str() {
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

/// A point-in-time scan snapshot. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerRecord {
    pub hostname: String,
    pub address: Address,
    pub description: String,
    pub version: Version,
    pub players: Players,
    pub cracked: bool,
    pub last_seen_at: DateTime<Utc>,
    pub icon: Option<Icon>,
    /// Top-level `sample` value. `Some(Value::Null)` still counts as present.
    pub sample: Option<Value>,
}

impl ServerRecord {
    pub fn has_sample(&self) -> bool {
        self.sample.is_some()
    }

    /// Decodes a stored scan document, rejecting documents that miss
    /// mandatory fields or carry out-of-range values.
    pub fn from_document(doc: Value) -> Result<Self, RecordError> {
        let stored: StoredServer =
            serde_json::from_value(doc).map_err(|e| RecordError::Malformed(e.to_string()))?;
        stored.try_into()
    }
}

// Storage form, as written by the scanner.

#[derive(Deserialize)]
struct StoredServer {
    host: StoredHost,
    description: StoredDescription,
    version: Version,
    players: StoredPlayers,
    cracked: bool,
    last_online: StoredTimestamp,
    #[serde(default)]
    favicon: Option<String>,
    #[serde(default, deserialize_with = "present")]
    sample: Option<Value>,
}

// Marks a key as present even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct StoredHost {
    ip: String,
    port: i64,
    hostname: String,
}

#[derive(Deserialize)]
struct StoredPlayers {
    online: i64,
    max: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDescription {
    Text(String),
    Component {
        #[serde(default)]
        text: String,
        #[serde(default)]
        extra: Vec<StoredDescription>,
    },
}

impl StoredDescription {
    fn flatten(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Component { text, extra } => {
                out.push_str(text);
                for part in extra {
                    part.flatten(out);
                }
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTimestamp {
    Seconds(i64),
    Fractional(f64),
    Text(String),
}

impl StoredTimestamp {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Seconds(secs) => DateTime::from_timestamp(*secs, 0),
            Self::Fractional(secs) => {
                let whole = secs.trunc() as i64;
                let nanos = (secs.fract() * 1e9) as u32;
                DateTime::from_timestamp(whole, nanos)
            }
            Self::Text(raw) => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u32, RecordError> {
    u32::try_from(value).map_err(|_| RecordError::Invalid {
        field,
        reason: format!("{} is out of range", value),
    })
}

impl TryFrom<StoredServer> for ServerRecord {
    type Error = RecordError;

    fn try_from(stored: StoredServer) -> Result<Self, Self::Error> {
        if stored.host.hostname.trim().is_empty() {
            return Err(RecordError::Invalid {
                field: "host.hostname",
                reason: "must not be empty".to_string(),
            });
        }
        if stored.host.ip.trim().is_empty() {
            return Err(RecordError::Invalid {
                field: "host.ip",
                reason: "must not be empty".to_string(),
            });
        }
        let port = u16::try_from(stored.host.port).map_err(|_| RecordError::Invalid {
            field: "host.port",
            reason: format!("{} is not a valid port", stored.host.port),
        })?;

        let last_seen_at = stored
            .last_online
            .to_datetime()
            .ok_or_else(|| RecordError::Invalid {
                field: "last_online",
                reason: "unparseable timestamp".to_string(),
            })?;

        let icon = match stored.favicon.as_deref() {
            Some(raw) => {
                let icon = Icon::from_data_uri(raw);
                if icon.is_none() {
                    warn!("Ignoring malformed favicon for {}", stored.host.hostname);
                }
                icon
            }
            None => None,
        };

        let mut description = String::new();
        stored.description.flatten(&mut description);

        Ok(Self {
            address: Address {
                ip: stored.host.ip,
                port,
            },
            hostname: stored.host.hostname,
            description,
            version: stored.version,
            players: Players {
                online: non_negative("players.online", stored.players.online)?,
                max: non_negative("players.max", stored.players.max)?,
            },
            cracked: stored.cracked,
            last_seen_at,
            icon,
            sample: stored.sample,
        })
    }
}
