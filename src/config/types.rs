use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub collector: CollectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Directory of servable media, each file named by its own hex digest.
    #[serde(default = "default_webroot")]
    pub webroot: PathBuf,
}

fn default_webroot() -> PathBuf {
    PathBuf::from("/var/www/media")
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            webroot: default_webroot(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Run the collector at startup, before the index is built.
    #[serde(default)]
    pub enabled: bool,

    /// Source directories scanned recursively for media files.
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Case-insensitive file extensions accepted into the webroot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "tga", "ogg", "b3d", "x", "obj"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            paths: Vec::new(),
            extensions: default_extensions(),
        }
    }
}
