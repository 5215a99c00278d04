//! Server settings resolved from the environment.
//!
//! Store connection settings live in [`sigap_db::ConnectionConfig`]; this
//! covers everything else the binary needs.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use sigap_core::defaults::{
    HOST, IMPORT_TIMEOUT_SECS, MAX_EXTRACTED_BYTES, MAX_UPLOAD_BYTES, OGR2OGR_BIN, PORT,
    TARGET_SRID, UPLOAD_DIR,
};
use sigap_core::OverlapDefaults;
use sigap_ingest::IngestConfig;

/// HTTP server, upload, and query settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    /// Request body cap for `/upload`.
    pub max_upload_bytes: usize,
    pub max_extracted_bytes: u64,
    pub ogr2ogr_bin: PathBuf,
    pub import_timeout: Duration,
    pub srid: i32,
    pub overlap_defaults: OverlapDefaults,
    /// `None` allows any origin.
    pub allowed_origins: Option<Vec<String>>,
    /// Directory served for unmatched paths (the map client).
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: HOST.to_string(),
            port: PORT,
            upload_dir: PathBuf::from(UPLOAD_DIR),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            max_extracted_bytes: MAX_EXTRACTED_BYTES,
            ogr2ogr_bin: PathBuf::from(OGR2OGR_BIN),
            import_timeout: Duration::from_secs(IMPORT_TIMEOUT_SECS),
            srid: TARGET_SRID,
            overlap_defaults: OverlapDefaults::default(),
            allowed_origins: None,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary key lookup.
    ///
    /// Unparseable numeric values log a warning and keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut overlap_defaults = defaults.overlap_defaults.clone();
        if let Some(layer) = non_empty("DEFAULT_LAYER1") {
            overlap_defaults.layer1 = layer;
        }
        if let Some(layer) = non_empty("DEFAULT_LAYER2") {
            overlap_defaults.layer2 = layer;
        }

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", lookup("PORT"), defaults.port),
            upload_dir: non_empty("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes: parse_or(
                "MAX_UPLOAD_BYTES",
                lookup("MAX_UPLOAD_BYTES"),
                defaults.max_upload_bytes,
            ),
            max_extracted_bytes: parse_or(
                "MAX_EXTRACTED_BYTES",
                lookup("MAX_EXTRACTED_BYTES"),
                defaults.max_extracted_bytes,
            ),
            ogr2ogr_bin: non_empty("OGR2OGR_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ogr2ogr_bin),
            import_timeout: Duration::from_secs(parse_or(
                "IMPORT_TIMEOUT_SECS",
                lookup("IMPORT_TIMEOUT_SECS"),
                IMPORT_TIMEOUT_SECS,
            )),
            srid: parse_or("TARGET_SRID", lookup("TARGET_SRID"), defaults.srid),
            overlap_defaults,
            allowed_origins: non_empty("ALLOWED_ORIGINS").map(|raw| split_origins(&raw)),
            static_dir: non_empty("STATIC_DIR").map(PathBuf::from),
        }
    }

    /// Settings for the upload pipeline.
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            upload_dir: self.upload_dir.clone(),
            max_extracted_bytes: self.max_extracted_bytes,
            srid: self.srid,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(
            subsystem = "api",
            component = "config",
            key,
            value = %raw,
            "Invalid value, using default"
        );
        default
    })
}

/// Split a comma-separated origin list, dropping blanks.
pub fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.max_upload_bytes, 256 * 1024 * 1024);
        assert_eq!(config.import_timeout, Duration::from_secs(300));
        assert_eq!(config.srid, 4326);
        assert_eq!(config.overlap_defaults.layer1, "pippib_ar_250k_2025_1");
        assert_eq!(config.overlap_defaults.layer2, "kwshutan_overlap");
        assert!(config.allowed_origins.is_none());
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("UPLOAD_DIR", "/var/lib/sigap/uploads"),
            ("OGR2OGR_BIN", "/usr/local/bin/ogr2ogr"),
            ("IMPORT_TIMEOUT_SECS", "30"),
            ("TARGET_SRID", "3857"),
            ("DEFAULT_LAYER1", "parcels"),
            ("DEFAULT_LAYER2", "forest"),
            ("STATIC_DIR", "public"),
        ]));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.upload_dir, PathBuf::from("/var/lib/sigap/uploads"));
        assert_eq!(config.ogr2ogr_bin, PathBuf::from("/usr/local/bin/ogr2ogr"));
        assert_eq!(config.import_timeout, Duration::from_secs(30));
        assert_eq!(config.srid, 3857);
        assert_eq!(config.overlap_defaults.layer1, "parcels");
        assert_eq!(config.overlap_defaults.layer2, "forest");
        assert_eq!(config.static_dir, Some(PathBuf::from("public")));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "http"),
            ("MAX_UPLOAD_BYTES", "-1"),
            ("TARGET_SRID", "wgs84"),
        ]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_upload_bytes, MAX_UPLOAD_BYTES);
        assert_eq!(config.srid, 4326);
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("DEFAULT_LAYER1", ""),
            ("ALLOWED_ORIGINS", "  "),
            ("STATIC_DIR", ""),
        ]));
        assert_eq!(config.overlap_defaults.layer1, "pippib_ar_250k_2025_1");
        assert!(config.allowed_origins.is_none());
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn test_split_origins() {
        assert_eq!(
            split_origins("https://sigap.example, http://localhost:5173 ,,"),
            vec!["https://sigap.example", "http://localhost:5173"]
        );
        assert!(split_origins(" , ").is_empty());
    }

    #[test]
    fn test_ingest_config_mirrors_server_settings() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("UPLOAD_DIR", "/tmp/sigap"),
            ("MAX_EXTRACTED_BYTES", "1024"),
            ("TARGET_SRID", "3857"),
        ]));
        let ingest = config.ingest_config();
        assert_eq!(ingest.upload_dir, PathBuf::from("/tmp/sigap"));
        assert_eq!(ingest.max_extracted_bytes, 1024);
        assert_eq!(ingest.srid, 3857);
    }
}
