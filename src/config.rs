use std::env;
use std::path::PathBuf;

use crate::loader::DEFAULT_MAX_UPLOAD_BYTES;

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Settings of the web server.
///
/// Read from `SALESBOARD_*` environment variables; a first positional
/// argument overrides the bind address.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub addr: String,
    pub max_upload_bytes: usize,
    /// Directory searched for the newest monthly export at startup.
    pub data_dir: Option<PathBuf>,
    /// Front-end assets served under `/`.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: DEFAULT_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            data_dir: None,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::from_lookup(|key| env::var(key).ok(), &args)
    }

    /// Build from an arbitrary variable lookup and argument list (program
    /// name already stripped).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, args: &[String]) -> Self {
        let mut config = ServerConfig::default();

        if let Some(addr) = lookup("SALESBOARD_ADDR").filter(|a| !a.trim().is_empty()) {
            config.addr = addr;
        }
        if let Some(mb) = lookup("SALESBOARD_MAX_UPLOAD_MB").and_then(|v| v.trim().parse::<usize>().ok()) {
            config.max_upload_bytes = mb * 1024 * 1024;
        }
        config.data_dir = lookup("SALESBOARD_DATA_DIR").map(PathBuf::from);
        config.static_dir = lookup("SALESBOARD_STATIC_DIR").map(PathBuf::from);

        if let Some(addr) = args.first() {
            config.addr = addr.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_without_env() {
        let config = ServerConfig::from_lookup(|_| None, &[]);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn args_override_env_addr() {
        let vars: HashMap<&str, &str> = [("SALESBOARD_ADDR", "0.0.0.0:80"), ("SALESBOARD_MAX_UPLOAD_MB", "5")].into();
        let lookup = |k: &str| vars.get(k).map(|v| v.to_string());

        let config = ServerConfig::from_lookup(lookup, &[]);
        assert_eq!(config.addr, "0.0.0.0:80");
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);

        let config = ServerConfig::from_lookup(lookup, &["127.0.0.1:9000".to_string()]);
        assert_eq!(config.addr, "127.0.0.1:9000");
    }
}
