use crate::constants::*;
use crate::error::{AlertError, Result};
use serde::Deserialize;
use std::env::VarError;
use std::fs;
use std::path::{Path, PathBuf};

/// Which backend holds the alerts table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Libsql,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct LibsqlConfig {
    pub url: String,
    pub auth_token: String,
}

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub vectorizer: PathBuf,
    pub label_encoder: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub feed_url: String,
    pub table: String,
    pub backend: StoreBackend,
    pub supabase: Option<SupabaseConfig>,
    pub libsql: Option<LibsqlConfig>,
    pub artifacts: ArtifactPaths,
    pub log_dir: PathBuf,
    pub pushgateway_url: Option<String>,
}

/// Non-secret settings that may live in `transit_alerts.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub feed_url: Option<String>,
    pub table: Option<String>,
    pub store: Option<String>,
    pub log_dir: Option<String>,
    pub pushgateway_url: Option<String>,
    #[serde(default)]
    pub artifacts: FileArtifacts,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileArtifacts {
    pub model: Option<String>,
    pub vectorizer: Option<String>,
    pub label_encoder: Option<String>,
}

impl FileConfig {
    /// Reads the optional config file. A missing file is an empty config; a file that
    /// exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            AlertError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(toml::from_str(&content)?)
    }
}

impl Config {
    /// Loads `.env`, the optional TOML file and the process environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let path = config_path(std::env::var("ALERTS_CONFIG"))?;
        let file = FileConfig::load(&path)?;
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merges file settings with an environment lookup. Environment wins.
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match env("ALERTS_STORE").or(file.store).as_deref() {
            None | Some("supabase") => StoreBackend::Supabase,
            Some("libsql") => StoreBackend::Libsql,
            Some(other) => {
                return Err(AlertError::Config(format!(
                    "Unknown store backend '{other}' (expected supabase or libsql)"
                )))
            }
        };

        let supabase = match backend {
            StoreBackend::Supabase => Some(supabase_from(&env)?),
            StoreBackend::Libsql => None,
        };
        let libsql = match backend {
            StoreBackend::Libsql => Some(LibsqlConfig {
                url: env("LIBSQL_URL").ok_or_else(|| {
                    AlertError::Config("LIBSQL_URL environment variable not set".to_string())
                })?,
                auth_token: env("LIBSQL_AUTH_TOKEN").ok_or_else(|| {
                    AlertError::Config("LIBSQL_AUTH_TOKEN environment variable not set".to_string())
                })?,
            }),
            StoreBackend::Supabase => None,
        };

        let artifacts = ArtifactPaths {
            model: env("ALERTS_MODEL_PATH")
                .or(file.artifacts.model)
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string())
                .into(),
            vectorizer: env("ALERTS_VECTORIZER_PATH")
                .or(file.artifacts.vectorizer)
                .unwrap_or_else(|| DEFAULT_VECTORIZER_PATH.to_string())
                .into(),
            label_encoder: env("ALERTS_LABEL_ENCODER_PATH")
                .or(file.artifacts.label_encoder)
                .unwrap_or_else(|| DEFAULT_LABEL_ENCODER_PATH.to_string())
                .into(),
        };

        Ok(Self {
            feed_url: env("ALERTS_FEED_URL")
                .or(file.feed_url)
                .unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            table: env("ALERTS_TABLE")
                .or(file.table)
                .unwrap_or_else(|| DEFAULT_ALERTS_TABLE.to_string()),
            backend,
            supabase,
            libsql,
            artifacts,
            log_dir: env("ALERTS_LOG_DIR")
                .or(file.log_dir)
                .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())
                .into(),
            pushgateway_url: env("ALERTS_PUSHGATEWAY_URL").or(file.pushgateway_url),
        })
    }
}

/// Path of the TOML file: `ALERTS_CONFIG` when set, else the default name.
fn config_path(value: std::result::Result<String, VarError>) -> Result<PathBuf> {
    match value {
        Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        Ok(_) | Err(VarError::NotPresent) => Ok(PathBuf::from(DEFAULT_CONFIG_FILE)),
        Err(e) => Err(e.into()),
    }
}

fn supabase_from<F>(env: &F) -> Result<SupabaseConfig>
where
    F: Fn(&str) -> Option<String>,
{
    // Allow either a full URL or a project ref
    let url = match env("SUPABASE_URL") {
        Some(u) => u,
        None => {
            let project_ref = env("SUPABASE_PROJECT_REF").ok_or_else(|| {
                AlertError::Config(
                    "SUPABASE_URL (or SUPABASE_PROJECT_REF) environment variable not set".to_string(),
                )
            })?;
            format!("https://{project_ref}.supabase.co")
        }
    };
    let api_key = env("SUPABASE_API_KEY")
        .or_else(|| env("SUPABASE_KEY"))
        .or_else(|| env("SUPABASE_SERVICE_ROLE_KEY"))
        .ok_or_else(|| {
            AlertError::Config("SUPABASE_API_KEY environment variable not set".to_string())
        })?;
    Ok(SupabaseConfig {
        url: url.trim_end_matches('/').to_string(),
        api_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_with_supabase_credentials() {
        let config = Config::resolve(
            FileConfig::default(),
            lookup(&[("SUPABASE_URL", "https://demo.supabase.co/"), ("SUPABASE_API_KEY", "k")]),
        )
        .unwrap();
        assert_eq!(config.backend, StoreBackend::Supabase);
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.table, "alerts");
        let supabase = config.supabase.unwrap();
        assert_eq!(supabase.url, "https://demo.supabase.co");
        assert_eq!(supabase.api_key, "k");
        assert_eq!(config.artifacts.model, PathBuf::from(DEFAULT_MODEL_PATH));
        assert!(config.pushgateway_url.is_none());
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let err = Config::resolve(
            FileConfig::default(),
            lookup(&[("SUPABASE_URL", "https://demo.supabase.co")]),
        )
        .unwrap_err();
        assert!(matches!(err, AlertError::Config(msg) if msg.contains("SUPABASE_API_KEY")));
    }

    #[test]
    fn project_ref_and_legacy_key_are_accepted() {
        let config = Config::resolve(
            FileConfig::default(),
            lookup(&[("SUPABASE_PROJECT_REF", "abcd"), ("SUPABASE_KEY", "anon")]),
        )
        .unwrap();
        let supabase = config.supabase.unwrap();
        assert_eq!(supabase.url, "https://abcd.supabase.co");
        assert_eq!(supabase.api_key, "anon");
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "table = \"alerts_staging\"\nlog_dir = \"/var/log/alerts\"\n\n[artifacts]\nmodel = \"m.json\""
        )
        .unwrap();
        let parsed = FileConfig::load(file.path()).unwrap();
        let config = Config::resolve(
            parsed,
            lookup(&[
                ("SUPABASE_URL", "https://demo.supabase.co"),
                ("SUPABASE_API_KEY", "k"),
                ("ALERTS_TABLE", "alerts_prod"),
            ]),
        )
        .unwrap();
        assert_eq!(config.table, "alerts_prod");
        assert_eq!(config.log_dir, PathBuf::from("/var/log/alerts"));
        assert_eq!(config.artifacts.model, PathBuf::from("m.json"));
    }

    #[test]
    fn libsql_backend_needs_its_own_credentials() {
        let err = Config::resolve(
            FileConfig::default(),
            lookup(&[("ALERTS_STORE", "libsql"), ("LIBSQL_URL", "libsql://db.turso.io")]),
        )
        .unwrap_err();
        assert!(matches!(err, AlertError::Config(msg) if msg.contains("LIBSQL_AUTH_TOKEN")));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = Config::resolve(FileConfig::default(), lookup(&[("ALERTS_STORE", "mongo")]))
            .unwrap_err();
        assert!(matches!(err, AlertError::Config(_)));
    }

    #[test]
    fn missing_config_file_is_empty() {
        let parsed = FileConfig::load(Path::new("/nonexistent/transit_alerts.toml")).unwrap();
        assert!(parsed.feed_url.is_none());
    }

    #[test]
    fn config_path_falls_back_to_default_file() {
        assert_eq!(
            config_path(Err(VarError::NotPresent)).unwrap(),
            PathBuf::from(DEFAULT_CONFIG_FILE)
        );
        assert_eq!(
            config_path(Ok("/etc/alerts.toml".to_string())).unwrap(),
            PathBuf::from("/etc/alerts.toml")
        );
    }

    #[test]
    fn non_unicode_config_path_is_an_env_error() {
        let raw = std::ffi::OsString::from("alerts.toml");
        let err = config_path(Err(VarError::NotUnicode(raw))).unwrap_err();
        assert!(matches!(err, AlertError::Env(VarError::NotUnicode(_))));
    }
}
