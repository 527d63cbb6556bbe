use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::MatchMode;

pub const DEFAULT_CONFIG_FILE: &str = "sheetbot.toml";
pub const NESTED_CONFIG_FILE: &str = "config/sheetbot.toml";

/// Separator for list values supplied through environment variables.
pub const LIST_SEPARATOR: char = '|';

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub svn: SvnConfig,
    pub search: SearchConfig,
    pub bot: BotConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SvnConfig {
    pub url: String,
    pub username: String,
    pub password: SecretString,
    pub binary: String,
    pub cache_ttl_secs: u64,
    /// Zero disables the timeout.
    pub export_timeout_secs: u64,
}

impl SvnConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn export_timeout(&self) -> Option<Duration> {
        (self.export_timeout_secs > 0).then(|| Duration::from_secs(self.export_timeout_secs))
    }
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub search_column: String,
    pub return_columns: Vec<String>,
    pub max_results: usize,
    pub match_mode: MatchMode,
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub transport: TransportMode,
    /// Sent before the lookup starts; empty disables it.
    pub progress_notice: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Noop,
    Stdio,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub svn_url: Option<String>,
    pub svn_username: Option<String>,
    pub svn_password: Option<String>,
    pub search_column: Option<String>,
    pub return_columns: Option<Vec<String>>,
    pub max_results: Option<usize>,
    pub match_mode: Option<MatchMode>,
    pub transport: Option<TransportMode>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            svn: SvnConfig {
                url: String::new(),
                username: String::new(),
                password: String::new().into(),
                binary: "svn".to_string(),
                cache_ttl_secs: 30 * 60,
                export_timeout_secs: 0,
            },
            search: SearchConfig {
                search_column: String::new(),
                return_columns: Vec::new(),
                max_results: 5,
                match_mode: MatchMode::Pattern,
            },
            bot: BotConfig {
                transport: TransportMode::Noop,
                progress_notice: "正在搜索，请稍候...".to_string(),
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), health_check_port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "noop" => Ok(Self::Noop),
            "stdio" => Ok(Self::Stdio),
            other => Err(ConfigError::Validation(format!(
                "unsupported bot transport `{other}` (expected noop|stdio)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl std::str::FromStr for MatchMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pattern" => Ok(Self::Pattern),
            "literal" => Ok(Self::Literal),
            other => Err(ConfigError::Validation(format!(
                "unsupported search match mode `{other}` (expected pattern|literal)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(svn) = patch.svn {
            if let Some(url) = svn.url {
                self.svn.url = url;
            }
            if let Some(username) = svn.username {
                self.svn.username = username;
            }
            if let Some(svn_password_value) = svn.password {
                self.svn.password = secret_value(svn_password_value);
            }
            if let Some(binary) = svn.binary {
                self.svn.binary = binary;
            }
            if let Some(cache_ttl_secs) = svn.cache_ttl_secs {
                self.svn.cache_ttl_secs = cache_ttl_secs;
            }
            if let Some(export_timeout_secs) = svn.export_timeout_secs {
                self.svn.export_timeout_secs = export_timeout_secs;
            }
        }

        if let Some(search) = patch.search {
            if let Some(search_column) = search.search_column {
                self.search.search_column = search_column;
            }
            if let Some(return_columns) = search.return_columns {
                self.search.return_columns = return_columns;
            }
            if let Some(max_results) = search.max_results {
                self.search.max_results = max_results;
            }
            if let Some(match_mode) = search.match_mode {
                self.search.match_mode = match_mode;
            }
        }

        if let Some(bot) = patch.bot {
            if let Some(transport) = bot.transport {
                self.bot.transport = transport;
            }
            if let Some(progress_notice) = bot.progress_notice {
                self.bot.progress_notice = progress_notice;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SHEETBOT_SVN_URL") {
            self.svn.url = value;
        }
        if let Some(value) = read_env("SHEETBOT_SVN_USERNAME") {
            self.svn.username = value;
        }
        if let Some(value) = read_env("SHEETBOT_SVN_PASSWORD") {
            self.svn.password = secret_value(value);
        }
        if let Some(value) = read_env("SHEETBOT_SVN_BINARY") {
            self.svn.binary = value;
        }
        if let Some(value) = read_env("SHEETBOT_SVN_CACHE_TTL_SECS") {
            self.svn.cache_ttl_secs = parse_u64("SHEETBOT_SVN_CACHE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("SHEETBOT_SVN_EXPORT_TIMEOUT_SECS") {
            self.svn.export_timeout_secs =
                parse_u64("SHEETBOT_SVN_EXPORT_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHEETBOT_SEARCH_COLUMN") {
            self.search.search_column = value;
        }
        if let Some(value) = read_env("SHEETBOT_SEARCH_RETURN_COLUMNS") {
            self.search.return_columns = split_list(&value);
        }
        if let Some(value) = read_env("SHEETBOT_SEARCH_MAX_RESULTS") {
            self.search.max_results = parse_usize("SHEETBOT_SEARCH_MAX_RESULTS", &value)?;
        }
        if let Some(value) = read_env("SHEETBOT_SEARCH_MATCH_MODE") {
            self.search.match_mode = value.parse()?;
        }

        if let Some(value) = read_env("SHEETBOT_BOT_TRANSPORT") {
            self.bot.transport = value.parse()?;
        }
        if let Some(value) = read_env("SHEETBOT_BOT_PROGRESS_NOTICE") {
            self.bot.progress_notice = value;
        }

        if let Some(value) = read_env("SHEETBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SHEETBOT_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("SHEETBOT_SERVER_HEALTH_CHECK_PORT", &value)?;
        }

        let log_level =
            read_env("SHEETBOT_LOGGING_LEVEL").or_else(|| read_env("SHEETBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHEETBOT_LOGGING_FORMAT").or_else(|| read_env("SHEETBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(svn_url) = overrides.svn_url {
            self.svn.url = svn_url;
        }
        if let Some(svn_username) = overrides.svn_username {
            self.svn.username = svn_username;
        }
        if let Some(svn_password) = overrides.svn_password {
            self.svn.password = secret_value(svn_password);
        }
        if let Some(search_column) = overrides.search_column {
            self.search.search_column = search_column;
        }
        if let Some(return_columns) = overrides.return_columns {
            self.search.return_columns = return_columns;
        }
        if let Some(max_results) = overrides.max_results {
            self.search.max_results = max_results;
        }
        if let Some(match_mode) = overrides.match_mode {
            self.search.match_mode = match_mode;
        }
        if let Some(transport) = overrides.transport {
            self.bot.transport = transport;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_svn(&self.svn)?;
        validate_search(&self.search)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_svn(svn: &SvnConfig) -> Result<(), ConfigError> {
    let url = svn.url.trim();
    if url.is_empty() {
        return Err(ConfigError::Validation(
            "svn.url is required (the repository URL of the spreadsheet to export)".to_string(),
        ));
    }
    let supported = ["http://", "https://", "svn://", "svn+ssh://", "file://"];
    if !supported.iter().any(|scheme| url.starts_with(scheme)) {
        return Err(ConfigError::Validation(format!(
            "svn.url must start with one of {}",
            supported.join(", ")
        )));
    }

    if svn.binary.trim().is_empty() {
        return Err(ConfigError::Validation("svn.binary must not be empty".to_string()));
    }

    if svn.cache_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "svn.cache_ttl_secs must be greater than zero".to_string(),
        ));
    }

    if svn.export_timeout_secs > 3_600 {
        return Err(ConfigError::Validation(
            "svn.export_timeout_secs must be in range 0..=3600 (0 disables the timeout)"
                .to_string(),
        ));
    }

    // Anonymous exports pass an empty username; a password without one is a typo.
    if svn.username.trim().is_empty() && !svn.password.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "svn.password is set but svn.username is empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    if search.search_column.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search.search_column is required (the header of the column to match against)"
                .to_string(),
        ));
    }

    if search.return_columns.is_empty() {
        return Err(ConfigError::Validation(
            "search.return_columns must list at least one column".to_string(),
        ));
    }

    if search.return_columns.iter().any(|column| column.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "search.return_columns must not contain blank column names".to_string(),
        ));
    }

    if search.max_results == 0 || search.max_results > 50 {
        return Err(ConfigError::Validation(
            "search.max_results must be in range 1..=50".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    svn: Option<SvnPatch>,
    search: Option<SearchPatch>,
    bot: Option<BotPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SvnPatch {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    binary: Option<String>,
    cache_ttl_secs: Option<u64>,
    export_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    search_column: Option<String>,
    return_columns: Option<Vec<String>>,
    max_results: Option<usize>,
    match_mode: Option<MatchMode>,
}

#[derive(Debug, Default, Deserialize)]
struct BotPatch {
    transport: Option<TransportMode>,
    progress_notice: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, TransportMode};
    use crate::search::MatchMode;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const REQUIRED_VARS: [(&str, &str); 3] = [
        ("SHEETBOT_SVN_URL", "https://svn.example.com/repo/trunk/Skins.csv"),
        ("SHEETBOT_SEARCH_COLUMN", "皮肤名"),
        ("SHEETBOT_SEARCH_RETURN_COLUMNS", "英雄ID|皮肤ID"),
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn set_required_vars() {
        for (key, value) in REQUIRED_VARS {
            env::set_var(key, value);
        }
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn clear_required_vars() {
        clear_vars(&REQUIRED_VARS.map(|(key, _)| key));
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SVN_USER", "alice");
        env::set_var("TEST_SVN_PASSWORD", "hunter2");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("sheetbot.toml");
            fs::write(
                &path,
                r#"
[svn]
url = "https://svn.example.com/repo/trunk/Skins.csv"
username = "${TEST_SVN_USER}"
password = "${TEST_SVN_PASSWORD}"

[search]
search_column = "皮肤名"
return_columns = ["英雄ID", "皮肤ID"]
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.svn.username == "alice", "username should be interpolated from env")?;
            ensure(
                config.svn.password.expose_secret() == "hunter2",
                "password should be interpolated from env",
            )?;
            ensure(
                config.search.return_columns == vec!["英雄ID".to_string(), "皮肤ID".to_string()],
                "return columns should keep file order",
            )?;
            ensure(config.search.max_results == 5, "max_results should default to five")?;
            ensure(config.svn.cache_ttl_secs == 1_800, "cache ttl should default to 30 minutes")?;
            Ok(())
        })();

        clear_vars(&["TEST_SVN_USER", "TEST_SVN_PASSWORD"]);
        result
    }

    #[test]
    fn unterminated_interpolation_is_rejected() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("sheetbot.toml");
        fs::write(&path, "[svn]\nurl = \"${UNTERMINATED\"\n").map_err(|err| err.to_string())?;

        let result =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(result, Err(ConfigError::UnterminatedInterpolation)),
            "unterminated interpolation should fail",
        )
    }

    #[test]
    fn list_env_values_split_on_pipe() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();
        env::set_var("SHEETBOT_SEARCH_RETURN_COLUMNS", " 英雄ID | 收藏品质(1-A及以下，2-A+) ||");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.search.return_columns
                    == vec!["英雄ID".to_string(), "收藏品质(1-A及以下，2-A+)".to_string()],
                "pipe separated list should be trimmed and keep commas inside names",
            )
        })();

        clear_required_vars();
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();
        env::set_var("SHEETBOT_LOG_LEVEL", "warn");
        env::set_var("SHEETBOT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_required_vars();
        clear_vars(&["SHEETBOT_LOG_LEVEL", "SHEETBOT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SHEETBOT_SEARCH_MAX_RESULTS", "8");
        env::set_var("SHEETBOT_SVN_USERNAME", "env-user");
        env::set_var("SHEETBOT_BOT_TRANSPORT", "stdio");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("sheetbot.toml");
            fs::write(
                &path,
                r#"
[svn]
url = "https://svn.example.com/repo/trunk/Skins.csv"
username = "file-user"

[search]
search_column = "皮肤名"
return_columns = ["英雄ID"]
max_results = 3
match_mode = "literal"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    max_results: Some(2),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.search.max_results == 2, "override max_results should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.svn.username == "env-user", "env username should win over file")?;
            ensure(config.bot.transport == TransportMode::Stdio, "env transport should apply")?;
            ensure(
                config.search.match_mode == MatchMode::Literal,
                "file match mode should win over default",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "SHEETBOT_SEARCH_MAX_RESULTS",
            "SHEETBOT_SVN_USERNAME",
            "SHEETBOT_BOT_TRANSPORT",
        ]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();
        env::set_var("SHEETBOT_SVN_URL", "ftp://svn.example.com/Skins.csv");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("svn.url")
            );
            ensure(has_message, "validation failure should mention svn.url")
        })();

        clear_required_vars();
        result
    }

    #[test]
    fn missing_search_column_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();
        env::remove_var("SHEETBOT_SEARCH_COLUMN");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected missing search column to fail".to_string()),
            Err(ConfigError::Validation(message)) => {
                ensure(message.contains("search.search_column"), "message should name the field")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_required_vars();
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();
        env::set_var("SHEETBOT_SVN_CACHE_TTL_SECS", "half-an-hour");

        let result = ensure(
            matches!(
                AppConfig::load(LoadOptions::default()),
                Err(ConfigError::InvalidEnvOverride { ref key, .. })
                    if key == "SHEETBOT_SVN_CACHE_TTL_SECS"
            ),
            "non-numeric ttl should be rejected",
        );

        clear_required_vars();
        clear_vars(&["SHEETBOT_SVN_CACHE_TTL_SECS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();
        env::set_var("SHEETBOT_SVN_USERNAME", "builder");
        env::set_var("SHEETBOT_SVN_PASSWORD", "svn-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("svn-secret-value"), "debug output should not contain password")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            ensure(config.svn.export_timeout().is_none(), "export timeout should default to off")?;
            Ok(())
        })();

        clear_required_vars();
        clear_vars(&["SHEETBOT_SVN_USERNAME", "SHEETBOT_SVN_PASSWORD"]);
        result
    }
}
