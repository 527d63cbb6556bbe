use std::env;
use std::fs;
use std::path::Path;

use secrecy::ExposeSecret;
use sheetbot_core::config::{resolve_config_path, AppConfig, LoadOptions, LIST_SEPARATOR};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let password =
        if config.svn.password.expose_secret().is_empty() { "<unset>" } else { "<redacted>" };
    let return_columns = config.search.return_columns.join(&format!(" {LIST_SEPARATOR} "));
    let progress_notice = if config.bot.progress_notice.is_empty() {
        "<disabled>".to_string()
    } else {
        config.bot.progress_notice.clone()
    };

    let fields = [
        field("svn.url", config.svn.url.clone(), &["SHEETBOT_SVN_URL"]),
        field("svn.username", display_or_unset(&config.svn.username), &["SHEETBOT_SVN_USERNAME"]),
        field("svn.password", password.to_string(), &["SHEETBOT_SVN_PASSWORD"]),
        field("svn.binary", config.svn.binary.clone(), &["SHEETBOT_SVN_BINARY"]),
        field(
            "svn.cache_ttl_secs",
            config.svn.cache_ttl_secs.to_string(),
            &["SHEETBOT_SVN_CACHE_TTL_SECS"],
        ),
        field(
            "svn.export_timeout_secs",
            config.svn.export_timeout_secs.to_string(),
            &["SHEETBOT_SVN_EXPORT_TIMEOUT_SECS"],
        ),
        field("search.search_column", config.search.search_column.clone(), &["SHEETBOT_SEARCH_COLUMN"]),
        field("search.return_columns", return_columns, &["SHEETBOT_SEARCH_RETURN_COLUMNS"]),
        field(
            "search.max_results",
            config.search.max_results.to_string(),
            &["SHEETBOT_SEARCH_MAX_RESULTS"],
        ),
        field(
            "search.match_mode",
            format!("{:?}", config.search.match_mode),
            &["SHEETBOT_SEARCH_MATCH_MODE"],
        ),
        field("bot.transport", format!("{:?}", config.bot.transport), &["SHEETBOT_BOT_TRANSPORT"]),
        field("bot.progress_notice", progress_notice, &["SHEETBOT_BOT_PROGRESS_NOTICE"]),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["SHEETBOT_SERVER_BIND_ADDRESS"],
        ),
        field(
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            &["SHEETBOT_SERVER_HEALTH_CHECK_PORT"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["SHEETBOT_LOGGING_LEVEL", "SHEETBOT_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["SHEETBOT_LOGGING_FORMAT", "SHEETBOT_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }
    lines.join("\n")
}

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Field {
    Field { key, value, env_keys }
}

fn display_or_unset(value: &str) -> String {
    if value.is_empty() {
        "<unset>".to_string()
    } else {
        value.to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| is_set(key)) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

/// Blank values are ignored by the loader, so they are not a source either.
fn is_set(key: &str) -> bool {
    env::var(key).is_ok_and(|value| !value.trim().is_empty())
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
