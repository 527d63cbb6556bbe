use std::sync::Arc;

use sheetbot_chat::{
    search_dispatcher, ChatTransport, NoopTransport, ReconnectPolicy, SocketRunner, StdioTransport,
};
use sheetbot_core::config::{AppConfig, ConfigError, LoadOptions, TransportMode};
use sheetbot_core::LookupService;
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub lookup: Arc<LookupService>,
    pub runner: SocketRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    Ok(bootstrap_with_config(config))
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        svn_url = %config.svn.url,
        search_column = %config.search.search_column,
        "starting application bootstrap"
    );

    if which::which(&config.svn.binary).is_err() {
        warn!(
            event_name = "system.bootstrap.export_binary_missing",
            correlation_id = "bootstrap",
            binary = %config.svn.binary,
            "export binary not found on PATH; lookups will fail until it is installed"
        );
    }

    let lookup = Arc::new(LookupService::from_config(&config));
    let progress_notice = Some(config.bot.progress_notice.clone());
    let dispatcher = search_dispatcher(lookup.clone(), progress_notice);
    let runner =
        SocketRunner::new(transport(config.bot.transport), dispatcher, ReconnectPolicy::default());

    Application { config, lookup, runner }
}

fn transport(mode: TransportMode) -> Arc<dyn ChatTransport> {
    match mode {
        TransportMode::Noop => Arc::new(NoopTransport),
        TransportMode::Stdio => Arc::new(StdioTransport::stdio()),
    }
}
