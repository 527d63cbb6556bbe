use sheetbot_chat::events::EventContext;
use sheetbot_chat::{CardKind, OutboundMessage, SearchMessageHandler};
use sheetbot_core::config::{AppConfig, LoadOptions};
use sheetbot_core::LookupService;

use crate::commands::CommandResult;

/// Runs `query` through the same handler the bot uses and prints the reply document.
pub fn run(query: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "search",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "search",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let handler = SearchMessageHandler::new(LookupService::from_config(&config));
    let context = EventContext { correlation_id: "cli-search".to_string() };
    let reply = runtime.block_on(handler.respond(query.trim(), &context));

    let exit_code = match &reply {
        OutboundMessage::Card(card) if card.kind == CardKind::Error => 4,
        _ => 0,
    };

    match serde_json::to_string_pretty(&reply) {
        Ok(output) => CommandResult { exit_code, output },
        Err(error) => CommandResult::failure("search", "serialization", error.to_string(), 5),
    }
}
