//! Classification of incoming text.
//!
//! Built-ins match the whole trimmed text exactly; module commands match
//! the first whitespace-delimited token against the registry.

use crate::discovery::registry::ModuleRegistry;

/// Commands with fixed semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCommand {
    /// Reset the chat and show the welcome text.
    Start,
    /// Open a trainer dialogue (`/train` or `/dialog`).
    Train,
    /// Finish the dialogue and show its summary.
    StopDialog,
    /// List discovered modules.
    Modules,
}

impl BuiltinCommand {
    /// Parse a built-in. Returns `None` unless the whole text is one.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "/start" => Some(BuiltinCommand::Start),
            "/train" | "/dialog" => Some(BuiltinCommand::Train),
            "/stop_dialog" => Some(BuiltinCommand::StopDialog),
            "/modules" => Some(BuiltinCommand::Modules),
            _ => None,
        }
    }
}

/// Where a message goes, in decision order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Builtin(BuiltinCommand),
    /// A registered module command (e.g. `/arena`).
    Module(String),
    /// Free text; continues a dialogue if one is running.
    Text,
}

/// Decide how to route `text`. Session mode is checked by the router.
pub fn classify(text: &str, registry: &ModuleRegistry) -> Route {
    if let Some(builtin) = BuiltinCommand::parse(text) {
        return Route::Builtin(builtin);
    }
    match text.split_whitespace().next() {
        Some(token) if registry.contains(token) => Route::Module(token.to_string()),
        _ => Route::Text,
    }
}
