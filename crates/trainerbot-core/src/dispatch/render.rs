//! User-facing reply texts.

use trainerbot_types::engine::{Scores, StopOutcome, TurnOutcome};
use trainerbot_types::session::ChatId;

use crate::discovery::registry::ModuleRegistry;

pub const START_FAILED: &str = "Could not start a training session. Please try again later.";
pub const NO_SESSION_ID: &str = "The trainer did not return a session id. Please contact the developers.";
pub const NO_ACTIVE_SESSION: &str = "There is no active session. Send /train to start one.";
pub const STOP_FAILED: &str = "Could not get the session summary. Please try again later.";
pub const SESSION_LOST: &str = "Session not found. Send /train to start a new one.";
pub const TURN_FAILED: &str = "Sorry, the trainer is not responding right now. Please try again.";
pub const FALLBACK_HINT: &str = "Send /modules to see the modules or /train to start the trainer.";

const SILENT_CLIENT: &str = "The client is silent for now.";

/// Welcome text for `/start`, with the module listing when there is one.
pub fn welcome(registry: &ModuleRegistry) -> String {
    let mut text = String::from(
        "Hi! This is a sales dialogue trainer.\n\n\
         Commands:\n\
         /train or /dialog - start the trainer (client role-play with scoring)\n\
         /stop_dialog - finish the current session and get a summary\n\
         /modules - list available modules\n",
    );
    if !registry.is_empty() {
        text.push('\n');
        text.push_str(&module_listing(registry));
    }
    text
}

/// `/modules` listing, in registry order.
pub fn module_listing(registry: &ModuleRegistry) -> String {
    let mut lines = vec!["Available modules:".to_string()];
    if registry.is_empty() {
        lines.push("(none discovered)".to_string());
    }
    lines.extend(
        registry
            .iter()
            .map(|b| format!("{} - {}", b.command(), b.description)),
    );
    lines.join("\n")
}

pub fn dialog_started(reply: Option<&str>) -> String {
    let mut text =
        "Training started. Write your answers and I will play the client.".to_string();
    if let Some(reply) = reply {
        text.push_str("\n\n");
        text.push_str(reply);
    }
    text
}

/// Scorecard for one dialogue turn.
pub fn scorecard(outcome: &TurnOutcome) -> String {
    let reply = outcome
        .reply
        .as_deref()
        .filter(|r| !r.is_empty())
        .unwrap_or(SILENT_CLIENT);
    let mut lines = vec![
        "Client:".to_string(),
        reply.to_string(),
        String::new(),
        "Score:".to_string(),
    ];
    lines.extend(score_lines(&outcome.scores));
    push_tips(&mut lines, &outcome.tips);
    lines.join("\n")
}

/// Final summary for `/stop_dialog`.
pub fn session_summary(outcome: &StopOutcome) -> String {
    let summary = &outcome.summary;
    let mut lines = vec!["Session summary:".to_string()];
    lines.extend(score_lines(&Scores {
        warmth: summary.avg_warmth,
        empathy: summary.avg_empathy,
        questions: summary.avg_questions,
    }));
    push_tips(&mut lines, &outcome.tips);
    lines.join("\n")
}

/// Copy of a session summary for the admin chat.
pub fn admin_copy(manager: ChatId, sid: &str, summary: &str) -> String {
    format!("Manager: {manager}\nSID: {sid}\n\n{summary}")
}

pub fn turn_error(reason: &str) -> String {
    format!("Dialogue error: {reason}")
}

pub fn module_failed(command: &str) -> String {
    format!("Failed to launch module {command}. Please try again later.")
}

pub fn module_rejected(command: &str, reason: &str) -> String {
    format!("Module {command} returned an error: {reason}")
}

fn score_lines(scores: &Scores) -> [String; 3] {
    [
        format!("Warmth: {}/100", scores.warmth),
        format!("Empathy: {}/100", scores.empathy),
        format!("Questions: {}/100", scores.questions),
    ]
}

fn push_tips(lines: &mut Vec<String>, tips: &[String]) {
    if tips.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push("Tips:".to_string());
    lines.extend(tips.iter().map(|t| format!("• {t}")));
}
