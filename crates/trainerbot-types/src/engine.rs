//! Wire types for the generic engine contract.
//!
//! Every backend module exposes the same request/response shapes, so the
//! dispatcher never needs module-specific code:
//!
//! - `probe`: `{probe: true, chat_id}` -> `{ok: true, available: true}`, side-effect free
//! - `start`: `{chat_id}` or `{manager_id, scenario_id}` -> `{ok, sid|session_id, reply?}`
//! - `turn`: `{sid, text}` -> `{reply, eval?: {scores, tips}}` or `{error}`
//! - `stop`: `{sid}` -> `{summary, tips}` or `{error}`
//! - `snapshot`: opaque module state
//!
//! Responses are parsed leniently: unknown fields are ignored and missing
//! fields take defaults. Protocol-level failure is signalled by an `error`
//! key or `ok: false`, never by the HTTP layer alone.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ModuleError;
use crate::session::ChatId;

/// Error string a trainer returns when it no longer knows a session id.
pub const SESSION_NOT_FOUND: &str = "session_not_found";

/// Body of the backend's attached-module summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutesSummary {
    /// Dotted import paths, e.g. `modules.arena.v4.routes`.
    #[serde(default)]
    pub attached: Vec<String>,
    /// Modules the backend failed to attach; informational.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Discovery request sent to a candidate endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRequest {
    pub probe: bool,
    pub chat_id: ChatId,
}

impl ProbeRequest {
    /// The discovery marker with a neutral placeholder identity.
    pub fn discovery() -> Self {
        Self {
            probe: true,
            chat_id: 0,
        }
    }
}

/// Acknowledgement a module returns to a probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeAck {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub available: bool,
}

impl ProbeAck {
    /// The module answered and says it can serve requests.
    pub fn is_available(&self) -> bool {
        self.ok && self.available
    }
}

/// What a candidate endpoint answered to a probe.
///
/// `ack` is only decoded from 2xx responses with a JSON body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeReply {
    pub status: u16,
    pub ack: Option<ProbeAck>,
}

impl ProbeReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single-shot module invocation keyed by the chat identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInvocation {
    pub chat_id: ChatId,
}

/// Request that opens a long-running trainer session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub manager_id: String,
    pub scenario_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub sid: Option<Value>,
    #[serde(default)]
    pub session_id: Option<Value>,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// A trainer session that started successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedSession {
    pub sid: String,
    pub reply: Option<String>,
}

impl StartResponse {
    /// Validate the response and extract the session id.
    ///
    /// `error` or `ok: false` is a rejection; a body without `sid` or
    /// `session_id` is a missing-field failure.
    pub fn into_started(self) -> Result<StartedSession, ModuleError> {
        if let Some(error) = &self.error {
            return Err(ModuleError::from_error_value(error));
        }
        if self.ok == Some(false) {
            return Err(rejection(self.reply.as_deref()));
        }
        let sid = self
            .sid
            .as_ref()
            .and_then(id_string)
            .or_else(|| self.session_id.as_ref().and_then(id_string))
            .ok_or(ModuleError::MissingField("sid"))?;
        Ok(StartedSession {
            sid,
            reply: self.reply.filter(|r| !r.is_empty()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub sid: String,
    pub text: String,
}

/// Per-turn evaluation scores, each on a 0..=100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    #[serde(default, deserialize_with = "lenient_score")]
    pub warmth: f64,
    #[serde(default, deserialize_with = "lenient_score")]
    pub empathy: f64,
    #[serde(default, deserialize_with = "lenient_score")]
    pub questions: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub scores: Scores,
    #[serde(default)]
    pub tips: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub eval: Option<Evaluation>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// A scored dialogue turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    pub reply: Option<String>,
    pub scores: Scores,
    pub tips: Vec<String>,
}

impl TurnResponse {
    pub fn into_outcome(self) -> Result<TurnOutcome, ModuleError> {
        if let Some(error) = &self.error {
            return Err(ModuleError::from_error_value(error));
        }
        if self.ok == Some(false) {
            return Err(rejection(self.reply.as_deref()));
        }
        let eval = self.eval.unwrap_or_default();
        Ok(TurnOutcome {
            reply: self.reply,
            scores: eval.scores,
            tips: eval.tips.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRequest {
    pub sid: String,
}

/// Session-level averages returned when a trainer session stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(default, deserialize_with = "lenient_score")]
    pub avg_warmth: f64,
    #[serde(default, deserialize_with = "lenient_score")]
    pub avg_empathy: f64,
    #[serde(default, deserialize_with = "lenient_score")]
    pub avg_questions: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub summary: Option<SessionSummary>,
    #[serde(default)]
    pub tips: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Final scoring of a stopped session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopOutcome {
    pub summary: SessionSummary,
    pub tips: Vec<String>,
}

impl StopResponse {
    pub fn into_outcome(self) -> Result<StopOutcome, ModuleError> {
        if let Some(error) = &self.error {
            return Err(ModuleError::from_error_value(error));
        }
        if self.ok == Some(false) {
            return Err(rejection(None));
        }
        Ok(StopOutcome {
            summary: self.summary.unwrap_or_default(),
            tips: self.tips.unwrap_or_default(),
        })
    }
}

/// Extract the user-facing text from a single-shot module response.
///
/// Picks `reply`, then `result`, then the whole body, skipping empty
/// values. Strings are returned as-is; structured values are pretty-printed
/// JSON. A body carrying an `error` key or `ok: false` is a rejection.
pub fn extract_module_reply(body: &Value) -> Result<String, ModuleError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        return Err(ModuleError::from_error_value(error));
    }
    if body.get("ok") == Some(&Value::Bool(false)) {
        let message = ["reply", "result"]
            .iter()
            .filter_map(|key| body.get(*key))
            .find_map(Value::as_str)
            .filter(|m| !m.is_empty());
        return Err(rejection(message));
    }

    let chosen = ["reply", "result"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find(|v| is_truthy(v))
        .unwrap_or(body);

    Ok(match chosen {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    })
}

/// `ok: false` rejection, carrying the module's own message when it sent one.
fn rejection(message: Option<&str>) -> ModuleError {
    let reason = message.filter(|m| !m.is_empty()).unwrap_or("ok: false");
    ModuleError::Rejected(reason.to_string())
}

/// Score values arrive as numbers, numeric strings or null; anything
/// unusable counts as zero.
fn lenient_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Render a session identifier that may arrive as a string or a number.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_response_with_sid() {
        let resp: StartResponse = serde_json::from_value(json!({"ok": true, "sid": "42"})).unwrap();
        let started = resp.into_started().unwrap();
        assert_eq!(started.sid, "42");
        assert!(started.reply.is_none());
    }

    #[test]
    fn test_start_response_accepts_session_id_and_numbers() {
        let resp: StartResponse =
            serde_json::from_value(json!({"session_id": 99, "reply": "hi"})).unwrap();
        let started = resp.into_started().unwrap();
        assert_eq!(started.sid, "99");
        assert_eq!(started.reply.as_deref(), Some("hi"));
    }

    #[test]
    fn test_start_response_rejections() {
        let resp: StartResponse = serde_json::from_value(json!({"error": "boom"})).unwrap();
        assert!(matches!(resp.into_started(), Err(ModuleError::Rejected(m)) if m == "boom"));

        let resp: StartResponse = serde_json::from_value(json!({"ok": false, "sid": "1"})).unwrap();
        assert!(matches!(resp.into_started(), Err(ModuleError::Rejected(_))));

        let resp: StartResponse = serde_json::from_value(json!({"ok": true})).unwrap();
        assert!(matches!(resp.into_started(), Err(ModuleError::MissingField("sid"))));
    }

    #[test]
    fn test_turn_response_session_not_found() {
        let resp: TurnResponse =
            serde_json::from_value(json!({"error": "session_not_found"})).unwrap();
        assert!(matches!(resp.into_outcome(), Err(ModuleError::SessionNotFound)));
    }

    #[test]
    fn test_turn_response_defaults() {
        let resp: TurnResponse =
            serde_json::from_value(json!({"reply": "Hello", "eval": {"tips": null}})).unwrap();
        let outcome = resp.into_outcome().unwrap();
        assert_eq!(outcome.reply.as_deref(), Some("Hello"));
        assert_eq!(outcome.scores, Scores::default());
        assert!(outcome.tips.is_empty());
    }

    #[test]
    fn test_turn_response_ok_false_is_rejection() {
        let resp: TurnResponse =
            serde_json::from_value(json!({"ok": false, "reply": "scenario closed"})).unwrap();
        assert_eq!(
            resp.into_outcome(),
            Err(ModuleError::Rejected("scenario closed".to_string()))
        );

        let resp: StopResponse = serde_json::from_value(json!({"ok": false})).unwrap();
        assert_eq!(
            resp.into_outcome(),
            Err(ModuleError::Rejected("ok: false".to_string()))
        );
    }

    #[test]
    fn test_scores_parse_leniently() {
        let resp: TurnResponse = serde_json::from_value(json!({
            "reply": "Maybe later.",
            "eval": {"scores": {"warmth": "70", "empathy": null, "questions": 12.5}}
        }))
        .unwrap();
        let outcome = resp.into_outcome().unwrap();
        assert_eq!(outcome.reply.as_deref(), Some("Maybe later."));
        assert_eq!(outcome.scores.warmth, 70.0);
        assert_eq!(outcome.scores.empathy, 0.0);
        assert_eq!(outcome.scores.questions, 12.5);

        let resp: TurnResponse =
            serde_json::from_value(json!({"reply": "Hm.", "eval": {"scores": null}})).unwrap();
        assert_eq!(resp.into_outcome().unwrap().scores, Scores::default());

        let resp: StopResponse = serde_json::from_value(json!({
            "summary": {"avg_warmth": "65.5", "avg_empathy": null, "avg_questions": "n/a"}
        }))
        .unwrap();
        let summary = resp.into_outcome().unwrap().summary;
        assert_eq!(summary.avg_warmth, 65.5);
        assert_eq!(summary.avg_empathy, 0.0);
        assert_eq!(summary.avg_questions, 0.0);
    }

    #[test]
    fn test_stop_response_summary() {
        let resp: StopResponse = serde_json::from_value(json!({
            "summary": {"avg_warmth": 70, "avg_empathy": 55.5},
            "tips": ["ask more"]
        }))
        .unwrap();
        let outcome = resp.into_outcome().unwrap();
        assert_eq!(outcome.summary.avg_warmth, 70.0);
        assert_eq!(outcome.summary.avg_questions, 0.0);
        assert_eq!(outcome.tips, vec!["ask more".to_string()]);
    }

    #[test]
    fn test_extract_module_reply_prefers_reply() {
        let body = json!({"reply": "Arena started", "result": "ignored"});
        assert_eq!(extract_module_reply(&body).unwrap(), "Arena started");
    }

    #[test]
    fn test_extract_module_reply_falls_back_to_result_then_body() {
        let body = json!({"reply": "", "result": {"score": 3}});
        let text = extract_module_reply(&body).unwrap();
        assert!(text.contains("\"score\": 3"));

        let body = json!({"ok": true});
        let text = extract_module_reply(&body).unwrap();
        assert!(text.contains("\"ok\": true"));
    }

    #[test]
    fn test_extract_module_reply_error_key() {
        let body = json!({"error": "chat_id required"});
        assert!(matches!(
            extract_module_reply(&body),
            Err(ModuleError::Rejected(m)) if m == "chat_id required"
        ));
    }

    #[test]
    fn test_extract_module_reply_ok_false() {
        let body = json!({"ok": false, "reply": "module disabled"});
        assert_eq!(
            extract_module_reply(&body),
            Err(ModuleError::Rejected("module disabled".to_string()))
        );

        let body = json!({"ok": false});
        assert_eq!(
            extract_module_reply(&body),
            Err(ModuleError::Rejected("ok: false".to_string()))
        );
    }

    #[test]
    fn test_discovery_reply_success_and_availability() {
        let ack: ProbeAck = serde_json::from_value(json!({"ok": true})).unwrap();
        assert!(!ack.is_available());

        let reply = ProbeReply {
            status: 204,
            ack: None,
        };
        assert!(reply.is_success());
        assert!(!ProbeReply { status: 302, ack: None }.is_success());
    }

    #[test]
    fn test_probe_request_marker() {
        let json = serde_json::to_value(ProbeRequest::discovery()).unwrap();
        assert_eq!(json, json!({"probe": true, "chat_id": 0}));
    }
}
