use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use super::types::{PlannerResult, Tool};

static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fence pattern is valid")
});

static FIRST_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("object pattern is valid"));

/// Pulls a JSON object out of model output: a fenced code block first, then
/// the outermost brace-delimited span.
pub fn extract_json(text: &str) -> Option<Map<String, Value>> {
    let candidate = FENCED
        .captures(text)
        .and_then(|caps| caps.get(1))
        .or_else(|| FIRST_OBJECT.find(text))?;

    match serde_json::from_str::<Value>(candidate.as_str()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Coerces an arbitrary object into the planner schema.
pub fn normalize(mut obj: Map<String, Value>) -> PlannerResult {
    let tool = match obj.get("tool") {
        Some(Value::String(label)) => label.parse().unwrap_or(Tool::None),
        _ => Tool::None,
    };

    let args = match obj.remove("args") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let say = match obj.remove("say") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    };

    PlannerResult { tool, args, say }
}

/// Interprets the content of one chat reply. `None` means the model said
/// nothing usable and the next candidate should be tried.
pub fn interpret(content: &str) -> Option<PlannerResult> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }

    match extract_json(trimmed) {
        Some(obj) => Some(normalize(obj)),
        None => Some(PlannerResult::say_only(trimmed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_is_preferred() {
        let reply = "Sure!\n```json\n{\"tool\":\"get_time\",\"args\":{},\"say\":\"\"}\n```\nanything else";
        let result = interpret(reply).unwrap();
        assert_eq!(result.tool, Tool::GetTime);
        assert!(result.args.is_empty());
        assert_eq!(result.say.as_deref(), Some(""));
    }

    #[test]
    fn bare_object_inside_prose() {
        let reply = "Here you go {\"tool\":\"open_app\",\"args\":{\"name\":\"notepad\"}} done";
        let result = interpret(reply).unwrap();
        assert_eq!(result.tool, Tool::OpenApp);
        assert_eq!(result.argument(&["name"]).as_deref(), Some("notepad"));
        assert_eq!(result.say, None);
    }

    #[test]
    fn plain_text_becomes_say() {
        let result = interpret("  Paris is the capital of France.  ").unwrap();
        assert_eq!(result.tool, Tool::None);
        assert!(result.args.is_empty());
        assert_eq!(result.say.as_deref(), Some("Paris is the capital of France."));
    }

    #[test]
    fn unknown_tool_and_bad_args_are_coerced() {
        let result = interpret(r#"{"tool":"launch_rocket","args":[1,2],"say":42}"#).unwrap();
        assert_eq!(result.tool, Tool::None);
        assert!(result.args.is_empty());
        assert_eq!(result.say.as_deref(), Some("42"));
    }

    #[test]
    fn tool_label_must_match_exactly() {
        for label in ["GET_TIME", "Get_Time", " get_time", "get_time "] {
            let reply = format!(r#"{{"tool":"{}","args":{{}}}}"#, label);
            assert_eq!(interpret(&reply).unwrap().tool, Tool::None, "'{}' should not resolve", label);
        }
        assert_eq!(interpret(r#"{"tool":"get_time"}"#).unwrap().tool, Tool::GetTime);
    }

    #[test]
    fn non_string_tool_is_none() {
        let result = interpret(r#"{"tool":7}"#).unwrap();
        assert_eq!(result.tool, Tool::None);
    }

    #[test]
    fn broken_json_falls_back_to_raw_text() {
        let result = interpret("{tool: get_time").unwrap();
        assert_eq!(result.tool, Tool::None);
        assert_eq!(result.say.as_deref(), Some("{tool: get_time"));
    }

    #[test]
    fn empty_reply_is_unusable() {
        assert!(interpret("   \n").is_none());
    }
}
