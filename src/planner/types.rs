use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The closed tool vocabulary shared by the router catalog, the planner
/// instruction and the handler registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    OpenApp,
    CloseApp,
    CloseAllApps,
    RescanApps,
    ListApps,
    SetVolume,
    GetTime,
    TellJoke,
    /// No tool; the planner answered in prose (or not at all).
    None,
}

impl Tool {
    /// Every dispatchable tool, in instruction order.
    pub const DISPATCHABLE: [Tool; 8] = [
        Tool::OpenApp,
        Tool::CloseApp,
        Tool::CloseAllApps,
        Tool::RescanApps,
        Tool::ListApps,
        Tool::SetVolume,
        Tool::GetTime,
        Tool::TellJoke,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::OpenApp => "open_app",
            Tool::CloseApp => "close_app",
            Tool::CloseAllApps => "close_all_apps",
            Tool::RescanApps => "rescan_apps",
            Tool::ListApps => "list_apps",
            Tool::SetVolume => "set_volume",
            Tool::GetTime => "get_time",
            Tool::TellJoke => "tell_joke",
            Tool::None => "none",
        }
    }

    /// Argument names the instruction advertises for this tool.
    pub fn arg_hint(&self) -> &'static str {
        match self {
            Tool::OpenApp | Tool::CloseApp => "{name}",
            Tool::SetVolume => "{percent}",
            _ => "{}",
        }
    }

    /// App tools fall back to an extracted application name when the planner omits one.
    pub fn targets_app(&self) -> bool {
        matches!(self, Tool::OpenApp | Tool::CloseApp)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = String;

    /// Exact wire label only; `"GET_TIME"` or `" get_time"` is not a tool.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::DISPATCHABLE
            .iter()
            .chain(std::iter::once(&Tool::None))
            .find(|tool| tool.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

/// A normalised planner answer. Always well-formed: malformed replies are
/// coerced before one of these is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerResult {
    pub tool: Tool,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub say: Option<String>,
}

impl PlannerResult {
    pub fn say_only(text: impl Into<String>) -> Self {
        Self {
            tool: Tool::None,
            args: Map::new(),
            say: Some(text.into()),
        }
    }

    /// First present argument among `keys`, rendered as text.
    pub fn argument(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.args.get(*key)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        })
    }
}
