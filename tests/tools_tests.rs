use auris::error::HandlerError;
use auris::kernel::orchestrator::plan_argument;
use auris::planner::{PlannerResult, Tool};
use auris::tools::builtin::{get_time, register_builtins, set_volume, tell_joke};
use auris::tools::ToolRegistry;
use serde_json::json;

fn plan(tool: Tool, args: serde_json::Value) -> PlannerResult {
    PlannerResult {
        tool,
        args: args.as_object().cloned().unwrap_or_default(),
        say: None,
    }
}

#[tokio::test]
async fn test_builtins_are_registered_and_invocable() {
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry).unwrap();

    assert!(registry.contains(Tool::GetTime));
    assert!(registry.contains(Tool::TellJoke));
    assert!(registry.contains(Tool::SetVolume));
    assert!(!registry.contains(Tool::OpenApp));

    let reply = registry.invoke(Tool::SetVolume, "set volume to 35".to_string()).await.unwrap();
    assert_eq!(reply, "Setting volume to 35 percent.");

    let time = registry.invoke(Tool::GetTime, String::new()).await.unwrap();
    assert!(time.starts_with("It's "));
}

#[test]
fn test_builtin_replies() {
    assert!(get_time("").unwrap().ends_with('.'));
    assert!(!tell_joke("").unwrap().is_empty());
    assert_eq!(set_volume("louder").unwrap(), "What volume level should I set? (0-100)");
    assert_eq!(set_volume("volume 140").unwrap(), "Setting volume to 100 percent.");
}

#[tokio::test]
async fn test_registry_boundaries() {
    let mut registry = ToolRegistry::new();
    assert!(matches!(
        registry.register(Tool::None, |_: &str| -> Result<String, HandlerError> { Ok(String::new()) }),
        Err(HandlerError::Reserved)
    ));

    registry
        .register(Tool::ListApps, |_: &str| -> Result<String, HandlerError> { Ok("notepad, chrome".to_string()) })
        .unwrap();

    assert_eq!(registry.resolve("list_apps").unwrap(), Tool::ListApps);
    assert_eq!(registry.resolve("LIST_APPS").unwrap(), Tool::ListApps);
    assert!(matches!(registry.resolve("connect_wifi"), Err(HandlerError::UnknownTool(_))));
    assert!(matches!(registry.resolve("open_app"), Err(HandlerError::Unregistered(Tool::OpenApp))));
    assert!(matches!(
        registry.invoke(Tool::CloseApp, String::new()).await,
        Err(HandlerError::Unregistered(Tool::CloseApp))
    ));
}

#[tokio::test]
async fn test_panicking_handler_is_contained() {
    let mut registry = ToolRegistry::new();
    registry
        .register(Tool::RescanApps, |_: &str| -> Result<String, HandlerError> { panic!("index corrupted") })
        .unwrap();

    let result = registry.invoke(Tool::RescanApps, String::new()).await;
    assert!(matches!(result, Err(HandlerError::Panicked(Tool::RescanApps))));
}

#[test]
fn test_plan_argument_precedence() {
    let named = plan(Tool::OpenApp, json!({ "name": "calculator", "filter": "calc" }));
    assert_eq!(plan_argument(&named, "open the calculator"), "calculator");

    let filtered = plan(Tool::ListApps, json!({ "filter": "music" }));
    assert_eq!(plan_argument(&filtered, "list music apps"), "music");

    let numeric = plan(Tool::SetVolume, json!({ "percent": 70 }));
    assert_eq!(plan_argument(&numeric, "volume up"), "70");

    let bare_app = plan(Tool::OpenApp, json!({}));
    assert_eq!(plan_argument(&bare_app, "please open the text editor"), "notepad");

    let bare = plan(Tool::TellJoke, json!({ "name": "  " }));
    assert_eq!(plan_argument(&bare, "make me laugh"), "make me laugh");
}
