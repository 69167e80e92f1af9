use super::types::IntentSpec;
use crate::planner::types::Tool;

/// The built-in intent table.
pub fn default_intents() -> Vec<IntentSpec> {
    vec![
        IntentSpec::new("open_app", Tool::OpenApp).examples([
            "open notepad",
            "launch calculator",
            "start the browser",
            "open file explorer",
            "open my files",
            "start chrome",
            "open spotify",
        ]),
        IntentSpec::new("close_app", Tool::CloseApp).examples([
            "close chrome",
            "quit edge",
            "exit notepad",
            "close visual studio code",
            "kill spotify",
            "stop browser",
        ]),
        IntentSpec::new("rescan_apps", Tool::RescanApps).examples([
            "rescan apps",
            "scan apps",
            "rebuild app index",
            "refresh apps",
        ]),
        IntentSpec::new("close_all_apps", Tool::CloseAllApps).examples([
            "close all the apps",
            "close everything you opened",
            "close all apps",
            "shut everything you started",
        ]),
        IntentSpec::new("list_apps", Tool::ListApps).examples([
            "what apps can you open",
            "what can you open",
            "list apps",
            "show installed apps",
            "which apps can you launch",
        ]),
        IntentSpec::new("get_time", Tool::GetTime).examples([
            "what time is it",
            "tell me the time",
            "current time",
            "what day is it",
            "date today",
        ]),
        IntentSpec::new("tell_joke", Tool::TellJoke).examples([
            "tell me a joke",
            "make me laugh",
            "joke please",
            "say a joke",
        ]),
        IntentSpec::new("set_volume", Tool::SetVolume)
            .examples([
                "set volume to 50%",
                "volume 30",
                "increase volume to 80",
                "decrease volume to 20",
            ])
            .anchors(["volume"]),
    ]
}
