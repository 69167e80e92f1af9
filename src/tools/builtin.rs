use chrono::Local;
use rand::seq::SliceRandom;

use super::ToolRegistry;
use crate::error::HandlerError;
use crate::kernel::command::extract_volume;
use crate::planner::types::Tool;

const JOKES: [&str; 5] = [
    "I told my computer I needed a break, and it said no problem, it would go to sleep.",
    "Why do programmers prefer dark mode? Because light attracts bugs.",
    "There are ten kinds of people: those who understand binary and those who don't.",
    "I would tell you a UDP joke, but you might not get it.",
    "My code never has bugs. It just develops random features.",
];

pub fn get_time(_arg: &str) -> Result<String, HandlerError> {
    Ok(Local::now().format("It's %I:%M %p on %A, %d %B %Y.").to_string())
}

pub fn tell_joke(_arg: &str) -> Result<String, HandlerError> {
    let joke = JOKES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(JOKES[0]);
    Ok(joke.to_string())
}

/// Volume control is not wired to the OS; the level is parsed and echoed.
pub fn set_volume(arg: &str) -> Result<String, HandlerError> {
    match extract_volume(arg) {
        Some(level) => Ok(format!("Setting volume to {} percent.", level)),
        None => Ok("What volume level should I set? (0-100)".to_string()),
    }
}

pub fn register_builtins(registry: &mut ToolRegistry) -> Result<(), HandlerError> {
    registry.register(Tool::GetTime, get_time)?;
    registry.register(Tool::TellJoke, tell_joke)?;
    registry.register(Tool::SetVolume, set_volume)?;
    Ok(())
}
