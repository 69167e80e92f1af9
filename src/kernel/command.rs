use regex::Regex;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9']+").expect("word pattern is valid"));

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})\s*%?").expect("percent pattern is valid"));

const QUESTION_OPENERS: [&str; 8] = [
    "what ", "who ", "how ", "why ", "when ", "where ", "tell me ", "explain ",
];

const APP_SYNONYMS: [(&str, &[&str]); 4] = [
    ("notepad", &["notepad", "text editor", "editor"]),
    ("calculator", &["calculator", "calc"]),
    ("browser", &["browser", "chrome", "edge", "firefox"]),
    ("explorer", &["file explorer", "explorer", "my computer", "files"]),
];

const FILLER: [&str; 26] = [
    "open", "launch", "start", "run", "close", "quit", "exit", "kill", "stop", "please",
    "the", "a", "an", "my", "app", "application", "program", "software", "now", "me", "to",
    "hey", "can", "you", "could", "would",
];

fn words(lowered: &str) -> Vec<&str> {
    WORD.find_iter(lowered).map(|m| m.as_str()).collect()
}

fn contains_run(haystack: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

/// True when `text` equals, starts with, or contains a stop phrase as whole words.
pub fn is_stop_phrase(text: &str, phrases: &[String]) -> bool {
    let lowered = text.trim().to_lowercase();
    let spoken = words(&lowered);
    if spoken.is_empty() {
        return false;
    }

    phrases.iter().any(|phrase| {
        let phrase = phrase.to_lowercase();
        contains_run(&spoken, &words(&phrase))
    })
}

/// General questions go straight to the planner.
pub fn looks_like_question(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered.ends_with('?') || QUESTION_OPENERS.iter().any(|p| lowered.starts_with(p))
}

/// Canonical application name from the synonym table.
pub fn canonical_app(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    let spoken = words(&lowered);

    APP_SYNONYMS.iter().find_map(|(canonical, synonyms)| {
        synonyms
            .iter()
            .any(|s| contains_run(&spoken, &words(s)))
            .then_some(*canonical)
    })
}

/// What is left once command verbs and filler are stripped.
pub fn guess_app_query(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    let rest: Vec<&str> = words(&lowered)
        .into_iter()
        .filter(|w| !FILLER.contains(w))
        .collect();

    if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    }
}

pub fn extract_app_name(text: &str) -> Option<String> {
    canonical_app(text)
        .map(str::to_string)
        .or_else(|| guess_app_query(text))
}

/// First one-to-three digit number, clamped to 0..=100.
pub fn extract_volume(text: &str) -> Option<u8> {
    let caps = PERCENT.captures(text)?;
    let value: u32 = caps.get(1)?.as_str().parse().ok()?;
    Some(value.min(100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Vec<String> {
        crate::config::SessionSettings::default().stop_phrases
    }

    #[test]
    fn stop_phrase_word_boundaries() {
        let phrases = defaults();
        assert!(is_stop_phrase("sleep", &phrases));
        assert!(is_stop_phrase("ok sleep now", &phrases));
        assert!(is_stop_phrase("Sleep.", &phrases));
        assert!(is_stop_phrase("please stop listening", &phrases));
        assert!(!is_stop_phrase("asleep", &phrases));
        assert!(!is_stop_phrase("byebye", &phrases));
        assert!(!is_stop_phrase("", &phrases));
    }

    #[test]
    fn question_heuristic() {
        assert!(looks_like_question("what is the capital of France"));
        assert!(looks_like_question("is it raining?"));
        assert!(looks_like_question("Tell me a joke"));
        assert!(!looks_like_question("open notepad"));
        assert!(!looks_like_question("whatever"));
    }

    #[test]
    fn app_names() {
        assert_eq!(extract_app_name("open the text editor").as_deref(), Some("notepad"));
        assert_eq!(extract_app_name("launch chrome please").as_deref(), Some("browser"));
        assert_eq!(extract_app_name("open spotify").as_deref(), Some("spotify"));
        assert_eq!(extract_app_name("open the app"), None);
    }

    #[test]
    fn volume_values() {
        assert_eq!(extract_volume("set volume to 50%"), Some(50));
        assert_eq!(extract_volume("volume 250"), Some(100));
        assert_eq!(extract_volume("louder"), None);
    }
}
