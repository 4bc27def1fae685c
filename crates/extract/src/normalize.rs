use regex::Regex;
use std::sync::OnceLock;

/// Normalize a surface string for grouping and cache keys: lowercase, strip
/// common punctuation, collapse whitespace.
pub fn normalize_surface(surface: &str) -> String {
    static PUNCT: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let punct = PUNCT.get_or_init(|| Regex::new(r"[.,!?;:']").unwrap());
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").unwrap());

    let lowered = surface.to_lowercase();
    let stripped = punct.replace_all(lowered.trim(), "");
    spaces.replace_all(&stripped, " ").trim().to_string()
}
