//! Output text sanitizer.
//!
//! LLM output occasionally carries artifacts that should never reach a chat
//! transport: HTML/markup tags, code fences, and `Block(<uuid>)` media
//! placeholders from the prompt convention. `clean_text` strips them and is
//! total - malformed input just becomes an empty string, which callers drop.

use regex::Regex;
use std::sync::OnceLock;

fn block_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)`?block\([0-9a-f][0-9a-f-]*\)`?\.?").unwrap())
}

fn markup_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?[a-zA-Z][^<>]*>").unwrap())
}

fn space_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]{2,}").unwrap())
}

fn blank_line_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

/// Clean raw agent text for delivery. Returns an empty string when nothing
/// survives; the caller drops such blocks.
pub fn clean_text(raw: &str) -> String {
    let text = raw.replace("```", "");
    let text = block_ref_re().replace_all(&text, "");
    let text = markup_tag_re().replace_all(&text, "");
    let text = text.replace('`', "");
    let text = space_run_re().replace_all(&text, " ");
    let text = blank_line_run_re().replace_all(&text, "\n\n");
    text.trim().to_string()
}
