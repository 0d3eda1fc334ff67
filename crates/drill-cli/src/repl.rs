//! Interactive practice commands and their terminal rendering.
//!
//! Slot numbers are 1-based on the terminal and converted to 0-based indices
//! here.

use std::fmt::Write as _;

use drill_session::{
    DifficultyTier, FeedbackSkip, SessionEvent, SessionSnapshot, SessionStatus, SlotView,
    BATCH_SIZE,
};

/// Help text printed by `help`.
pub const HELP: &str = "\
Commands:
  tier <level>       pick a random word at a tier (beginner..advanced or 1-5)
  random             pick a random word at the current tier
  word <text>        practice a word of your choice
  show               print the current batch
  toggle <n>         switch slot n between the reference and practice view
  type <n> <text>    set your attempt for slot n and show its score
  feedback <n>       ask for feedback on slot n
  help               show this help
  quit               leave the session";

/// A parsed terminal command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Select a random word at a tier.
    Tier(DifficultyTier),
    /// Select a random word at the current tier.
    Random,
    /// Load a typed word.
    Word(String),
    /// Print the session.
    Show,
    /// Toggle a slot.
    Toggle(usize),
    /// Replace a slot's practice text.
    Type(usize, String),
    /// Request feedback for a slot.
    Feedback(usize),
    /// Print help.
    Help,
    /// Leave.
    Quit,
}

impl Command {
    /// Parses one input line.
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (name, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(name, rest)| (name, rest.trim()));

        let command = match name.to_lowercase().as_str() {
            "tier" => Self::Tier(rest.parse().map_err(|e| format!("{e}"))?),
            "random" | "r" => Self::Random,
            "word" | "w" => {
                if rest.is_empty() {
                    return Err("usage: word <text>".to_string());
                }
                Self::Word(rest.to_string())
            }
            "show" | "s" => Self::Show,
            "toggle" | "t" => Self::Toggle(parse_slot(rest)?),
            "type" => {
                let (slot, text) = rest
                    .split_once(char::is_whitespace)
                    .map_or((rest, ""), |(slot, text)| (slot, text.trim()));
                Self::Type(parse_slot(slot)?, text.to_string())
            }
            "feedback" | "f" => Self::Feedback(parse_slot(rest)?),
            "help" | "h" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command '{other}' (type 'help')")),
        };
        Ok(Some(command))
    }
}

/// Parses a 1-based slot number into a 0-based index.
fn parse_slot(raw: &str) -> Result<usize, String> {
    let n: usize = raw
        .trim()
        .parse()
        .map_err(|_| format!("expected a slot number from 1 to {BATCH_SIZE}"))?;
    if n == 0 || n > BATCH_SIZE {
        return Err(format!("slot numbers run from 1 to {BATCH_SIZE}"));
    }
    Ok(n - 1)
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders one slot.
#[must_use]
pub fn render_slot(slot: &SlotView) -> String {
    let mut out = String::new();
    let number = slot.index + 1;
    let Some(example) = &slot.example else {
        let _ = write!(out, "[{number}] -");
        return out;
    };

    if slot.practicing {
        let _ = write!(out, "[{number}] (practice) > {}", slot.practice_text);
        if let Some(score) = slot.score {
            let marker = if slot.perfect { " perfect!" } else { "" };
            let _ = write!(out, "  [{score}%{marker}]");
        }
    } else {
        let _ = writeln!(out, "[{number}] {}", example.sentence);
        let _ = writeln!(out, "    {}", example.translation);
        if !example.context.is_empty() {
            let _ = writeln!(out, "    context: {}", example.context);
        }
        if !example.grammar.is_empty() {
            let _ = writeln!(out, "    grammar: {}", example.grammar);
        }
        out.truncate(out.trim_end().len());
    }

    if slot.feedback_pending {
        let _ = write!(out, "\n    feedback: waiting...");
    } else if let Some(feedback) = &slot.feedback {
        let _ = write!(out, "\n    feedback: {feedback}");
    }
    out
}

/// Renders the whole session.
#[must_use]
pub fn render_snapshot(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    let word = snapshot.current_word.as_deref().unwrap_or("-");
    let _ = writeln!(
        out,
        "Word: {word}   Tier: {}   Status: {}",
        snapshot.difficulty, snapshot.status
    );

    match snapshot.status {
        SessionStatus::Idle => {
            let _ = write!(out, "No batch loaded. Try 'random' or 'word <text>'.");
        }
        SessionStatus::Loading => {
            let _ = write!(out, "Loading examples...");
        }
        SessionStatus::Ready => {
            let slots: Vec<String> = snapshot.slots.iter().map(render_slot).collect();
            let _ = write!(out, "{}", slots.join("\n"));
        }
    }
    out
}

/// Describes a skipped feedback request.
#[must_use]
pub fn describe_skip(index: usize, reason: FeedbackSkip) -> String {
    format!("No feedback for slot {}: {reason}", index + 1)
}

/// Renders a broadcast event for the terminal.
///
/// Returns `None` for events the terminal does not show.
#[must_use]
pub fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Connected(_) => None,
        SessionEvent::LoadStarted(payload) => Some(format!(
            "Loading examples for '{}' ({})...",
            payload.word, payload.tier
        )),
        SessionEvent::BatchLoaded(payload) => Some(render_snapshot(&payload.snapshot)),
        SessionEvent::LoadFailed(payload) => Some(format!(
            "Could not load '{}': {}",
            payload.word, payload.message
        )),
        SessionEvent::FeedbackSettled(payload) => Some(payload.feedback.as_ref().map_or_else(
            || format!("Feedback for slot {} is unavailable right now", payload.index + 1),
            |feedback| format!("Feedback for slot {}: {feedback}", payload.index + 1),
        )),
        SessionEvent::Notice(payload) => Some(payload.message.clone()),
    }
}
