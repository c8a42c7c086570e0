//! Progress estimation from engine output.
//!
//! The engine prints free text, so progress is inferred by matching
//! lowercase phrases against an ordered rule table. The first matching rule
//! wins and progress never goes backwards.

/// Progress reported right after the engine is spawned.
pub const SPAWNED_PROGRESS: f64 = 0.1;

/// Progress reported on successful completion.
pub const COMPLETED_PROGRESS: f64 = 1.0;

/// How a rule matches a lowercased chunk.
#[derive(Debug, Clone, Copy)]
pub enum Phrase {
    /// Any of the substrings.
    Any(&'static [&'static str]),
    /// All of the substrings.
    All(&'static [&'static str]),
}

impl Phrase {
    fn matches(&self, lowercased: &str) -> bool {
        match self {
            Self::Any(needles) => needles.iter().any(|n| lowercased.contains(n)),
            Self::All(needles) => needles.iter().all(|n| lowercased.contains(n)),
        }
    }
}

/// Raises progress to `threshold` when `phrase` appears.
#[derive(Debug, Clone, Copy)]
pub struct ProgressRule {
    pub phrase: Phrase,
    pub threshold: f64,
}

impl ProgressRule {
    const fn new(phrase: Phrase, threshold: f64) -> Self {
        Self { phrase, threshold }
    }

    /// Threshold if this rule matches the (already lowercased) text.
    pub fn apply(&self, lowercased: &str) -> Option<f64> {
        self.phrase.matches(lowercased).then_some(self.threshold)
    }
}

/// Engine phases in the order the engine runs them.
pub const PROGRESS_RULES: &[ProgressRule] = &[
    ProgressRule::new(Phrase::Any(&["mounting", "extracting"]), 0.2),
    ProgressRule::new(Phrase::Any(&["expanding"]), 0.3),
    ProgressRule::new(Phrase::Any(&["copying"]), 0.4),
    ProgressRule::new(Phrase::Any(&["preparing package"]), 0.5),
    ProgressRule::new(Phrase::All(&["creating", "script"]), 0.6),
    ProgressRule::new(Phrase::Any(&["pkgbuild"]), 0.7),
    ProgressRule::new(Phrase::Any(&["productbuild"]), 0.8),
    ProgressRule::new(Phrase::Any(&["signing"]), 0.85),
    ProgressRule::new(Phrase::Any(&["completed successfully"]), 0.95),
];

/// Threshold of the first rule matching `chunk`, if any.
pub fn estimate(chunk: &str) -> Option<f64> {
    let lowercased = chunk.to_lowercase();
    PROGRESS_RULES.iter().find_map(|rule| rule.apply(&lowercased))
}

/// Monotonic progress value in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress(f64);

impl Progress {
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Raises progress to `value` if higher. Returns whether it moved.
    pub fn raise(&mut self, value: f64) -> bool {
        let value = value.clamp(0.0, COMPLETED_PROGRESS);
        if value > self.0 {
            self.0 = value;
            true
        } else {
            false
        }
    }

    /// Feeds an output chunk through the rule table.
    pub fn observe(&mut self, chunk: &str) -> bool {
        estimate(chunk).is_some_and(|threshold| self.raise(threshold))
    }
}

/// Longest unfinished line kept for phrase matching, in bytes.
pub const OPEN_LINE_LIMIT: usize = 4096;

/// Reassembles lines from output chunks of arbitrary size.
///
/// Engine output arrives as whatever each read returned, so a phase marker
/// may be split across chunks or never get its newline. The window keeps the
/// unfinished line and hands back every line a chunk touched.
#[derive(Debug, Clone, Default)]
pub struct LineWindow {
    open: String,
}

impl LineWindow {
    /// Lines touched by `chunk`: finished lines keep their `\n`, the last
    /// entry is the unfinished line so far (including earlier chunks).
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        let mut text = std::mem::take(&mut self.open);
        text.push_str(chunk);

        let lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
        if let Some(last) = lines.last().filter(|line| !line.ends_with('\n')) {
            self.open = keep_tail(last, OPEN_LINE_LIMIT).to_string();
        }
        lines
    }

    /// The unfinished line.
    pub fn open(&self) -> &str {
        &self.open
    }

    /// Takes the unfinished line, leaving the window empty.
    pub fn flush(&mut self) -> Option<String> {
        if self.open.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.open))
        }
    }
}

fn keep_tail(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut start = text.len() - limit;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
