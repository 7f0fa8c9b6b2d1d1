// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Utility-class resolution.
//!
//! Translates a space-separated utility-class string (the `class` attribute
//! of an element) into element option expressions and text-style method
//! chains for the generated code.
//!
//! Resolution for one token:
//!
//! 1. The static table maps fixed classes (`flex-col`, `justify-center`,
//!    named colors, ...) directly to an option or a text-style method.
//! 2. Parameterized patterns are matched by regular expressions in a fixed
//!    order: spacing, sizing, fractional sizing, flex factors, gradients.
//! 3. Anything else is unknown: validation reports it with a "did you mean"
//!    suggestion, and emission omits it.
//!
//! Individual-side spacing classes (`pt-2`, `px-1`, ...) feed a four-slot
//! accumulator and collapse into a single `tui.WithPadding(t, r, b, l)`
//! option (same for margin).
//!
//! [`class_spans`] reports per-token validity with column ranges relative to
//! the attribute value, so the analyzer can produce range-precise
//! diagnostics.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// What a single utility class resolves to.
#[derive(Debug, Clone, PartialEq)]
enum ClassEntry {
    /// An element option expression, e.g. `tui.WithGap(2)`.
    Option(String),
    /// A text-style method call, e.g. `Bold()`, chained off
    /// `tui.NewTextStyle()` by the consumer.
    TextMethod(String),
}

/// Named terminal colors understood by color-bearing classes.
const COLORS: &[&str] = &[
    "black", "red", "green", "yellow", "blue", "magenta", "cyan", "white", "gray",
    "bright-red", "bright-green", "bright-yellow", "bright-blue", "bright-magenta",
    "bright-cyan", "bright-white",
];

/// `red` -> `tui.ColorRed`, `bright-red` -> `tui.ColorBrightRed`.
fn color_const(name: &str) -> String {
    let mut out = String::from("tui.Color");
    for part in name.split('-') {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

lazy_static! {
    static ref STATIC_CLASSES: HashMap<&'static str, ClassEntry> = {
        use ClassEntry::{Option as Opt, TextMethod as Method};
        let mut m = HashMap::new();

        // Layout
        m.insert("flex-row", Opt("tui.WithDirection(tui.Horizontal)".into()));
        m.insert("flex-col", Opt("tui.WithDirection(tui.Vertical)".into()));
        m.insert("justify-start", Opt("tui.WithJustify(tui.JustifyStart)".into()));
        m.insert("justify-center", Opt("tui.WithJustify(tui.JustifyCenter)".into()));
        m.insert("justify-end", Opt("tui.WithJustify(tui.JustifyEnd)".into()));
        m.insert("justify-between", Opt("tui.WithJustify(tui.JustifyBetween)".into()));
        m.insert("items-start", Opt("tui.WithAlign(tui.AlignStart)".into()));
        m.insert("items-center", Opt("tui.WithAlign(tui.AlignCenter)".into()));
        m.insert("items-end", Opt("tui.WithAlign(tui.AlignEnd)".into()));
        m.insert("self-start", Opt("tui.WithAlignSelf(tui.AlignStart)".into()));
        m.insert("self-center", Opt("tui.WithAlignSelf(tui.AlignCenter)".into()));
        m.insert("self-end", Opt("tui.WithAlignSelf(tui.AlignEnd)".into()));

        // Borders
        m.insert("border", Opt("tui.WithBorder(tui.BorderNormal)".into()));
        m.insert("border-rounded", Opt("tui.WithBorder(tui.BorderRounded)".into()));
        m.insert("border-double", Opt("tui.WithBorder(tui.BorderDouble)".into()));
        m.insert("border-thick", Opt("tui.WithBorder(tui.BorderThick)".into()));

        // Behavior
        m.insert("scrollable", Opt("tui.WithScrollable(true)".into()));
        m.insert("focusable", Opt("tui.WithFocusable(true)".into()));

        // Keyword sizing
        m.insert("w-full", Opt("tui.WithWidthPercent(100)".into()));
        m.insert("w-auto", Opt("tui.WithWidthAuto()".into()));
        m.insert("h-full", Opt("tui.WithHeightPercent(100)".into()));
        m.insert("h-auto", Opt("tui.WithHeightAuto()".into()));

        // Text alignment
        m.insert("text-left", Opt("tui.WithTextAlign(tui.TextAlignLeft)".into()));
        m.insert("text-center", Opt("tui.WithTextAlign(tui.TextAlignCenter)".into()));
        m.insert("text-right", Opt("tui.WithTextAlign(tui.TextAlignRight)".into()));

        // Text styles
        m.insert("font-bold", Method("Bold()".into()));
        m.insert("italic", Method("Italic()".into()));
        m.insert("underline", Method("Underline()".into()));
        m.insert("strikethrough", Method("Strikethrough()".into()));
        m.insert("blink", Method("Blink()".into()));
        m.insert("dim", Method("Faint()".into()));

        // Named colors
        for color in COLORS {
            let constant = color_const(color);
            let text_key: &'static str = Box::leak(format!("text-{color}").into_boxed_str());
            let bg_key: &'static str = Box::leak(format!("bg-{color}").into_boxed_str());
            let border_key: &'static str = Box::leak(format!("border-{color}").into_boxed_str());
            m.insert(text_key, Method(format!("Foreground({constant})")));
            m.insert(bg_key, Opt(format!("tui.WithBackground({constant})")));
            m.insert(border_key, Opt(format!("tui.WithBorderColor({constant})")));
        }

        m
    };

    static ref RE_GAP: Regex = Regex::new(r"^gap-(\d+)$").unwrap();
    static ref RE_PADDING: Regex = Regex::new(r"^(p|px|py|pt|pr|pb|pl)-(\d+)$").unwrap();
    static ref RE_MARGIN: Regex = Regex::new(r"^(m|mx|my|mt|mr|mb|ml)-(\d+)$").unwrap();
    static ref RE_MIN_MAX: Regex = Regex::new(r"^(min|max)-(w|h)-(\d+)$").unwrap();
    static ref RE_FRACTION: Regex = Regex::new(r"^(w|h)-(\d+)/(\d+)$").unwrap();
    static ref RE_SIZE: Regex = Regex::new(r"^(w|h)-(\d+)$").unwrap();
    static ref RE_FLEX: Regex = Regex::new(r"^flex-(grow|shrink)-(\d+)$").unwrap();
    static ref RE_GRADIENT: Regex = Regex::new(r"^(text|bg|border)-gradient-(.+)$").unwrap();

    /// Hand-curated common mistakes, checked before Levenshtein.
    static ref TYPO_TABLE: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("bold", "font-bold");
        m.insert("flex-column", "flex-col");
        m.insert("flex-columns", "flex-col");
        m.insert("flex-rows", "flex-row");
        m.insert("column", "flex-col");
        m.insert("row", "flex-row");
        m.insert("center", "justify-center");
        m.insert("rounded", "border-rounded");
        m.insert("strike", "strikethrough");
        m.insert("faint", "dim");
        m.insert("scroll", "scrollable");
        m.insert("focus", "focusable");
        m
    };

    /// Representative pattern spellings included in suggestion candidates.
    static ref PATTERN_EXAMPLES: Vec<&'static str> = vec![
        "gap-1", "p-1", "px-1", "py-1", "pt-1", "pr-1", "pb-1", "pl-1",
        "m-1", "mx-1", "my-1", "mt-1", "mr-1", "mb-1", "ml-1",
        "w-10", "h-10", "min-w-10", "max-w-10", "min-h-10", "max-h-10",
        "w-1/2", "h-1/2", "flex-grow-1", "flex-shrink-1",
        "text-gradient-red-blue", "bg-gradient-red-blue", "border-gradient-red-blue",
    ];
}

/// Which sides a spacing class touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    All,
    X,
    Y,
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    fn from_prefix(prefix: &str) -> Side {
        match prefix.trim_start_matches(['p', 'm']) {
            "x" => Side::X,
            "y" => Side::Y,
            "t" => Side::Top,
            "r" => Side::Right,
            "b" => Side::Bottom,
            "l" => Side::Left,
            _ => Side::All,
        }
    }
}

/// Four-slot TRBL accumulator for padding or margin.
#[derive(Debug, Default, Clone, Copy)]
struct SideAccumulator {
    top: u32,
    right: u32,
    bottom: u32,
    left: u32,
    seen: bool,
}

impl SideAccumulator {
    fn apply(&mut self, side: Side, value: u32) {
        self.seen = true;
        match side {
            Side::All => {
                self.top = value;
                self.right = value;
                self.bottom = value;
                self.left = value;
            }
            Side::X => {
                self.left = value;
                self.right = value;
            }
            Side::Y => {
                self.top = value;
                self.bottom = value;
            }
            Side::Top => self.top = value,
            Side::Right => self.right = value,
            Side::Bottom => self.bottom = value,
            Side::Left => self.left = value,
        }
    }

    fn option(&self, name: &str) -> Option<String> {
        self.seen.then(|| {
            format!(
                "tui.With{}({}, {}, {}, {})",
                name, self.top, self.right, self.bottom, self.left
            )
        })
    }
}

/// Internal resolution of one token.
#[derive(Debug, Clone, PartialEq)]
enum TokenResolution {
    Entry(ClassEntry),
    Padding(Side, u32),
    Margin(Side, u32),
    Unknown,
}

fn resolve_token(token: &str) -> TokenResolution {
    if let Some(entry) = STATIC_CLASSES.get(token) {
        return TokenResolution::Entry(entry.clone());
    }
    if let Some(caps) = RE_GAP.captures(token) {
        return TokenResolution::Entry(ClassEntry::Option(format!("tui.WithGap({})", &caps[1])));
    }
    if let Some(caps) = RE_PADDING.captures(token) {
        let value: u32 = caps[2].parse().unwrap_or(0);
        return TokenResolution::Padding(Side::from_prefix(&caps[1]), value);
    }
    if let Some(caps) = RE_MARGIN.captures(token) {
        let value: u32 = caps[2].parse().unwrap_or(0);
        return TokenResolution::Margin(Side::from_prefix(&caps[1]), value);
    }
    if let Some(caps) = RE_MIN_MAX.captures(token) {
        let bound = if &caps[1] == "min" { "Min" } else { "Max" };
        let axis = if &caps[2] == "w" { "Width" } else { "Height" };
        return TokenResolution::Entry(ClassEntry::Option(format!(
            "tui.With{bound}{axis}({})",
            &caps[3]
        )));
    }
    if let Some(caps) = RE_FRACTION.captures(token) {
        let axis = if &caps[1] == "w" { "Width" } else { "Height" };
        let num: u32 = caps[2].parse().unwrap_or(0);
        let den: u32 = caps[3].parse().unwrap_or(1).max(1);
        return TokenResolution::Entry(ClassEntry::Option(format!(
            "tui.With{axis}Percent({})",
            num * 100 / den
        )));
    }
    if let Some(caps) = RE_SIZE.captures(token) {
        let axis = if &caps[1] == "w" { "Width" } else { "Height" };
        return TokenResolution::Entry(ClassEntry::Option(format!(
            "tui.With{axis}({})",
            &caps[2]
        )));
    }
    if let Some(caps) = RE_FLEX.captures(token) {
        let factor = if &caps[1] == "grow" { "Grow" } else { "Shrink" };
        return TokenResolution::Entry(ClassEntry::Option(format!(
            "tui.WithFlex{factor}({})",
            &caps[2]
        )));
    }
    if let Some(caps) = RE_GRADIENT.captures(token) {
        let target = match &caps[1] {
            "text" => "Text",
            "bg" => "Background",
            _ => "Border",
        };
        if let Some((from, to, direction)) = parse_gradient(&caps[2]) {
            return TokenResolution::Entry(ClassEntry::Option(format!(
                "tui.With{target}Gradient({from}, {to}, {direction})"
            )));
        }
        return TokenResolution::Unknown;
    }
    TokenResolution::Unknown
}

/// Parses `<color1>-<color2>[-v|-h|-dd|-du]` into two color constants and a
/// gradient direction.
///
/// Multi-word colors like `bright-red` make the split ambiguous, so known
/// colors are tried as prefixes before falling back to a last-hyphen split.
fn parse_gradient(spec: &str) -> Option<(String, String, &'static str)> {
    let (colors, direction) = if let Some(rest) = spec.strip_suffix("-v") {
        (rest, "tui.GradientVertical")
    } else if let Some(rest) = spec.strip_suffix("-h") {
        (rest, "tui.GradientHorizontal")
    } else if let Some(rest) = spec.strip_suffix("-dd") {
        (rest, "tui.GradientDiagonalDown")
    } else if let Some(rest) = spec.strip_suffix("-du") {
        (rest, "tui.GradientDiagonalUp")
    } else {
        (spec, "tui.GradientHorizontal")
    };

    // Try every known color as the first of the pair.
    for first in COLORS {
        if let Some(rest) = colors.strip_prefix(&format!("{first}-")) {
            if COLORS.contains(&rest) {
                return Some((color_const(first), color_const(rest), direction));
            }
        }
    }
    // Fall back to splitting on the last hyphen.
    let idx = colors.rfind('-')?;
    let (first, second) = (&colors[..idx], &colors[idx + 1..]);
    if COLORS.contains(&first) && COLORS.contains(&second) {
        return Some((color_const(first), color_const(second), direction));
    }
    None
}

/// Output of [`resolve_classes`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedClasses {
    /// Element option expressions, in class order (spacing collapsed last).
    pub options: Vec<String>,
    /// Text-style method calls to chain off `tui.NewTextStyle()`.
    pub text_methods: Vec<String>,
    /// True when the resolution references the runtime library.
    pub needs_import: bool,
}

/// Resolves a utility-class string into options and text-style methods.
///
/// Unknown tokens are skipped; [`class_spans`] reports them for validation.
pub fn resolve_classes(input: &str) -> ResolvedClasses {
    let mut out = ResolvedClasses::default();
    let mut padding = SideAccumulator::default();
    let mut margin = SideAccumulator::default();

    for token in input.split_whitespace() {
        match resolve_token(token) {
            TokenResolution::Entry(ClassEntry::Option(option)) => out.options.push(option),
            TokenResolution::Entry(ClassEntry::TextMethod(method)) => {
                out.text_methods.push(method)
            }
            TokenResolution::Padding(side, value) => padding.apply(side, value),
            TokenResolution::Margin(side, value) => margin.apply(side, value),
            TokenResolution::Unknown => {}
        }
    }

    if let Some(option) = padding.option("Padding") {
        out.options.push(option);
    }
    if let Some(option) = margin.option("Margin") {
        out.options.push(option);
    }
    out.needs_import = !out.options.is_empty() || !out.text_methods.is_empty();
    out
}

/// Per-token validation result with column offsets relative to the class
/// string, so the analyzer can point a squiggle at the exact token.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSpan {
    /// The token text.
    pub class: String,
    /// 0-based character offset of the token's first character.
    pub start_col: usize,
    /// 0-based character offset just past the token's last character.
    pub end_col: usize,
    /// True when the token resolved.
    pub valid: bool,
    /// Suggested replacement for invalid tokens.
    pub suggestion: Option<String>,
}

/// Validates every token in a utility-class string, with positions.
pub fn class_spans(input: &str) -> Vec<ClassSpan> {
    let mut spans = Vec::new();
    let mut col = 0usize;
    let mut token_start = 0usize;
    let mut token = String::new();

    let mut flush = |token: &mut String, token_start: usize, col: usize, spans: &mut Vec<ClassSpan>| {
        if token.is_empty() {
            return;
        }
        let valid = !matches!(resolve_token(token), TokenResolution::Unknown);
        let suggestion = if valid { None } else { suggest(token) };
        spans.push(ClassSpan {
            class: std::mem::take(token),
            start_col: token_start,
            end_col: col,
            valid,
            suggestion,
        });
    };

    for ch in input.chars() {
        if ch.is_whitespace() {
            flush(&mut token, token_start, col, &mut spans);
        } else {
            if token.is_empty() {
                token_start = col;
            }
            token.push(ch);
        }
        col += 1;
    }
    flush(&mut token, token_start, col, &mut spans);
    spans
}

/// Suggests the closest known class for an unknown token.
///
/// Two stages: the hand-curated typo table first, then Levenshtein distance
/// against all static classes and representative pattern spellings, with a
/// cutoff of 3.
pub fn suggest(token: &str) -> Option<String> {
    if let Some(fixed) = TYPO_TABLE.get(token) {
        return Some((*fixed).to_string());
    }

    let mut best: Option<(usize, &str)> = None;
    let candidates = STATIC_CLASSES
        .keys()
        .copied()
        .chain(PATTERN_EXAMPLES.iter().copied());
    for candidate in candidates {
        let distance = levenshtein(token, candidate);
        if distance > 3 {
            continue;
        }
        // Tie-break lexicographically so suggestions are deterministic.
        let better = match best {
            None => true,
            Some((d, c)) => distance < d || (distance == d && candidate < c),
        };
        if better {
            best = Some((distance, candidate));
        }
    }
    best.map(|(_, c)| c.to_string())
}

/// Classic two-row Levenshtein distance.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_classes() {
        let resolved = resolve_classes("flex-col justify-center border-rounded");
        assert_eq!(
            resolved.options,
            vec![
                "tui.WithDirection(tui.Vertical)",
                "tui.WithJustify(tui.JustifyCenter)",
                "tui.WithBorder(tui.BorderRounded)",
            ]
        );
        assert!(resolved.text_methods.is_empty());
        assert!(resolved.needs_import);
    }

    #[test]
    fn test_text_methods() {
        let resolved = resolve_classes("font-bold text-cyan underline");
        assert!(resolved.options.is_empty());
        assert_eq!(
            resolved.text_methods,
            vec!["Bold()", "Foreground(tui.ColorCyan)", "Underline()"]
        );
    }

    #[test]
    fn test_padding_accumulates_into_one_option() {
        let resolved = resolve_classes("px-2 pt-1");
        assert_eq!(resolved.options, vec!["tui.WithPadding(1, 2, 0, 2)"]);
    }

    #[test]
    fn test_padding_all_then_override() {
        let resolved = resolve_classes("p-3 pb-0");
        assert_eq!(resolved.options, vec!["tui.WithPadding(3, 3, 0, 3)"]);
    }

    #[test]
    fn test_margin_separate_from_padding() {
        let resolved = resolve_classes("p-1 m-2");
        assert_eq!(
            resolved.options,
            vec!["tui.WithPadding(1, 1, 1, 1)", "tui.WithMargin(2, 2, 2, 2)"]
        );
    }

    #[test]
    fn test_sizing_patterns() {
        let resolved = resolve_classes("w-10 h-5 min-w-4 max-h-20 w-full");
        assert_eq!(
            resolved.options,
            vec![
                "tui.WithWidth(10)",
                "tui.WithHeight(5)",
                "tui.WithMinWidth(4)",
                "tui.WithMaxHeight(20)",
                "tui.WithWidthPercent(100)",
            ]
        );
    }

    #[test]
    fn test_fractional_sizing() {
        let resolved = resolve_classes("w-1/2 h-3/4");
        assert_eq!(
            resolved.options,
            vec!["tui.WithWidthPercent(50)", "tui.WithHeightPercent(75)"]
        );
    }

    #[test]
    fn test_flex_factors_and_gap() {
        let resolved = resolve_classes("gap-2 flex-grow-1 flex-shrink-0");
        assert_eq!(
            resolved.options,
            vec![
                "tui.WithGap(2)",
                "tui.WithFlexGrow(1)",
                "tui.WithFlexShrink(0)",
            ]
        );
    }

    #[test]
    fn test_gradient_with_multiword_color() {
        let resolved = resolve_classes("text-gradient-bright-red-blue-v");
        assert_eq!(
            resolved.options,
            vec!["tui.WithTextGradient(tui.ColorBrightRed, tui.ColorBlue, tui.GradientVertical)"]
        );
    }

    #[test]
    fn test_gradient_default_direction() {
        let resolved = resolve_classes("bg-gradient-red-cyan");
        assert_eq!(
            resolved.options,
            vec!["tui.WithBackgroundGradient(tui.ColorRed, tui.ColorCyan, tui.GradientHorizontal)"]
        );
    }

    #[test]
    fn test_unknown_token_is_skipped_in_emission() {
        let resolved = resolve_classes("flex-col no-such-class");
        assert_eq!(resolved.options, vec!["tui.WithDirection(tui.Vertical)"]);
    }

    #[test]
    fn test_typo_table_suggestion() {
        assert_eq!(suggest("flex-columns").as_deref(), Some("flex-col"));
        assert_eq!(suggest("bold").as_deref(), Some("font-bold"));
    }

    #[test]
    fn test_levenshtein_suggestion() {
        // distance 1 from the static class
        assert_eq!(suggest("flex-coll").as_deref(), Some("flex-col"));
        assert_eq!(suggest("justifycenter").as_deref(), Some("justify-center"));
    }

    #[test]
    fn test_no_suggestion_when_too_far() {
        assert_eq!(suggest("zzzzzzzzzzzzzz"), None);
    }

    #[test]
    fn test_class_spans_positions() {
        let spans = class_spans("flex-col  flex-columns");
        assert_eq!(spans.len(), 2);
        assert!(spans[0].valid);
        assert_eq!((spans[0].start_col, spans[0].end_col), (0, 8));
        assert!(!spans[1].valid);
        assert_eq!((spans[1].start_col, spans[1].end_col), (10, 22));
        assert_eq!(spans[1].suggestion.as_deref(), Some("flex-col"));
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein("gap-2", "gap-2"), 0);
        assert_eq!(levenshtein("gapp-2", "gap-2"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }
}
