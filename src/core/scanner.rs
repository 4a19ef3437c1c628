//! Text scanner primitives
//!
//! Pure functions over raw LaTeX text and byte offsets. Nothing here builds a
//! tree: every caller rescans the current text, because each rewrite shifts
//! the offsets of everything after it.
//!
//! All needles used by the engine are ASCII, so every offset these functions
//! return lies on a char boundary. Offsets passed *in* are snapped to the next
//! char boundary where a slice has to be taken.

use crate::utils::error::{RepairError, RepairResult};

// =============================================================================
// Region
// =============================================================================

/// Half-open byte interval `[start, end)` into a text buffer.
///
/// A region is only valid for the exact text it was computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "region start after end");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// The region without its first and last byte (the delimiters of a group).
    pub fn inner(&self) -> Region {
        if self.len() < 2 {
            Region::new(self.start, self.start)
        } else {
            Region::new(self.start + 1, self.end - 1)
        }
    }
}

// =============================================================================
// Boundaries
// =============================================================================

/// Smallest char boundary `>= index` (clamped to `text.len()`).
pub(crate) fn ceil_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Largest char boundary `<= index` (clamped to `text.len()`).
pub(crate) fn floor_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// `str::find` restricted to `[from, to)`.
pub fn find_in(hay: &str, needle: &str, from: usize, to: usize) -> Option<usize> {
    let from = ceil_boundary(hay, from);
    let to = floor_boundary(hay, to);
    if from > to {
        return None;
    }
    hay[from..to].find(needle).map(|i| i + from)
}

/// `str::rfind` restricted to `[from, to)`.
pub fn rfind_in(hay: &str, needle: &str, from: usize, to: usize) -> Option<usize> {
    let from = ceil_boundary(hay, from);
    let to = floor_boundary(hay, to);
    if from > to {
        return None;
    }
    hay[from..to].rfind(needle).map(|i| i + from)
}

// =============================================================================
// Occurrence search
// =============================================================================

/// Index of the `n`-th non-overlapping occurrence of `needle` in
/// `hay[start..end]`. `n == 0` is treated as 1.
pub fn find_nth(
    hay: &str,
    needle: &str,
    n: usize,
    start: Option<usize>,
    end: Option<usize>,
) -> Option<usize> {
    let end = end.unwrap_or(hay.len());
    let mut found = find_in(hay, needle, start.unwrap_or(0), end)?;
    for _ in 1..n.max(1) {
        found = find_in(hay, needle, found + needle.len(), end)?;
    }
    Some(found)
}

/// Index of the `n`-th occurrence of `needle` counted backwards from `end`
/// within `hay[start..end]`.
pub fn rfind_nth(hay: &str, needle: &str, n: usize, start: usize, end: Option<usize>) -> Option<usize> {
    let mut found = rfind_in(hay, needle, start, end.unwrap_or(hay.len()))?;
    for _ in 1..n.max(1) {
        found = rfind_in(hay, needle, start, found)?;
    }
    Some(found)
}

/// First occurrence of `sub` at or after `start` that is not escaped by a
/// backslash.
pub fn find_unescaped(text: &str, sub: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut from = start;
    loop {
        let candidate = find_in(text, sub, from, text.len())?;
        if candidate > 0 && bytes[candidate - 1] == b'\\' {
            from = candidate + sub.len().max(1);
            continue;
        }
        return Some(candidate);
    }
}

// =============================================================================
// Depth accounting
// =============================================================================

/// Pair of delimiters tracked by [`bracket_layers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters<'a> {
    pub open: &'a str,
    pub close: &'a str,
    /// Ignore delimiters directly preceded by `\`. Only honoured when both
    /// delimiters are a single byte.
    pub escape: bool,
}

impl Default for Delimiters<'_> {
    fn default() -> Self {
        Delimiters::BRACES
    }
}

impl Delimiters<'static> {
    pub const BRACES: Delimiters<'static> = Delimiters {
        open: "{",
        close: "}",
        escape: true,
    };
}

/// Where [`bracket_layers`] should stop counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Depth at this byte, including a delimiter that sits on it.
    At(usize),
    /// Net balance of the whole text.
    Total,
}

/// Nesting depth of `delims` at `probe`, counting from `min_index`.
///
/// `'{123\{56}89}12'` at 6 is 1: the escaped brace is not structural.
pub fn bracket_layers(text: &str, probe: Probe, delims: Delimiters<'_>, min_index: usize) -> RepairResult<i64> {
    let bytes = text.as_bytes();
    let escape = delims.escape && delims.open.len() == 1 && delims.close.len() == 1;
    let is_escaped = |i: usize| escape && i > 0 && bytes[i - 1] == b'\\';

    let mut layer = 0i64;
    let mut i = min_index;
    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(delims.open.as_bytes()) && !is_escaped(i) {
            layer += 1;
        }
        if rest.starts_with(delims.close.as_bytes()) && !is_escaped(i) {
            layer -= 1;
        }
        if probe == Probe::At(i) {
            return Ok(layer);
        }
        i += 1;
    }
    match probe {
        Probe::Total => Ok(layer),
        Probe::At(index) => Err(RepairError::IndexOutOfBounds {
            index,
            len: text.len(),
        }),
    }
}

/// Brace depth at `index` for the usual `{`/`}` pair.
pub fn brace_depth(text: &str, index: usize) -> RepairResult<i64> {
    bracket_layers(text, Probe::At(index), Delimiters::BRACES, 0)
}

/// Start keyword occurrences minus end keyword occurrences at or before `index`.
///
/// Used for `\left`/`\right` style pairs. When a keyword is a control word,
/// an occurrence followed by a letter is a different command (`\right`
/// inside `\rightarrow`) and is not counted.
pub fn any_layer(text: &str, index: usize, start_kw: &str, end_kw: &str) -> i64 {
    let count = |kw: &str| -> i64 {
        let command_like = kw.starts_with('\\') && kw.ends_with(|c: char| c.is_ascii_alphabetic());
        let mut total = 0;
        let mut from = 0;
        while let Some(pos) = find_in(text, kw, from, text.len()) {
            if pos > index {
                break;
            }
            let followed_by_letter = text[pos + kw.len()..]
                .chars()
                .next()
                .map_or(false, char::is_alphabetic);
            if !(command_like && followed_by_letter) {
                total += 1;
            }
            from = pos + kw.len().max(1);
        }
        total
    };
    count(start_kw) - count(end_kw)
}

pub(crate) fn begin_marker(env: Option<&str>) -> String {
    match env {
        Some(name) => format!("\\begin{{{}}}", name),
        None => "\\begin{".to_string(),
    }
}

pub(crate) fn end_marker(env: Option<&str>) -> String {
    match env {
        Some(name) => format!("\\end{{{}}}", name),
        None => "\\end{".to_string(),
    }
}

/// `\begin{env}` minus `\end{env}` occurrences strictly before `index`
/// (any environment when `env` is `None`).
pub fn environment_depth(text: &str, index: usize, env: Option<&str>) -> i64 {
    let head = &text[..floor_boundary(text, index)];
    let begins = head.matches(begin_marker(env).as_str()).count() as i64;
    let ends = head.matches(end_marker(env).as_str()).count() as i64;
    begins - ends
}

/// Whether `index` sits inside some environment body, judged only by which
/// of `\end{` and `\begin{` comes next.
pub fn environment_layer(text: &str, index: usize) -> bool {
    let Some(next_end) = find_in(text, "\\end{", index, text.len()) else {
        return false;
    };
    match find_in(text, "\\begin{", index, text.len()) {
        Some(next_begin) => next_end < next_begin,
        None => true,
    }
}

// =============================================================================
// Local commands (`\name{...}`)
// =============================================================================

/// Matching closing brace of the local command starting at `index`.
///
/// `index` should be the backslash of `\name{`; the opening brace itself is
/// the latest position that still works.
pub fn local_env_end(text: &str, index: usize) -> RepairResult<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i64;
    let mut i = index;
    while i < bytes.len() {
        let escaped = i > 0 && bytes[i - 1] == b'\\';
        match bytes[i] {
            b'{' if !escaped => depth += 1,
            b'}' if !escaped => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(RepairError::UnbalancedBrace { index })
}

/// Whether `index` lies strictly inside the nearest preceding `\cmd{...}`.
pub fn local_env_layer(text: &str, index: usize, cmd: &str) -> RepairResult<bool> {
    let keyword = format!("\\{}{{", cmd);
    let Some(opener) = rfind_in(text, &keyword, 0, index) else {
        return Ok(false);
    };
    let closer = local_env_end(text, opener)?;
    Ok(opener < index && index < closer)
}

/// Top-level `{...}` groups of `text`, ignoring escaped braces.
///
/// `'{123}{{7}}{\}3}{678}'` yields the groups at 0..5, 5..10, 10..15, 15..20.
pub fn outer_brace_groups(text: &str) -> RepairResult<Vec<Region>> {
    let mut groups = Vec::new();
    let mut cursor = 0usize;
    while let Some(opener) = find_unescaped(text, "{", cursor) {
        let closer = local_env_end(text, opener)?;
        groups.push(Region::new(opener, closer + 1));
        cursor = closer + 1;
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_nth_counts_non_overlapping_hits() {
        let text = "0123456789012345678901234567890";
        assert_eq!(find_nth(text, "6", 1, None, None), Some(6));
        assert_eq!(find_nth(text, "6", 2, None, None), Some(16));
        assert_eq!(find_nth(text, "6", 0, None, None), Some(6));
        assert_eq!(find_nth(text, "6", 2, Some(9), Some(20)), None);
        assert_eq!(find_nth("aaaa", "aa", 2, None, None), Some(2));
        assert_eq!(find_nth("aaaa", "aa", 3, None, None), None);
    }

    #[test]
    fn rfind_nth_walks_backwards_inside_bounds() {
        let text = "0123456789012345678901234567890";
        assert_eq!(rfind_nth(text, "6", 2, 9, Some(20)), None);
        assert_eq!(rfind_nth(text, "6", 1, 9, Some(20)), Some(16));
        assert_eq!(rfind_nth(text, "6", 2, 0, None), Some(16));
    }

    #[test]
    fn bracket_layers_ignores_escaped_braces() {
        let text = "{123\\{56}89}12";
        assert_eq!(brace_depth(text, 6).unwrap(), 1);
        assert_eq!(brace_depth(text, 0).unwrap(), 1);
        assert_eq!(brace_depth(text, 8).unwrap(), 0);
        assert_eq!(
            bracket_layers("{a\\{b}c", Probe::Total, Delimiters::BRACES, 0).unwrap(),
            0
        );
    }

    #[test]
    fn default_delimiters_are_braces() {
        let open = String::from("(");
        let parens = Delimiters {
            open: &open,
            close: ")",
            escape: false,
        };
        assert_ne!(parens, Delimiters::default());
        assert_eq!(Delimiters::default(), Delimiters::BRACES);
        assert_eq!(bracket_layers("{a}(", Probe::At(1), Delimiters::default(), 0).unwrap(), 1);
    }

    #[test]
    fn bracket_layers_rejects_out_of_range_probe() {
        let err = brace_depth("{}", 5).unwrap_err();
        assert_eq!(err, RepairError::IndexOutOfBounds { index: 5, len: 2 });
    }

    #[test]
    fn bracket_layers_depth_changes_by_one_per_brace() {
        let text = "a{b{c}d\\}e}f";
        let mut prev = 0;
        for i in 0..text.len() {
            let depth = brace_depth(text, i).unwrap();
            assert!(depth >= 0);
            assert!((depth - prev).abs() <= 1);
            prev = depth;
        }
    }

    #[test]
    fn bracket_layers_respects_min_index() {
        let text = "{{x}";
        assert_eq!(
            bracket_layers(text, Probe::At(3), Delimiters::BRACES, 1).unwrap(),
            0
        );
    }

    #[test]
    fn any_layer_counts_keywords() {
        let text = "start01end234start0123end789end";
        assert_eq!(any_layer(text, 19, "start", "end"), 1);
        assert_eq!(any_layer(text, 26, "start", "end"), 0);
    }

    #[test]
    fn any_layer_control_words_and_symbols() {
        assert_eq!(any_layer("\\left( x \\rightarrow y", 10, "\\left", "\\right"), 1);
        assert_eq!(any_layer("\\(LaTeX\\)", 3, "\\(", "\\)"), 1);
    }

    #[test]
    fn any_layer_skips_longer_commands() {
        let text = "\\left( a \\rightarrow b \\right) c";
        let inside = text.find("b").unwrap();
        let after = text.find("c").unwrap();
        assert_eq!(any_layer(text, inside, "\\left", "\\right"), 1);
        assert_eq!(any_layer(text, after, "\\left", "\\right"), 0);
    }

    #[test]
    fn environment_depth_counts_before_index() {
        let text = "\\begin{a}\\begin{b}x\\end{b}y\\end{a}";
        let x = text.find('x').unwrap();
        let y = text.find('y').unwrap();
        assert_eq!(environment_depth(text, x, None), 2);
        assert_eq!(environment_depth(text, y, None), 1);
        assert_eq!(environment_depth(text, y, Some("b")), 0);
    }

    #[test]
    fn environment_layer_looks_at_next_marker() {
        let text = "a \\begin{cases} b \\end{cases} c";
        assert!(!environment_layer(text, 0));
        assert!(environment_layer(text, text.find(" b ").unwrap() + 1));
        assert!(!environment_layer(text, text.rfind('c').unwrap()));
    }

    #[test]
    fn local_env_end_finds_matching_brace() {
        assert_eq!(local_env_end("abc\\wh{fo3rce}the", 6).unwrap(), 13);
        assert_eq!(local_env_end("\\a{b{c}\\}d}", 0).unwrap(), 10);
        assert!(matches!(
            local_env_end("\\a{b", 0),
            Err(RepairError::UnbalancedBrace { index: 0 })
        ));
    }

    #[test]
    fn local_env_layer_detects_inside() {
        let text = "abc\\wh{force}the";
        assert!(local_env_layer(text, 10, "wh").unwrap());
        assert!(!local_env_layer(text, 14, "wh").unwrap());
        assert!(!local_env_layer(text, 1, "wh").unwrap());
    }

    #[test]
    fn outer_brace_groups_splits_top_level() {
        let groups = outer_brace_groups("{123}{{7}}{\\}3}{678}").unwrap();
        assert_eq!(
            groups,
            vec![
                Region::new(0, 5),
                Region::new(5, 10),
                Region::new(10, 15),
                Region::new(15, 20)
            ]
        );
    }

    #[test]
    fn scanning_survives_multibyte_text() {
        let text = "é{ü}ñ";
        assert_eq!(find_nth(text, "}", 1, Some(1), None), Some(5));
        assert_eq!(environment_depth(text, 1, None), 0);
        assert_eq!(brace_depth(text, 3).unwrap(), 1);
    }
}
