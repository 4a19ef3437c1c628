//! Environment/region locator
//!
//! Finds the extent of named environments and searches for substrings while
//! refusing matches that fall inside disallowed environments. "Not found" is
//! always `None`; callers loop until they see it.

use super::scanner::{begin_marker, end_marker, environment_depth, find_in, find_nth, rfind_in, rfind_nth};

/// Byte index of the backslash of the `\end{env}` matching the `\begin{env}`
/// whose backslash is at `index`. Same-named environments nested inside are
/// skipped.
pub fn find_env_end(text: &str, index: usize, env: Option<&str>) -> Option<usize> {
    let begin = begin_marker(env);
    let end = end_marker(env);
    let from = index + 1;
    let mut skip = 1;
    loop {
        let next_begin = find_nth(text, &begin, skip, Some(from), None).unwrap_or(usize::MAX);
        let next_end = find_nth(text, &end, skip, Some(from), None)?;
        if next_begin < next_end {
            skip += 1;
            continue;
        }
        return Some(next_end);
    }
}

/// Byte index of the backslash of the `\begin{env}` enclosing `index`.
pub fn find_env_start(text: &str, index: usize, env: Option<&str>) -> Option<usize> {
    let begin = begin_marker(env);
    let end = end_marker(env);
    let mut skip = 1;
    loop {
        let prev_begin = rfind_nth(text, &begin, skip, 0, Some(index));
        let prev_end = rfind_nth(text, &end, skip, 0, Some(index));
        if prev_begin.is_none() && prev_end.is_none() {
            return None;
        }
        let prev_end = prev_end.unwrap_or(text.len());
        // A closed pair entirely before `index`: look one pair further back.
        let closed_before = prev_begin.map_or(true, |b| b < prev_end) && prev_end <= index;
        if closed_before {
            skip += 1;
            continue;
        }
        return prev_begin;
    }
}

/// Whether `index` sits between a `\begin{env}` and its `\end{env}`.
///
/// Nesting is not resolved, which is enough for verbatim-like bodies where
/// nothing nests. An index on a declaration counts as outside it.
pub fn check_in_environment(text: &str, env: &str, index: usize) -> bool {
    let begin = begin_marker(Some(env));
    let end = end_marker(Some(env));
    let next_begin = find_in(text, &begin, index, text.len()).unwrap_or(text.len());
    let Some(next_end) = find_in(text, &end, index, text.len()) else {
        return false;
    };
    let Some(prev_begin) = rfind_in(text, &begin, 0, index) else {
        return false;
    };
    let prev_end = rfind_in(text, &end, 0, index);
    let reopened = next_begin < next_end;
    let closed = prev_end.map_or(false, |e| e > prev_begin);
    !(reopened || closed)
}

/// `find_nth`, skipping every match that lies inside one of `envs`.
pub fn find_not_in_environment(text: &str, sub: &str, envs: &[&str], start: usize, skip: usize) -> Option<usize> {
    let mut skip = skip.max(1);
    loop {
        let ind = find_nth(text, sub, skip, Some(start), None)?;
        if envs.iter().any(|env| check_in_environment(text, env, ind)) {
            skip += 1;
            continue;
        }
        return Some(ind);
    }
}

/// `find_nth`, skipping matches nested too deep in the paired environment.
///
/// A tolerance `n` skips every match at depth `n` or more, so `2` allows one
/// level of nesting. `0` and `1` never allow a match inside the environment.
pub fn find_not_in_environment_tolerance(
    text: &str,
    sub: &str,
    envs: &[(&str, i64)],
    start: usize,
    skip: usize,
) -> Option<usize> {
    let mut skip = skip.max(1);
    loop {
        let ind = find_nth(text, sub, skip, Some(start), None)?;
        if envs
            .iter()
            .any(|(env, limit)| environment_depth(text, ind, Some(env)) >= (*limit).max(1))
        {
            skip += 1;
            continue;
        }
        return Some(ind);
    }
}

/// Like [`find_not_in_environment_tolerance`] but counting every environment.
/// A `depth_overlimit` of `0` behaves as `1`.
pub fn find_not_in_any_env_tolerance(
    text: &str,
    sub: &str,
    start: usize,
    depth_overlimit: i64,
    skip: usize,
) -> Option<usize> {
    let mut skip = skip.max(1);
    loop {
        let ind = find_nth(text, sub, skip, Some(start), None)?;
        if environment_depth(text, ind, None) >= depth_overlimit.max(1) {
            skip += 1;
            continue;
        }
        return Some(ind);
    }
}

/// `str::split` that never splits inside one of `envs`.
///
/// A trailing blank part (what follows the usual `\\` at the end of a
/// table) is dropped.
pub fn split_not_in_env<'a>(text: &'a str, sep: &str, envs: &[&str]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut prev = 0usize;
    while let Some(found) = find_not_in_environment(text, sep, envs, prev, 1) {
        parts.push(&text[prev..found]);
        prev = found + sep.len();
    }
    let last = &text[prev..];
    if !last.trim().is_empty() || parts.is_empty() {
        parts.push(last);
    }
    parts
}

/// Rewrite the body of every `env` environment with `f`.
///
/// The body must not nest further `env` environments.
pub fn modify_in_environment<F>(text: &str, env: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let begin = begin_marker(Some(env));
    let mut out = text.to_string();
    let mut cursor = 0usize;
    while let Some(start) = find_in(&out, &begin, cursor, out.len()) {
        let body_start = start + begin.len();
        let Some(body_end) = find_env_end(&out, start, Some(env)) else {
            break;
        };
        let body = f(&out[body_start..body_end]);
        out.replace_range(body_start..body_end, &body);
        cursor = body_start + body.len();
    }
    out
}
