//! Folding of node names back into range notation.
//!
//! Names are keyed by the text around their last run of digits: `cpn-k14-07-ib` has the key
//! (`cpn-k14-`, `-ib`) and the number `07`. Names without digits are their own key.

use super::grammar::{format_number, Range};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PatternKey<'a> {
    Literal(&'a str),
    Numbered { prefix: &'a str, suffix: &'a str },
}

struct NumberedName<'a> {
    prefix: &'a str,
    digits: &'a str,
    value: u64,
    suffix: &'a str,
}

fn numbered(name: &str) -> Option<NumberedName<'_>> {
    let bytes = name.as_bytes();
    let end = bytes.iter().rposition(u8::is_ascii_digit)? + 1;
    let start = bytes[..end]
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map_or(0, |i| i + 1);
    let digits = &name[start..end];
    Some(NumberedName {
        prefix: &name[..start],
        digits,
        value: digits.parse().ok()?,
        suffix: &name[end..],
    })
}

impl<'a> PatternKey<'a> {
    fn of(name: &'a str) -> Self {
        match numbered(name) {
            Some(n) => PatternKey::Numbered {
                prefix: n.prefix,
                suffix: n.suffix,
            },
            None => PatternKey::Literal(name),
        }
    }
}

/// Stable-sort names so that members of the same pattern key are adjacent. Keys keep their
/// first-appearance order and members keep their relative order.
pub(super) fn group_by_pattern(names: Vec<String>) -> Vec<String> {
    let mut slots: HashMap<PatternKey<'_>, usize> = HashMap::new();
    let group_of: Vec<usize> = names
        .iter()
        .map(|name| {
            let next = slots.len();
            *slots.entry(PatternKey::of(name)).or_insert(next)
        })
        .collect();
    let group_count = slots.len();
    drop(slots);

    let mut groups: Vec<Vec<String>> = vec![Vec::new(); group_count];
    for (name, group) in names.into_iter().zip(group_of) {
        groups[group].push(name);
    }
    groups.into_iter().flatten().collect()
}

/// Fold names already arranged by [`group_by_pattern`] into a comma separated list of
/// `prefix[ranges]suffix` patterns.
pub(super) fn fold(names: &[String]) -> String {
    let mut patterns = Vec::new();
    let mut start = 0;
    while start < names.len() {
        let key = PatternKey::of(&names[start]);
        let end = names[start..]
            .iter()
            .position(|name| PatternKey::of(name) != key)
            .map_or(names.len(), |offset| start + offset);
        patterns.push(fold_group(key, &names[start..end]));
        start = end;
    }
    patterns.join(",")
}

fn fold_group(key: PatternKey<'_>, members: &[String]) -> String {
    let (prefix, suffix) = match key {
        PatternKey::Numbered { prefix, suffix } if members.len() > 1 => (prefix, suffix),
        _ => return members.join(","),
    };

    let mut ranges: Vec<Range> = Vec::new();
    for n in members.iter().filter_map(|name| numbered(name)) {
        match ranges.last_mut() {
            Some(range)
                if range.high.checked_add(1) == Some(n.value)
                    && format_number(n.value, range.width) == n.digits =>
            {
                range.high = n.value;
            }
            _ => ranges.push(Range {
                low: n.value,
                high: n.value,
                width: n.digits.len(),
            }),
        }
    }

    let ranges: Vec<String> = ranges.iter().map(ToString::to_string).collect();
    format!("{prefix}[{}]{suffix}", ranges.join(","))
}
