//! Parser for node range expressions such as `node[1-20,25,30-35],login[01-02]`.
//!
//! ```text
//! nodeset  := "" | pattern ("," pattern)*
//! pattern  := (literal | "[" ranges "]")+
//! ranges   := range ("," range)*
//! range    := number | number "-" number
//! number   := [0-9]+
//! literal  := any characters except "[", "]" and ","
//! ```
//!
//! Commas outside brackets separate independent patterns (union), commas inside brackets
//! separate alternative ranges. Several bracket groups in one pattern expand as a cartesian
//! product with the leftmost group outermost. The padding width of a range is the length of its
//! shortest bound, so `01-10` yields `01`..`10` while `1-10` yields `1`..`10`.

use std::fmt;

/// Upper bound on the number of names a single expression may expand to.
pub const MAX_EXPANSION: usize = 1 << 20;

/// GrammarError enumerates the ways a node range expression can be malformed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("unmatched '{bracket}' at offset {offset}")]
    UnmatchedBracket { bracket: char, offset: usize },

    #[error("nested '[' at offset {0}")]
    NestedBracket(usize),

    #[error("empty range group at offset {0}")]
    EmptyGroup(usize),

    #[error("invalid range bound \"{0}\"")]
    InvalidBound(String),

    #[error("inverted range {low}-{high}")]
    InvertedRange { low: u64, high: u64 },

    #[error("empty pattern in \"{0}\"")]
    EmptyPattern(String),

    #[error("expression expands to more than {} names", MAX_EXPANSION)]
    TooLarge,
}

/// An inclusive numeric range printed with a minimum digit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Range {
    pub low: u64,
    pub high: u64,
    pub width: usize,
}

impl Range {
    fn len(&self) -> u64 {
        (self.high - self.low).saturating_add(1)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.width;
        if self.low == self.high {
            write!(f, "{:0width$}", self.low)
        } else {
            write!(f, "{:0width$}-{:0width$}", self.low, self.high)
        }
    }
}

pub(super) fn format_number(value: u64, width: usize) -> String {
    format!("{value:0width$}")
}

#[derive(Debug)]
enum Segment<'a> {
    Literal(&'a str),
    Ranges(Vec<Range>),
}

/// Expand `input` into node names in declaration order. Duplicates are kept; the caller
/// decides how to dedup.
pub(super) fn expand(input: &str) -> Result<Vec<String>, GrammarError> {
    let mut names = Vec::new();
    if input.trim().is_empty() {
        return Ok(names);
    }

    for (offset, raw) in split_patterns(input)? {
        let pattern = raw.trim();
        if pattern.is_empty() {
            return Err(GrammarError::EmptyPattern(input.to_string()));
        }
        let offset = offset + (raw.len() - raw.trim_start().len());
        let segments = parse_pattern(pattern, offset)?;
        expand_pattern(&segments, &mut names)?;
    }
    Ok(names)
}

/// Split on top-level commas, rejecting unbalanced or nested brackets along the way.
fn split_patterns(input: &str) -> Result<Vec<(usize, &str)>, GrammarError> {
    let mut patterns = Vec::new();
    let mut open: Option<usize> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match c {
            '[' if open.is_some() => return Err(GrammarError::NestedBracket(i)),
            '[' => open = Some(i),
            ']' => {
                if open.take().is_none() {
                    return Err(GrammarError::UnmatchedBracket {
                        bracket: ']',
                        offset: i,
                    });
                }
            }
            ',' if open.is_none() => {
                patterns.push((start, &input[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }

    if let Some(offset) = open {
        return Err(GrammarError::UnmatchedBracket {
            bracket: '[',
            offset,
        });
    }
    patterns.push((start, &input[start..]));
    Ok(patterns)
}

fn parse_pattern(pattern: &str, offset: usize) -> Result<Vec<Segment<'_>>, GrammarError> {
    let mut segments = Vec::new();
    let mut rest = pattern;
    let mut pos = offset;

    while !rest.is_empty() {
        match rest.find('[') {
            Some(0) => {
                // Balanced by split_patterns, so a closing bracket always follows.
                let close = rest.find(']').ok_or(GrammarError::UnmatchedBracket {
                    bracket: '[',
                    offset: pos,
                })?;
                segments.push(Segment::Ranges(parse_ranges(&rest[1..close], pos)?));
                pos += close + 1;
                rest = &rest[close + 1..];
            }
            Some(i) => {
                segments.push(Segment::Literal(&rest[..i]));
                pos += i;
                rest = &rest[i..];
            }
            None => {
                segments.push(Segment::Literal(rest));
                rest = "";
            }
        }
    }
    Ok(segments)
}

fn parse_ranges(body: &str, offset: usize) -> Result<Vec<Range>, GrammarError> {
    if body.trim().is_empty() {
        return Err(GrammarError::EmptyGroup(offset));
    }

    body.split(',')
        .map(str::trim)
        .map(|item| {
            let (low, high) = item.split_once('-').unwrap_or((item, item));
            let (low, high) = (low.trim(), high.trim());
            let range = Range {
                low: parse_bound(low)?,
                high: parse_bound(high)?,
                width: low.len().min(high.len()),
            };
            if range.low > range.high {
                return Err(GrammarError::InvertedRange {
                    low: range.low,
                    high: range.high,
                });
            }
            Ok(range)
        })
        .collect()
}

fn parse_bound(digits: &str) -> Result<u64, GrammarError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GrammarError::InvalidBound(digits.to_string()));
    }
    digits
        .parse()
        .map_err(|_| GrammarError::InvalidBound(digits.to_string()))
}

fn expand_pattern(segments: &[Segment<'_>], names: &mut Vec<String>) -> Result<(), GrammarError> {
    let budget = MAX_EXPANSION.saturating_sub(names.len()) as u64;
    let mut partial = vec![String::new()];

    for segment in segments {
        match segment {
            Segment::Literal(text) => partial.iter_mut().for_each(|name| name.push_str(text)),
            Segment::Ranges(ranges) => {
                let per_prefix = ranges
                    .iter()
                    .map(Range::len)
                    .fold(0u64, u64::saturating_add);
                if (partial.len() as u64).saturating_mul(per_prefix) > budget {
                    return Err(GrammarError::TooLarge);
                }

                let mut next = Vec::new();
                for prefix in &partial {
                    for range in ranges {
                        for value in range.low..=range.high {
                            next.push(format!("{prefix}{}", format_number(value, range.width)));
                        }
                    }
                }
                partial = next;
            }
        }
    }

    names.extend(partial);
    Ok(())
}
