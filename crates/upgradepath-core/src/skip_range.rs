use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use semver::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RangeOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "" | "=" | "==" => Some(Self::Eq),
            "!" | "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeComparator {
    pub op: RangeOp,
    pub version: Version,
}

impl RangeComparator {
    pub fn matches(&self, version: &Version) -> bool {
        self.op.accepts(precedence(version, &self.version))
    }
}

/// A `skipRange` predicate: alternatives joined by `||`, each a conjunction of
/// space-separated comparators such as `>=4.1.0 <4.2.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipRange {
    raw: String,
    alternatives: Vec<Vec<RangeComparator>>,
}

impl SkipRange {
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            bail!("skip range is empty");
        }

        let tokens = split_tokens(input);
        let mut alternatives = Vec::new();
        for alternative in tokens.split(|token| token == "||") {
            let comparators = parse_alternative(alternative)
                .with_context(|| format!("invalid skip range '{input}'"))?;
            alternatives.push(comparators);
        }

        Ok(Self {
            raw: input.to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|comparators| comparators.iter().all(|c| c.matches(version)))
    }
}

impl FromStr for SkipRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SkipRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Semver precedence: build metadata does not participate.
pub fn precedence(left: &Version, right: &Version) -> Ordering {
    left.major
        .cmp(&right.major)
        .then(left.minor.cmp(&right.minor))
        .then(left.patch.cmp(&right.patch))
        .then_with(|| left.pre.cmp(&right.pre))
}

fn parse_alternative(tokens: &[String]) -> Result<Vec<RangeComparator>> {
    if tokens.is_empty() {
        bail!("empty range alternative");
    }

    let mut comparators = Vec::new();
    for token in tokens {
        comparators.extend(parse_comparator(token)?);
    }
    Ok(comparators)
}

// Splits on spaces, except that a space right after `<`, `>` or `=` is dropped,
// so `>= 1.2.3` reads as `>=1.2.3`. `||` only separates alternatives as a token
// of its own.
fn split_tokens(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut last_char = None;
    for ch in input.chars() {
        if ch != ' ' {
            current.push(ch);
            last_char = Some(ch);
        } else if !matches!(last_char, Some('<' | '>' | '=')) && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_comparator(token: &str) -> Result<Vec<RangeComparator>> {
    let split = token
        .find(|ch: char| ch.is_ascii_digit())
        .ok_or_else(|| anyhow!("could not find a version in '{token}'"))?;
    let (op_text, version_text) = token.split_at(split);
    let op = RangeOp::parse(op_text)
        .ok_or_else(|| anyhow!("unknown comparison operator '{op_text}' in '{token}'"))?;

    if let Some((major, minor)) = parse_wildcard(version_text)? {
        return expand_wildcard(op, major, minor)
            .with_context(|| format!("unsupported wildcard comparator '{token}'"));
    }

    let version = Version::parse(version_text)
        .with_context(|| format!("invalid version '{version_text}' in '{token}'"))?;
    Ok(vec![RangeComparator { op, version }])
}

fn is_wildcard(component: &str) -> bool {
    matches!(component, "x" | "X" | "*")
}

fn parse_wildcard(version_text: &str) -> Result<Option<(u64, Option<u64>)>> {
    if version_text.contains(['-', '+']) {
        return Ok(None);
    }
    let parts: Vec<&str> = version_text.split('.').collect();
    if !parts.iter().skip(1).any(|part| is_wildcard(part)) {
        return Ok(None);
    }

    let major = parts[0]
        .parse::<u64>()
        .with_context(|| format!("invalid major version in '{version_text}'"))?;
    match parts.as_slice() {
        [_, minor] | [_, minor, _] if is_wildcard(minor) => {
            if parts.len() == 3 && !is_wildcard(parts[2]) {
                bail!("wildcard minor must be followed by a wildcard patch: '{version_text}'");
            }
            Ok(Some((major, None)))
        }
        [_, minor, patch] if is_wildcard(patch) => {
            let minor = minor
                .parse::<u64>()
                .with_context(|| format!("invalid minor version in '{version_text}'"))?;
            Ok(Some((major, Some(minor))))
        }
        _ => bail!("invalid wildcard version '{version_text}'"),
    }
}

fn expand_wildcard(op: RangeOp, major: u64, minor: Option<u64>) -> Result<Vec<RangeComparator>> {
    let lower = Version::new(major, minor.unwrap_or(0), 0);
    let upper = match minor {
        Some(minor) => minor.checked_add(1).map(|next| Version::new(major, next, 0)),
        None => major.checked_add(1).map(|next| Version::new(next, 0, 0)),
    }
    .ok_or_else(|| anyhow!("wildcard version {lower} is out of range"))?;
    let bound = |op, version: &Version| RangeComparator {
        op,
        version: version.clone(),
    };

    let comparators = match op {
        RangeOp::Eq => vec![bound(RangeOp::Ge, &lower), bound(RangeOp::Lt, &upper)],
        RangeOp::Gt => vec![bound(RangeOp::Ge, &upper)],
        RangeOp::Ge => vec![bound(RangeOp::Ge, &lower)],
        RangeOp::Lt => vec![bound(RangeOp::Lt, &lower)],
        RangeOp::Le => vec![bound(RangeOp::Lt, &upper)],
        RangeOp::Ne => bail!("'!=' cannot be combined with a wildcard version"),
    };
    Ok(comparators)
}
