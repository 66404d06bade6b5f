//! Dotted-numeric version parsing and comparison
//!
//! Storefront and in-bundle versions are plain dot-separated integers
//! (`4.2.1`, sometimes `4.2` or `4.2.1.7`), not semver: there are no
//! prerelease or build tags, and the component count varies. Comparison
//! zero-pads the shorter side, so `"2.1"` and `"2.1.0"` are equal.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed version string: {0:?}")]
pub struct MalformedVersion(pub String);

/// Split a dotted version string into its integer components.
///
/// Every component must parse as a non-negative integer; anything else
/// (empty components included) is a hard error, never a silent zero.
pub fn parse_components(version: &str) -> Result<Vec<u64>, MalformedVersion> {
    version
        .split('.')
        .map(|part| part.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| MalformedVersion(version.to_string()))
}

/// Returns true when `candidate` is at least `baseline` under numeric,
/// component-wise ordering. Equality counts as at-least.
pub fn is_at_least(candidate: &str, baseline: &str) -> Result<bool, MalformedVersion> {
    let mut a = parse_components(candidate)?;
    let mut b = parse_components(baseline)?;
    let len = a.len().max(b.len());
    a.resize(len, 0);
    b.resize(len, 0);
    for (x, y) in a.iter().zip(b.iter()) {
        if x > y {
            return Ok(true);
        }
        if x < y {
            return Ok(false);
        }
    }
    Ok(true)
}
