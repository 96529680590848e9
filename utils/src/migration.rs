use std::cmp::Ordering;

use anyhow::{Context, Result};

/// Compares two CRD version strings using the Kubernetes API server's own precedence rule: a
/// stable (GA) version outranks beta, which outranks alpha, and ties within a stability level are
/// broken by the trailing numeric suffix (`v1beta2` outranks `v1beta1`).
///
/// # Errors
/// Returns `Err` if either string doesn't match the `v<major>[alpha|beta<minor>]` shape, e.g.
/// `v1`, `v1beta1`, `v2alpha3`.
#[inline]
pub fn compare_versions(version1: &str, version2: &str) -> Result<Ordering> {
    Ok(parse_version(version1)?.cmp(&parse_version(version2)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stability {
    Alpha,
    Beta,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ParsedVersion {
    stability: Stability,
    major: u32,
    minor: u32,
}

fn parse_version(version: &str) -> Result<ParsedVersion> {
    let rest = version
        .strip_prefix('v')
        .with_context(|| format!("version {version:?} doesn't start with 'v'"))?;
    let (major_str, stability, minor_str) = if let Some(idx) = rest.find("alpha") {
        (&rest[..idx], Stability::Alpha, &rest[idx + "alpha".len()..])
    } else if let Some(idx) = rest.find("beta") {
        (&rest[..idx], Stability::Beta, &rest[idx + "beta".len()..])
    } else {
        (rest, Stability::Stable, "")
    };
    let major: u32 = major_str
        .parse()
        .with_context(|| format!("version {version:?} has a non-numeric major component"))?;
    let minor: u32 = if minor_str.is_empty() {
        0
    } else {
        minor_str
            .parse()
            .with_context(|| format!("version {version:?} has a non-numeric minor component"))?
    };
    Ok(ParsedVersion { stability, major, minor })
}

#[cfg(test)]
mod tests {
    use super::compare_versions;
    use std::cmp::Ordering;

    #[test]
    fn stable_outranks_beta_which_outranks_alpha() {
        assert_eq!(Ordering::Greater, compare_versions("v1", "v1beta1").unwrap());
        assert_eq!(Ordering::Greater, compare_versions("v1beta1", "v1alpha1").unwrap());
        assert_eq!(Ordering::Less, compare_versions("v1alpha1", "v1").unwrap());
    }

    #[test]
    fn same_stability_breaks_ties_on_the_numeric_suffix() {
        assert_eq!(Ordering::Greater, compare_versions("v1beta2", "v1beta1").unwrap());
        assert_eq!(Ordering::Equal, compare_versions("v1beta1", "v1beta1").unwrap());
    }

    #[test]
    fn higher_major_outranks_lower_major_at_the_same_stability() {
        assert_eq!(Ordering::Greater, compare_versions("v2", "v1").unwrap());
    }

    #[test]
    fn rejects_a_version_without_the_leading_v() {
        assert!(compare_versions("1beta1", "v1").is_err());
    }
}
