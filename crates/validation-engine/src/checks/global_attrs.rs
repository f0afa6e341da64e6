//! Global-attribute rules: licensing, conditional attributes and the
//! storage format.

use serde_json::json;
use validator_common::{Category, Severity};

use crate::rule::{Observation, Rule};

/// Whether a string is plausible SPDX identifier syntax: a non-empty run of
/// identifier characters containing at least one letter.
fn is_spdx_syntax(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        && value.chars().any(|c| c.is_ascii_alphabetic())
}

/// The license attribute must be present and a known SPDX identifier.
pub fn license_spdx() -> Rule {
    Rule::sync(
        "license-spdx",
        Category::Licensing,
        Severity::Required,
        |ctx| {
            let license = match ctx.dataset.global_attr_str("license") {
                Some(license) => license,
                None => {
                    return vec![Observation::fail(
                        "missing required 'license' global attribute",
                    )]
                }
            };
            if !is_spdx_syntax(&license) {
                return vec![Observation::fail(format!(
                    "license '{}' is not valid SPDX identifier syntax",
                    license
                ))];
            }
            let known = ctx
                .spec
                .known_licenses
                .iter()
                .any(|id| id.eq_ignore_ascii_case(&license));
            if known {
                vec![Observation::pass(format!(
                    "license '{}' is a recognized SPDX identifier",
                    license
                ))]
            } else {
                vec![Observation::fail(format!(
                    "license '{}' is not a recognized SPDX identifier",
                    license
                ))
                .with_detail(json!({"allowed": ctx.spec.known_licenses}))]
            }
        },
    )
}

/// License choice policy: recommended licenses pass, NC/ND-restricted ones
/// warn, everything else needs case-by-case review.
pub fn license_choice() -> Rule {
    Rule::sync(
        "license-choice",
        Category::Licensing,
        Severity::Recommended,
        |ctx| {
            let license = match ctx.dataset.global_attr_str("license") {
                Some(license) => license,
                None => return vec![Observation::info("no license to assess")],
            };
            let upper = license.to_uppercase();

            let restricted: Vec<&String> = ctx
                .spec
                .restricted_license_tokens
                .iter()
                .filter(|token| upper.contains(&token.to_uppercase()))
                .collect();
            if !restricted.is_empty() {
                return vec![Observation::warn(format!(
                    "license '{}' carries usage restrictions ({}); acceptance \
                     requires review",
                    license,
                    restricted
                        .iter()
                        .map(|t| t.trim_start_matches('-'))
                        .collect::<Vec<_>>()
                        .join("/")
                ))];
            }
            let recommended = ctx
                .spec
                .recommended_licenses
                .iter()
                .any(|prefix| upper.starts_with(&prefix.to_uppercase()));
            if recommended {
                vec![Observation::pass(format!(
                    "license '{}' is on the recommended list",
                    license
                ))]
            } else {
                vec![Observation::warn(format!(
                    "license '{}' requires case-by-case review",
                    license
                ))]
            }
        },
    )
}

/// Report presence of the conditional attributes tied to irregular and
/// future-extended time axes.
pub fn conditional_attrs() -> Rule {
    Rule::sync(
        "conditional-attrs",
        Category::Format,
        Severity::Informational,
        |ctx| {
            ["consistent_timestep_start", "last_valid_timestep"]
                .iter()
                .map(|attr| match ctx.dataset.global_attr_str(attr) {
                    Some(value) => {
                        Observation::info(format!("'{}' is set to '{}'", attr, value))
                    }
                    None => Observation::info(format!("'{}' is not set", attr)),
                })
                .collect()
        },
    )
}

/// Zarr v2 or v3; v2 additionally requires consolidated metadata.
pub fn zarr_format() -> Rule {
    Rule::sync("zarr-format", Category::Format, Severity::Required, |ctx| {
        let format = ctx.dataset.zarr_format();
        match format.version {
            3 => vec![Observation::pass("archive uses Zarr v3")],
            2 if format.consolidated => {
                vec![Observation::pass(
                    "archive uses Zarr v2 with consolidated metadata",
                )]
            }
            2 => vec![Observation::fail(
                "archive uses Zarr v2 without consolidated metadata",
            )],
            other => vec![Observation::fail(format!(
                "unsupported Zarr format version {}",
                other
            ))],
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spdx_syntax() {
        assert!(is_spdx_syntax("CC-BY-4.0"));
        assert!(is_spdx_syntax("Apache-2.0"));
        assert!(!is_spdx_syntax(""));
        assert!(!is_spdx_syntax("do whatever"));
        assert!(!is_spdx_syntax("4.0"));
    }
}
