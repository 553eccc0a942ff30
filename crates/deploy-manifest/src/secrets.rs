//! Secret references
//!
//! Containers declare secrets as `NAME: parameter` pairs. Parameters are
//! SSM parameter names or full ARNs.

use std::collections::BTreeMap;

use crate::template::Secret;

/// Expand an SSM parameter name into its ARN. Values that are already ARNs
/// pass through.
pub fn resolve_ssm_path(value: &str, account_id: &str, region: &str) -> String {
    if value.starts_with("arn:") {
        return value.to_string();
    }
    let name = value.trim_start_matches('/');
    format!("arn:aws:ssm:{region}:{account_id}:parameter/{name}")
}

/// Merge the template's secrets with configured overrides and resolve each
/// reference.
///
/// Template entries missing either `name` or `valueFrom` are dropped. Order is
/// template order followed by newly configured names; an override keeps the
/// position of the entry it replaces.
pub fn merge_secrets(
    template: &[Secret],
    configured: &BTreeMap<String, String>,
    account_id: &str,
    region: &str,
) -> Vec<Secret> {
    let mut merged: Vec<Secret> = Vec::new();
    let mut upsert = |name: &str, value: &str| {
        let value_from = resolve_ssm_path(value, account_id, region);
        match merged.iter_mut().find(|secret| secret.name == name) {
            Some(existing) => existing.value_from = value_from,
            None => merged.push(Secret::new(name, value_from)),
        }
    };

    for secret in template {
        if secret.name.is_empty() || secret.value_from.is_empty() {
            tracing::warn!(name = %secret.name, "Dropping incomplete template secret");
            continue;
        }
        upsert(&secret.name, &secret.value_from);
    }
    for (name, value) in configured {
        upsert(name, value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("db/password", "arn:aws:ssm:us-east-1:111:parameter/db/password")]
    #[case("/db/password", "arn:aws:ssm:us-east-1:111:parameter/db/password")]
    #[case("arn:aws:ssm:::parameter/db", "arn:aws:ssm:::parameter/db")]
    #[case(
        "arn:aws:secretsmanager:us-east-1:111:secret:x",
        "arn:aws:secretsmanager:us-east-1:111:secret:x"
    )]
    fn ssm_paths(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(resolve_ssm_path(value, "111", "us-east-1"), expected);
    }

    #[test]
    fn config_overrides_template_by_name() {
        let template = vec![
            Secret::new("DB_PASS", "arn:aws:ssm:::parameter/db"),
            Secret::new("API_KEY", "/shared/api-key"),
        ];
        let configured = BTreeMap::from([
            ("DB_PASS".to_string(), "other/path".to_string()),
            ("TOKEN".to_string(), "tok".to_string()),
        ]);

        let merged = merge_secrets(&template, &configured, "111", "us-east-1");
        assert_eq!(
            merged,
            vec![
                Secret::new("DB_PASS", "arn:aws:ssm:us-east-1:111:parameter/other/path"),
                Secret::new("API_KEY", "arn:aws:ssm:us-east-1:111:parameter/shared/api-key"),
                Secret::new("TOKEN", "arn:aws:ssm:us-east-1:111:parameter/tok"),
            ]
        );
    }

    #[test]
    fn incomplete_template_entries_are_dropped() {
        let template = vec![Secret::new("", "x"), Secret::new("A", "")];
        assert!(merge_secrets(&template, &BTreeMap::new(), "1", "r").is_empty());
    }
}
