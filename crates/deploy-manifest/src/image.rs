//! Container image references

use crate::Result;
use crate::schema::BuildItem;

/// `{account_id}.dkr.ecr.{region}.amazonaws.com/{repo}:{tag}`
pub fn ecr_image_uri(account_id: &str, region: &str, repo_name: &str, tag: &str) -> String {
    format!("{account_id}.dkr.ecr.{region}.amazonaws.com/{repo_name}:{tag}")
}

/// Turn a container's configured image into a pullable reference.
///
/// A reference naming one of `build_items` becomes the ECR URI of that build,
/// tagged with `release`. The item's own `accountId`/`region` take priority
/// over the stage-level values passed in. Any other reference is returned
/// as written.
pub fn resolve_image(
    image_ref: &str,
    build_items: &[BuildItem],
    account_id: &str,
    region: &str,
    release: &str,
) -> Result<String> {
    let Some(item) = build_items.iter().find(|item| item.name == image_ref) else {
        return Ok(image_ref.to_string());
    };

    Ok(ecr_image_uri(
        item.account_id.as_deref().unwrap_or(account_id),
        item.region.as_deref().unwrap_or(region),
        item.repo_name()?,
        release,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use rstest::rstest;

    fn web() -> BuildItem {
        BuildItem {
            name: "web".into(),
            account_id: Some("111111111111".into()),
            region: Some("us-east-1".into()),
            repo_name: Some("svc".into()),
            ..Default::default()
        }
    }

    #[rstest]
    #[case("web", "111111111111.dkr.ecr.us-east-1.amazonaws.com/svc:abc123")]
    #[case("nginx:1.25", "nginx:1.25")]
    #[case("public.ecr.aws/web:1", "public.ecr.aws/web:1")]
    fn resolves_build_items_only(#[case] image_ref: &str, #[case] expected: &str) {
        let image = resolve_image(image_ref, &[web()], "999", "eu-west-1", "abc123").unwrap();
        assert_eq!(image, expected);
    }

    #[test]
    fn stage_values_fill_in_for_item() {
        let item = BuildItem {
            account_id: None,
            region: None,
            ..web()
        };
        let image = resolve_image("web", &[item], "222222222222", "eu-west-1", "r1").unwrap();
        assert_eq!(image, "222222222222.dkr.ecr.eu-west-1.amazonaws.com/svc:r1");
    }

    #[test]
    fn build_item_without_repo_name_fails() {
        let item = BuildItem {
            repo_name: None,
            ..web()
        };
        let err = resolve_image("web", &[item], "1", "r", "t").unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { field: "repoName", .. }));
    }
}
