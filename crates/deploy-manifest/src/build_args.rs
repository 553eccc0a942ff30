//! Docker build arguments for a build item

use std::collections::BTreeMap;

use crate::context::DeployContext;
use crate::schema::BuildItem;
use crate::substitute::RELEASE;

/// Build arguments of `item` with placeholders substituted. `RELEASE` is
/// always present; a configured value wins.
pub fn resolve_build_args(
    context: &DeployContext,
    region: &str,
    item: &BuildItem,
) -> BTreeMap<String, String> {
    let subs = context.substitutions().region(region);
    let mut args: BTreeMap<String, String> = item
        .build_args
        .iter()
        .map(|(key, value)| (key.clone(), subs.apply(value)))
        .collect();
    args.entry(RELEASE.to_string())
        .or_insert_with(|| context.release.clone());
    args
}
