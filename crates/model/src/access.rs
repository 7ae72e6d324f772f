use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString};

/// A dashboard the user may open. Stored lowercase (`hr_up`, `pm_arch`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum RoleTag {
    Central,
    HrUp,
    HrVa,
    PmoUp,
    PmoVa,
    TaUp,
    TaVa,
    Pm,
    PmArch,
    Marketing,
    Presales,
    Dp,
    Manager,
    Employee,
}

/// Normalized set of dashboard role tags.
///
/// Legacy documents store `dashboard_access` either as a list of strings or
/// as one comma-delimited string, with arbitrary casing. Both forms
/// deserialize into this set; it always serializes back as a lowercase
/// list. Unknown tags are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardAccess(BTreeSet<RoleTag>);

impl DashboardAccess {
    pub fn new(tags: impl IntoIterator<Item = RoleTag>) -> Self {
        DashboardAccess(tags.into_iter().collect())
    }

    pub fn parse_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        DashboardAccess(
            items
                .into_iter()
                .filter_map(|item| item.as_ref().trim().to_lowercase().parse().ok())
                .collect(),
        )
    }

    pub fn has(&self, tag: RoleTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn has_any(&self, tags: &[RoleTag]) -> bool {
        tags.iter().any(|tag| self.0.contains(tag))
    }

    pub fn grant(&mut self, tag: RoleTag) {
        self.0.insert(tag);
    }

    pub fn revoke(&mut self, tag: RoleTag) {
        self.0.remove(&tag);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = RoleTag> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<RoleTag> for DashboardAccess {
    fn from_iter<T: IntoIterator<Item = RoleTag>>(iter: T) -> Self {
        DashboardAccess(iter.into_iter().collect())
    }
}

impl Serialize for DashboardAccess {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|tag| tag.to_string()))
    }
}

impl<'de> Deserialize<'de> for DashboardAccess {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Tags(Vec<String>),
            Csv(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Tags(tags) => DashboardAccess::parse_items(tags),
            Raw::Csv(csv) => DashboardAccess::parse_items(csv.split(',')),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_form_case_insensitively() {
        let access: DashboardAccess =
            serde_json::from_str(r#"["Central", " HR_VA ", "pmo_up"]"#).unwrap();
        assert!(access.has(RoleTag::Central));
        assert!(access.has(RoleTag::HrVa));
        assert!(access.has(RoleTag::PmoUp));
        assert!(!access.has(RoleTag::HrUp));
    }

    #[test]
    fn parses_comma_string_form() {
        let access: DashboardAccess = serde_json::from_str(r#""ta_va, PM_ARCH,marketing""#).unwrap();
        assert!(access.has_any(&[RoleTag::TaVa]));
        assert!(access.has(RoleTag::PmArch));
        assert!(access.has(RoleTag::Marketing));
    }

    #[test]
    fn drops_unknown_tags() {
        let access: DashboardAccess = serde_json::from_str(r#"["central", "wizard"]"#).unwrap();
        assert_eq!(access.tags().count(), 1);
    }

    #[test]
    fn serializes_as_normalized_list() {
        let access = DashboardAccess::parse_items(["HR_VA", "central"]);
        let json = serde_json::to_string(&access).unwrap();
        assert_eq!(json, r#"["central","hr_va"]"#);
    }
}
