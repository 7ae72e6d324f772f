use std::collections::BTreeMap;

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::user::Grade;

/// Code/name of the special category whose values are a billability
/// percentage rather than additive points.
pub const UTILIZATION_CODE: &str = "utilization_billable";
pub const UTILIZATION_NAME: &str = "Utilization/Billable";

/// Code of the synthetic category milestone bonuses are awarded under.
pub const BONUS_CODE: &str = "bonus_points";

/// Department that owns a category and validates its requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Department {
    Hr,
    Pmo,
    Ta,
    Pm,
    PmArch,
    Marketing,
    Presales,
    Central,
}

impl Department {
    pub fn validator_tag(&self) -> crate::access::RoleTag {
        use crate::access::RoleTag;
        match self {
            Department::Hr => RoleTag::HrVa,
            Department::Pmo => RoleTag::PmoVa,
            Department::Ta => RoleTag::TaVa,
            Department::Pm => RoleTag::Pm,
            Department::PmArch => RoleTag::PmArch,
            Department::Marketing => RoleTag::Marketing,
            Department::Presales => RoleTag::Presales,
            Department::Central => RoleTag::Central,
        }
    }

    pub fn updater_tag(&self) -> crate::access::RoleTag {
        use crate::access::RoleTag;
        match self {
            Department::Hr => RoleTag::HrUp,
            Department::Pmo => RoleTag::PmoUp,
            Department::Ta => RoleTag::TaUp,
            other => other.validator_tag(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CategoryStatus {
    #[default]
    #[serde(alias = "active")]
    Active,
    #[serde(alias = "inactive")]
    Inactive,
}

/// Points granted per unit: either flat or keyed by employee grade.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum PointsPerUnit {
    Flat(f64),
    PerGrade(BTreeMap<Grade, f64>),
}

impl Default for PointsPerUnit {
    fn default() -> Self {
        PointsPerUnit::Flat(0.0)
    }
}

impl PointsPerUnit {
    pub fn for_grade(&self, grade: Option<Grade>) -> i64 {
        match self {
            PointsPerUnit::Flat(points) => points.round() as i64,
            PointsPerUnit::PerGrade(by_grade) => grade
                .and_then(|g| by_grade.get(&g))
                .map(|points| points.round() as i64)
                .unwrap_or(0),
        }
    }
}

/// A recognition category. One type covers both generations of the schema:
/// the legacy `categories` collection (`code`, lowercase departments) and
/// the newer `hr_categories` collection (`category_code`). Field names
/// serialize in the new form; aliases accept the old one.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(rename = "category_code", alias = "code", default)]
    pub code: String,
    #[serde(rename = "category_department", alias = "department", default)]
    pub department: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub points_per_unit: PointsPerUnit,
    #[serde(default)]
    pub is_bonus: bool,
    #[serde(rename = "category_status", default)]
    pub status: CategoryStatus,
}

impl Category {
    pub fn department_tag(&self) -> Option<Department> {
        self.department.as_deref().and_then(|d| d.trim().parse().ok())
    }

    pub fn is_utilization(&self) -> bool {
        self.code == UTILIZATION_CODE || self.name == UTILIZATION_NAME
    }

    pub fn is_active(&self) -> bool {
        self.status == CategoryStatus::Active
    }
}

/// A logical category after merging both collections by name.
///
/// Requests may reference either generation's `_id`; aggregating over
/// `ids` makes them count together.
#[derive(Debug, Clone, Serialize)]
pub struct MergedCategory {
    pub name: String,
    pub code: String,
    pub ids: Vec<ObjectId>,
}

impl MergedCategory {
    /// Merge by case-sensitive name. Legacy entries come first; when a
    /// name exists in both collections the newer collection's code wins.
    pub fn merge_by_name(legacy: &[Category], hr: &[Category]) -> Vec<MergedCategory> {
        let mut merged: Vec<MergedCategory> = Vec::new();
        for cat in legacy.iter().chain(hr) {
            if cat.name.is_empty() {
                continue;
            }
            match merged.iter_mut().find(|m| m.name == cat.name) {
                Some(existing) => {
                    existing.ids.push(cat.id);
                    if !cat.code.is_empty() {
                        existing.code = cat.code.clone();
                    }
                }
                None => merged.push(MergedCategory {
                    name: cat.name.clone(),
                    code: cat.code.clone(),
                    ids: vec![cat.id],
                }),
            }
        }
        merged
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.ids.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, code: &str) -> Category {
        Category {
            id: ObjectId::new(),
            name: name.into(),
            code: code.into(),
            department: None,
            description: None,
            points_per_unit: PointsPerUnit::default(),
            is_bonus: false,
            status: CategoryStatus::Active,
        }
    }

    #[test]
    fn merge_unions_ids_and_prefers_new_code() {
        let legacy = vec![category("Mentoring", "mentoring_old")];
        let hr = vec![category("Mentoring", "mentoring"), category("Webinars", "webinars")];
        let merged = MergedCategory::merge_by_name(&legacy, &hr);

        assert_eq!(merged.len(), 2);
        let mentoring = &merged[0];
        assert_eq!(mentoring.name, "Mentoring");
        assert_eq!(mentoring.code, "mentoring");
        assert_eq!(mentoring.ids.len(), 2);
        assert!(mentoring.contains(&legacy[0].id));
        assert!(mentoring.contains(&hr[0].id));
    }

    #[test]
    fn merge_is_case_sensitive_on_name() {
        let merged = MergedCategory::merge_by_name(
            &[category("mentoring", "a")],
            &[category("Mentoring", "b")],
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn utilization_matches_by_code_or_name() {
        assert!(category(UTILIZATION_NAME, "").is_utilization());
        assert!(category("Billable", UTILIZATION_CODE).is_utilization());
        assert!(!category("Mentoring", "mentoring").is_utilization());
    }

    #[test]
    fn department_parses_case_insensitively() {
        let mut cat = category("X", "x");
        cat.department = Some("HR".into());
        assert_eq!(cat.department_tag(), Some(Department::Hr));
        cat.department = Some("pmarch".into());
        assert_eq!(cat.department_tag(), Some(Department::PmArch));
    }

    #[test]
    fn per_grade_points() {
        let per_grade = PointsPerUnit::PerGrade(
            [(Grade::A1, 100.0), (Grade::C1, 250.0)].into_iter().collect(),
        );
        assert_eq!(per_grade.for_grade(Some(Grade::C1)), 250);
        assert_eq!(per_grade.for_grade(Some(Grade::B1)), 0);
        assert_eq!(PointsPerUnit::Flat(50.0).for_grade(None), 50);
    }
}
