use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bitflow_core::{CollegeId, DomainError, PermissionSetId};

/// A single named faculty capability.
///
/// Capabilities are a closed set mirroring the boolean columns of a
/// [`FacultyPermissionSet`]; the wire name is the camelCase column name
/// (e.g. `"canCreateCourses"`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    CanCreateCourses,
    CanEditCourses,
    CanDeleteCourses,
    CanViewAnalytics,
    CanManageStudents,
    CanCreateTests,
    CanEditTests,
    CanDeleteTests,
    CanGradeSubmissions,
    CanExportReports,
}

impl Capability {
    pub const ALL: [Capability; 10] = [
        Capability::CanCreateCourses,
        Capability::CanEditCourses,
        Capability::CanDeleteCourses,
        Capability::CanViewAnalytics,
        Capability::CanManageStudents,
        Capability::CanCreateTests,
        Capability::CanEditTests,
        Capability::CanDeleteTests,
        Capability::CanGradeSubmissions,
        Capability::CanExportReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::CanCreateCourses => "canCreateCourses",
            Capability::CanEditCourses => "canEditCourses",
            Capability::CanDeleteCourses => "canDeleteCourses",
            Capability::CanViewAnalytics => "canViewAnalytics",
            Capability::CanManageStudents => "canManageStudents",
            Capability::CanCreateTests => "canCreateTests",
            Capability::CanEditTests => "canEditTests",
            Capability::CanDeleteTests => "canDeleteTests",
            Capability::CanGradeSubmissions => "canGradeSubmissions",
            Capability::CanExportReports => "canExportReports",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| DomainError::unknown_variant("capability", s))
    }
}

/// A named, reusable set of faculty capabilities scoped to a college.
///
/// Many faculty assignments may reference the same set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyPermissionSet {
    pub id: Option<PermissionSetId>,
    pub college_id: Option<CollegeId>,
    pub name: String,
    pub can_create_courses: bool,
    pub can_edit_courses: bool,
    pub can_delete_courses: bool,
    pub can_view_analytics: bool,
    pub can_manage_students: bool,
    pub can_create_tests: bool,
    pub can_edit_tests: bool,
    pub can_delete_tests: bool,
    pub can_grade_submissions: bool,
    pub can_export_reports: bool,
}

impl FacultyPermissionSet {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether this set grants `capability`.
    pub fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::CanCreateCourses => self.can_create_courses,
            Capability::CanEditCourses => self.can_edit_courses,
            Capability::CanDeleteCourses => self.can_delete_courses,
            Capability::CanViewAnalytics => self.can_view_analytics,
            Capability::CanManageStudents => self.can_manage_students,
            Capability::CanCreateTests => self.can_create_tests,
            Capability::CanEditTests => self.can_edit_tests,
            Capability::CanDeleteTests => self.can_delete_tests,
            Capability::CanGradeSubmissions => self.can_grade_submissions,
            Capability::CanExportReports => self.can_export_reports,
        }
    }

    /// Builder-style toggle, mostly for seeding and tests.
    pub fn with(mut self, capability: Capability, granted: bool) -> Self {
        let slot = match capability {
            Capability::CanCreateCourses => &mut self.can_create_courses,
            Capability::CanEditCourses => &mut self.can_edit_courses,
            Capability::CanDeleteCourses => &mut self.can_delete_courses,
            Capability::CanViewAnalytics => &mut self.can_view_analytics,
            Capability::CanManageStudents => &mut self.can_manage_students,
            Capability::CanCreateTests => &mut self.can_create_tests,
            Capability::CanEditTests => &mut self.can_edit_tests,
            Capability::CanDeleteTests => &mut self.can_delete_tests,
            Capability::CanGradeSubmissions => &mut self.can_grade_submissions,
            Capability::CanExportReports => &mut self.can_export_reports,
        };
        *slot = granted;
        self
    }
}
