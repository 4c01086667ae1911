use serde::{Deserialize, Serialize};

use bitflow_core::{CollegeId, DepartmentId, PublisherId, UserId};

use crate::Role;

/// The authenticated caller of a request.
///
/// Built once per request by the authentication layer and read-only to the
/// policy engine. Affiliations are optional: platform owners have none,
/// publisher admins carry a publisher, college roles carry a college (and
/// department heads/faculty usually a department).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub college_id: Option<CollegeId>,
    pub publisher_id: Option<PublisherId>,
    pub department_id: Option<DepartmentId>,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            college_id: None,
            publisher_id: None,
            department_id: None,
        }
    }

    pub fn in_college(mut self, college_id: CollegeId) -> Self {
        self.college_id = Some(college_id);
        self
    }

    pub fn in_department(mut self, department_id: DepartmentId) -> Self {
        self.department_id = Some(department_id);
        self
    }

    pub fn for_publisher(mut self, publisher_id: PublisherId) -> Self {
        self.publisher_id = Some(publisher_id);
        self
    }
}
