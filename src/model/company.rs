use super::*;

/// A tenant that installed the app.
///
/// A company publishes at most one course at a time, which is why the
/// published course is a single optional link rather than a flag on every course.
#[derive(Clone, PartialEq, Deserialize, Serialize, new)]
pub struct Company {
    #[new(default)]
    pub id: CompanyId,
    pub name: String,
    /// Credential handed to the notifier when messaging this company's members.
    pub access_token: String,
    #[new(default)]
    #[serde(default)]
    pub published_course: Option<CourseId>,
}

impl Company {
    pub fn publish(mut self, course: &Course) -> Self {
        self.published_course = Some(course.id.clone());
        self
    }
}

impl std::fmt::Debug for Company {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Company")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("access_token", &"<redacted>")
            .field("published_course", &self.published_course)
            .finish()
    }
}

define_table!("companies" : Company = id);

define_relation! {
    Company > get(id: &CompanyId) > Option<Company>
        where "SELECT * FROM $id"
}

define_relation! {
    Company > save(id: &CompanyId, company: &Company) > Option<Company>
        where "UPDATE $id CONTENT $company RETURN AFTER"
}
