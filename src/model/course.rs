use super::*;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, new)]
pub struct Course {
    #[new(default)]
    pub id: CourseId,
    pub company: CompanyId,
    pub title: String,
    #[new(default)]
    #[serde(default)]
    pub description: Option<String>,
}

define_table!("courses" : Course = id);

define_relation! {
    Course > get(id: &CourseId) > Option<Course>
        where "SELECT * FROM $id"
}

define_relation! {
    Course > save(id: &CourseId, course: &Course) > Option<Course>
        where "UPDATE $id CONTENT $course RETURN AFTER"
}
