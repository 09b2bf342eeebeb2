use super::*;
use crate::drip::ModuleWithSchedule;

/// A course module as stored, including the content that is withheld while it is locked.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, new)]
pub struct Module {
    #[new(default)]
    pub id: ModuleId,
    pub course: CourseId,
    pub title: String,
    /// Whole days after joining at which the module unlocks, `0` means immediately.
    pub unlock_day: i64,
    pub position: i64,
    #[new(default)]
    #[serde(default)]
    pub content: Option<String>,
    #[new(default)]
    #[serde(default)]
    pub video_url: Option<String>,
}

impl Module {
    pub fn schedule(&self) -> ModuleWithSchedule {
        ModuleWithSchedule {
            id: self.id.clone(),
            title: self.title.clone(),
            unlock_day: self.unlock_day,
            position: self.position,
        }
    }
}

define_table!("modules" : Module = id);

define_relation! {
    Module > for_course(course: &CourseId) > Vec<Module>
        where "SELECT * FROM modules WHERE course = $course ORDER BY position ASC"
}

define_relation! {
    Module > save(id: &ModuleId, module: &Module) > Option<Module>
        where "UPDATE $id CONTENT $module RETURN AFTER"
}
