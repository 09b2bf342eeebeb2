use super::*;

/// A member marked a module as complete.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Progress {
    pub id: Record<Progress>,
    pub membership: MembershipId,
    pub module: ModuleId,
    pub completed_at: Timestamp,
}

impl Progress {
    pub fn new(membership: MembershipId, module: ModuleId, completed_at: Timestamp) -> Self {
        Self {
            id: Self::key(&membership, &module),
            membership,
            module,
            completed_at,
        }
    }

    pub fn key(membership: &MembershipId, module: &ModuleId) -> Record<Progress> {
        pair_key(membership, module)
    }
}

define_table!("progress" : Progress = id);

define_relation! {
    Progress > get(id: &Record<Progress>) > Option<Progress>
        where "SELECT * FROM $id"
}

define_relation! {
    Progress > for_membership(membership: &MembershipId) > Vec<Progress>
        where "SELECT * FROM progress WHERE membership = $membership"
}

define_relation! {
    Progress > insert(
        id: &Record<Progress>,
        membership: &MembershipId,
        module: &ModuleId,
        completed_at: &Timestamp
    ) > Option<Progress>
        where "CREATE $id SET membership = $membership, module = $module, completed_at = $completed_at"
}

define_relation! {
    Progress > remove(id: &Record<Progress>) > Vec<Option<Progress>>
        where "DELETE $id RETURN BEFORE"
}
