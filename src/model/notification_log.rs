use super::*;

/// Marker that a member was already told about a module.
///
/// Rows are append-only: one exists per (membership, module) pair and is never
/// removed, even when a corrected join date makes the module unlock again.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NotificationLog {
    pub id: Record<NotificationLog>,
    pub membership: MembershipId,
    pub module: ModuleId,
    pub sent_at: Timestamp,
}

impl NotificationLog {
    pub fn new(membership: MembershipId, module: ModuleId, sent_at: Timestamp) -> Self {
        Self {
            id: Self::key(&membership, &module),
            membership,
            module,
            sent_at,
        }
    }

    pub fn key(membership: &MembershipId, module: &ModuleId) -> Record<NotificationLog> {
        pair_key(membership, module)
    }
}

define_table!("notifications_log" : NotificationLog = id);

define_relation! {
    NotificationLog > get(id: &Record<NotificationLog>) > Option<NotificationLog>
        where "SELECT * FROM $id"
}

define_relation! {
    NotificationLog > insert(
        id: &Record<NotificationLog>,
        membership: &MembershipId,
        module: &ModuleId,
        sent_at: &Timestamp
    ) > Option<NotificationLog>
        where "CREATE $id SET membership = $membership, module = $module, sent_at = $sent_at"
}
