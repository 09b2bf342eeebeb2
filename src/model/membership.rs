use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Cancelled,
    Expired,
}

/// A member's access to a company. `joined_at` anchors every drip calculation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, new)]
pub struct Membership {
    #[new(default)]
    pub id: MembershipId,
    pub company: CompanyId,
    /// Platform user id, the recipient of unlock notifications.
    pub user_id: String,
    pub joined_at: Timestamp,
    #[new(value = "MembershipStatus::Active")]
    pub status: MembershipStatus,
    #[new(default)]
    #[serde(default)]
    pub username: Option<String>,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

define_table!("memberships" : Membership = id);

define_relation! {
    Membership > get(id: &MembershipId) > Option<Membership>
        where "SELECT * FROM $id"
}

define_relation! {
    Membership > active() > Vec<Membership>
        where "SELECT * FROM memberships WHERE status = 'active' ORDER BY joined_at ASC"
}

define_relation! {
    Membership > save(id: &MembershipId, membership: &Membership) > Option<Membership>
        where "UPDATE $id CONTENT $membership RETURN AFTER"
}
