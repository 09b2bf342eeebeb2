use derive_new::new;
use serde::{Deserialize, Serialize};

use surrealdb::sql::{Array, Id, Value};

use crate::database::{Record, Table};
use crate::define_relation;
use crate::define_table;
use crate::time::Timestamp;

pub use company::*;
pub use course::*;
pub use membership::*;
pub use module::*;
pub use notification_log::*;
pub use progress::*;

mod company;
mod course;
mod membership;
mod module;
mod notification_log;
mod progress;

pub type CompanyId = Record<Company>;
pub type CourseId = Record<Course>;
pub type ModuleId = Record<Module>;
pub type MembershipId = Record<Membership>;

/// Key for rows that exist at most once per (membership, module) pair.
///
/// An array id keeps the two parts apart whatever characters they contain.
fn pair_key<T: Table>(membership: &MembershipId, module: &ModuleId) -> Record<T> {
    let pair = Array::from(vec![Value::from(membership.key()), Value::from(module.key())]);
    Record::new(Id::Array(pair))
}
