//! Positional assignment of plan items to implementation roles.

/// One implementation role and the plan item it owns, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub role: String,
    pub item: Option<String>,
}

/// Zip roles with items: item *i* goes to role *i*.
///
/// Extra roles get no item; extra items stay unassigned.
pub fn assign_work_items(roles: &[String], items: &[String]) -> Vec<Assignment> {
    roles
        .iter()
        .enumerate()
        .map(|(i, role)| Assignment {
            role: role.clone(),
            item: items.get(i).cloned(),
        })
        .collect()
}
