//! Role-based access policy.
//!
//! Roles map onto a closed capability table; handlers gate operations with
//! [`require`] before invoking the engine. Single-order retrieval uses the
//! post-authorization predicate [`can_view_order`], evaluated against the
//! loaded order's owner, because the decision depends on data fetched during
//! the operation.

use common::Role;

use crate::error::DomainError;

/// What a caller may do, independent of any specific resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// View orders the caller owns.
    ViewOwnOrders,
    /// View every order in the system.
    ViewAllOrders,
    /// Transition order statuses.
    MutateOrderStatus,
    /// Create, restock, and delete catalog products.
    ManageCatalog,
    /// Create, re-role, and delete customer accounts.
    ManageUsers,
    /// View the back-office dashboard aggregates.
    ViewDashboard,
}

/// The authenticated caller, as established by the boundary layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub email: String,
    pub role: Role,
}

/// The closed capability table.
fn capabilities(role: Role) -> &'static [Capability] {
    match role {
        Role::Customer => &[Capability::ViewOwnOrders],
        Role::Seller => &[
            Capability::ViewOwnOrders,
            Capability::ViewAllOrders,
            Capability::MutateOrderStatus,
            Capability::ManageCatalog,
        ],
        Role::Administrator => &[
            Capability::ViewOwnOrders,
            Capability::ViewAllOrders,
            Capability::MutateOrderStatus,
            Capability::ManageCatalog,
            Capability::ManageUsers,
            Capability::ViewDashboard,
        ],
    }
}

/// Returns true if the role grants the capability.
pub fn allows(role: Role, capability: Capability) -> bool {
    capabilities(role).contains(&capability)
}

/// Gate for handler entry points: `Forbidden` unless the role grants the
/// capability.
pub fn require(role: Role, capability: Capability) -> Result<(), DomainError> {
    if allows(role, capability) {
        Ok(())
    } else {
        Err(DomainError::Forbidden)
    }
}

/// Post-authorization for single-order retrieval: the owner may see their
/// own order, managerial roles may see any.
pub fn can_view_order(caller: &Caller, owner_email: &str) -> bool {
    caller.email == owner_email || allows(caller.role, Capability::ViewAllOrders)
}
