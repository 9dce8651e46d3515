//! Operation-level access policy.
//!
//! Every route names its `Operation`; `authorize` looks up the requirement in
//! one table and evaluates it the same way for all of them.

use super::guard::Caller;
use super::token::Identity;
use crate::errors::{AppError, AppResult};
use crate::models::order::OrderScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListProducts,
    ReadProductImage,
    ListCategories,
    CreateProduct,
    DeleteProduct,
    CreateCategory,
    DeleteCategory,
    ListOrders,
    CreateOrder,
    DeleteOrder,
    UpdateOrderStatus,
    AddOrderItem,
    UpdateOrderItem,
    DeleteOrderItem,
    ReadOwnProfile,
    UpdateOwnProfile,
    CreateUser,
    ViewStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone, including anonymous callers
    Public,
    /// Any authenticated identity
    Authenticated,
    Admin,
    /// Admin, or the owner of the resource the operation targets
    OwnerOrAdmin,
}

impl Operation {
    pub const fn requirement(self) -> Requirement {
        use Operation::*;
        match self {
            ListProducts | ReadProductImage | ListCategories => Requirement::Public,
            CreateProduct | DeleteProduct | CreateCategory | DeleteCategory => Requirement::Admin,
            ListOrders | CreateOrder | ReadOwnProfile | UpdateOwnProfile => {
                Requirement::Authenticated
            }
            DeleteOrder | AddOrderItem | UpdateOrderItem | DeleteOrderItem => {
                Requirement::OwnerOrAdmin
            }
            UpdateOrderStatus | CreateUser | ViewStats => Requirement::Admin,
        }
    }
}

/// Resolve the caller into an identity, or the matching 401.
pub fn require_identity(caller: &Caller) -> AppResult<&Identity> {
    match caller {
        Caller::Authenticated(identity) => Ok(identity),
        Caller::Anonymous => Err(AppError::Unauthenticated("Authentication required".into())),
        Caller::Rejected(reason) => Err(AppError::InvalidCredential(reason.clone())),
    }
}

/// Check `op` for `caller`. `owner_id` is the user owning the targeted
/// resource and is only consulted for `OwnerOrAdmin` operations.
pub fn authorize<'a>(
    caller: &'a Caller,
    op: Operation,
    owner_id: Option<i64>,
) -> AppResult<Option<&'a Identity>> {
    let requirement = op.requirement();
    if requirement == Requirement::Public {
        return Ok(caller.identity());
    }

    let identity = require_identity(caller)?;

    let allowed = match requirement {
        Requirement::Public | Requirement::Authenticated => true,
        Requirement::Admin => identity.is_admin(),
        Requirement::OwnerOrAdmin => identity.is_admin() || owner_id == Some(identity.id),
    };

    if allowed {
        Ok(Some(identity))
    } else {
        tracing::debug!(target: "AUTH", user_id = identity.id, ?op, "Access denied");
        Err(AppError::forbidden(match requirement {
            Requirement::Admin => "Admin access required",
            _ => "You do not have access to this resource",
        }))
    }
}

/// Admins list every order, everyone else only their own.
pub fn order_scope(identity: &Identity) -> OrderScope {
    if identity.is_admin() {
        OrderScope::All
    } else {
        OrderScope::Owner(identity.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn caller(id: i64, role: Role) -> Caller {
        Caller::Authenticated(Identity {
            id,
            email: format!("u{id}@shop.test"),
            role,
        })
    }

    #[test]
    fn public_ops_ignore_credentials() {
        assert!(authorize(&Caller::Anonymous, Operation::ListProducts, None).unwrap().is_none());
        let rejected = Caller::Rejected("Token expired".into());
        assert!(authorize(&rejected, Operation::ReadProductImage, None).is_ok());
        assert!(authorize(&caller(1, Role::User), Operation::ListCategories, None).unwrap().is_some());
    }

    #[test]
    fn anonymous_vs_rejected_are_distinct() {
        let err = authorize(&Caller::Anonymous, Operation::ViewStats, None).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));

        let err = authorize(&Caller::Rejected("bad".into()), Operation::ListOrders, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidCredential(_)));
    }

    #[test]
    fn admin_only_operations() {
        for op in [
            Operation::CreateProduct,
            Operation::DeleteProduct,
            Operation::CreateCategory,
            Operation::DeleteCategory,
            Operation::UpdateOrderStatus,
            Operation::CreateUser,
            Operation::ViewStats,
        ] {
            let err = authorize(&caller(2, Role::User), op, None).unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)), "{op:?}");
            assert!(authorize(&caller(1, Role::Admin), op, None).is_ok(), "{op:?}");
        }
    }

    #[test]
    fn owner_or_admin() {
        let owner = caller(2, Role::User);
        let stranger = caller(3, Role::User);
        let admin = caller(1, Role::Admin);

        assert!(authorize(&owner, Operation::DeleteOrder, Some(2)).is_ok());
        assert!(authorize(&admin, Operation::DeleteOrder, Some(2)).is_ok());
        let err = authorize(&stranger, Operation::DeleteOrderItem, Some(2)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        // unknown owner never matches a non-admin
        assert!(authorize(&owner, Operation::UpdateOrderItem, None).is_err());
    }

    #[test]
    fn authenticated_ops_open_to_users() {
        let user = caller(2, Role::User);
        for op in [
            Operation::ListOrders,
            Operation::CreateOrder,
            Operation::ReadOwnProfile,
            Operation::UpdateOwnProfile,
        ] {
            assert!(authorize(&user, op, None).is_ok());
            assert!(authorize(&Caller::Anonymous, op, None).is_err());
        }
    }

    #[test]
    fn scope_by_role() {
        let admin = Identity { id: 1, email: "a@shop.test".into(), role: Role::Admin };
        let user = Identity { id: 9, email: "u@shop.test".into(), role: Role::User };
        assert_eq!(order_scope(&admin), OrderScope::All);
        assert_eq!(order_scope(&user), OrderScope::Owner(9));
    }
}
