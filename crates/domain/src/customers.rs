//! Customer account management.

use common::{CustomerId, Role};
use store::{CommerceStore, NewCustomer};

use crate::error::DomainError;
use crate::views::CustomerView;

/// Service for managing customer accounts.
///
/// The credential arrives already hashed; this layer treats it as opaque.
pub struct CustomerService<S> {
    store: S,
}

impl<S: CommerceStore> CustomerService<S> {
    /// Creates a new customer service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a customer account. Duplicate emails are a conflict.
    #[tracing::instrument(skip(self, new), fields(email = %new.email))]
    pub async fn create_customer(&self, new: NewCustomer) -> Result<CustomerView, DomainError> {
        if new.name.trim().is_empty() {
            return Err(DomainError::Invalid(
                "customer name must not be empty".to_string(),
            ));
        }
        if !is_plausible_email(&new.email) {
            return Err(DomainError::Invalid(format!(
                "malformed email address: {}",
                new.email
            )));
        }

        if self.store.find_by_email(&new.email).await?.is_some() {
            return Err(DomainError::EmailTaken(new.email));
        }

        // The unique index still backstops a concurrent registration; the
        // store surfaces that as DuplicateEmail and it maps to the same
        // conflict.
        let customer = self.store.insert_customer(new).await?;
        tracing::info!(customer_id = %customer.id, "customer created");
        Ok(customer.into())
    }

    /// All customer accounts, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_customers(&self) -> Result<Vec<CustomerView>, DomainError> {
        let customers = self.store.list_customers().await?;
        Ok(customers.into_iter().map(CustomerView::from).collect())
    }

    /// Changes an account's role. Administrators cannot re-role themselves.
    #[tracing::instrument(skip(self, caller_email))]
    pub async fn set_role(
        &self,
        id: CustomerId,
        role: Role,
        caller_email: &str,
    ) -> Result<CustomerView, DomainError> {
        let customer = self.load_customer(id).await?;
        if customer.email == caller_email {
            return Err(DomainError::SelfModification {
                action: "change the role of",
            });
        }

        let updated = self
            .store
            .set_role(id, role)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "customer",
                id: id.to_string(),
            })?;
        tracing::info!(customer_id = %id, role = %role, "role changed");
        Ok(updated.into())
    }

    /// Deletes an account. Blocked for self-deletion and for customers who
    /// own any orders.
    #[tracing::instrument(skip(self, caller_email))]
    pub async fn delete_customer(
        &self,
        id: CustomerId,
        caller_email: &str,
    ) -> Result<(), DomainError> {
        let customer = self.load_customer(id).await?;
        if customer.email == caller_email {
            return Err(DomainError::SelfModification { action: "delete" });
        }
        if self.store.customer_has_orders(id).await? {
            return Err(DomainError::CustomerHasOrders {
                name: customer.name,
            });
        }

        self.store.delete_customer(id).await?;
        tracing::info!(customer_id = %id, "customer deleted");
        Ok(())
    }

    async fn load_customer(&self, id: CustomerId) -> Result<store::Customer, DomainError> {
        self.store
            .get_customer(id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "customer",
                id: id.to_string(),
            })
    }
}

/// Just enough shape-checking to catch obvious typos; real mail validation
/// belongs to the boundary's collaborators.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, host)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && !host.is_empty() && !host.starts_with('.') && host.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use store::{MemoryStore, NewOrder, OrderItem, OrderRepository};

    fn new_customer(name: &str, email: &str, role: Role) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_customers() {
        let service = CustomerService::new(MemoryStore::new());

        let view = service
            .create_customer(new_customer("Ada", "ada@example.com", Role::Customer))
            .await
            .unwrap();
        assert_eq!(view.email, "ada@example.com");
        assert_eq!(view.role, Role::Customer);

        let all = service.list_customers().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let service = CustomerService::new(MemoryStore::new());
        service
            .create_customer(new_customer("Ada", "ada@example.com", Role::Customer))
            .await
            .unwrap();

        let err = service
            .create_customer(new_customer("Imposter", "ada@example.com", Role::Seller))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::EmailTaken(_)));
    }

    #[tokio::test]
    async fn test_email_shape_validation() {
        let service = CustomerService::new(MemoryStore::new());
        for bad in ["", "no-at-sign", "@example.com", "x@", "x@nodot"] {
            let err = service
                .create_customer(new_customer("Ada", bad, Role::Customer))
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Invalid(_)), "email {bad:?}");
        }
    }

    #[tokio::test]
    async fn test_admin_cannot_change_own_role_but_can_change_others() {
        let service = CustomerService::new(MemoryStore::new());
        let admin = service
            .create_customer(new_customer("Root", "root@example.com", Role::Administrator))
            .await
            .unwrap();
        let other = service
            .create_customer(new_customer("Ada", "ada@example.com", Role::Customer))
            .await
            .unwrap();

        let err = service
            .set_role(admin.id, Role::Customer, "root@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SelfModification { .. }));

        let updated = service
            .set_role(other.id, Role::Seller, "root@example.com")
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Seller);
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let service = CustomerService::new(MemoryStore::new());
        let admin = service
            .create_customer(new_customer("Root", "root@example.com", Role::Administrator))
            .await
            .unwrap();

        let err = service
            .delete_customer(admin.id, "root@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SelfModification { .. }));
    }

    #[tokio::test]
    async fn test_delete_blocked_for_customer_with_orders() {
        let store = MemoryStore::new();
        let service = CustomerService::new(store.clone());
        let ada = service
            .create_customer(new_customer("Ada", "ada@example.com", Role::Customer))
            .await
            .unwrap();

        store
            .insert_order(NewOrder {
                customer_id: ada.id,
                items: vec![OrderItem {
                    product_id: common::ProductId::new(),
                    quantity: 1,
                    unit_price: Money::from_cents(100),
                }],
                total: Money::from_cents(100),
            })
            .await
            .unwrap();

        let err = service
            .delete_customer(ada.id, "root@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CustomerHasOrders { .. }));
    }

    #[tokio::test]
    async fn test_delete_idle_customer_succeeds() {
        let service = CustomerService::new(MemoryStore::new());
        let ada = service
            .create_customer(new_customer("Ada", "ada@example.com", Role::Customer))
            .await
            .unwrap();

        service
            .delete_customer(ada.id, "root@example.com")
            .await
            .unwrap();
        assert!(service.list_customers().await.unwrap().is_empty());

        let err = service
            .delete_customer(ada.id, "root@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
