//! Repos is a module responsible for interacting with access control lists

#[macro_use]
pub mod macros;
pub mod roles_cache;

pub use self::roles_cache::RolesCacheImpl;

use std::collections::HashMap;
use std::rc::Rc;

use errors::Error;
use failure::Error as FailureError;
use failure::Fail;

use repos::legacy_acl::{Acl, CheckScope};

use models::authorization::*;
use models::UserId;

pub fn check<T>(
    acl: &Acl<Resource, Action, Scope, FailureError, T>,
    resource: Resource,
    action: Action,
    scope_checker: &CheckScope<Scope, T>,
    obj: Option<&T>,
) -> Result<(), FailureError> {
    acl.allows(resource, action, scope_checker, obj).and_then(|allowed| {
        if allowed {
            Ok(())
        } else {
            Err(Error::Forbidden
                .context(format!("Denied request to do {:?} on {:?}", action, resource))
                .into())
        }
    })
}

/// ApplicationAcl contains main logic for manipulation with resources
#[derive(Clone)]
pub struct ApplicationAcl {
    acls: Rc<HashMap<Role, Vec<Permission>>>,
    roles: Vec<Role>,
    user_id: UserId,
}

impl ApplicationAcl {
    pub fn new(roles: Vec<Role>, user_id: UserId) -> Self {
        let mut hash = ::std::collections::HashMap::new();
        hash.insert(
            Role::Superuser,
            vec![
                permission!(Resource::Merchant),
                permission!(Resource::MerchantDocument),
                permission!(Resource::Agent),
                permission!(Resource::ApiKey),
                permission!(Resource::UsageRecord),
                permission!(Resource::UserRoles),
            ],
        );
        hash.insert(
            Role::Employee,
            vec![
                permission!(Resource::Merchant, Action::Read),
                permission!(Resource::Merchant, Action::Write),
                permission!(Resource::MerchantDocument, Action::Read),
                permission!(Resource::UsageRecord, Action::Read),
                permission!(Resource::UserRoles, Action::Read, Scope::Owned),
            ],
        );
        ApplicationAcl {
            acls: Rc::new(hash),
            roles,
            user_id,
        }
    }
}

impl<T> Acl<Resource, Action, Scope, FailureError, T> for ApplicationAcl {
    fn allows(
        &self,
        resource: Resource,
        action: Action,
        scope_checker: &CheckScope<Scope, T>,
        obj: Option<&T>,
    ) -> Result<bool, FailureError> {
        let empty: Vec<Permission> = Vec::new();
        let user_id = &self.user_id;
        let hashed_acls = self.acls.clone();
        let acls = self.roles
            .iter()
            .flat_map(|role| hashed_acls.get(role).unwrap_or(&empty))
            .filter(|permission| (permission.resource == resource) && ((permission.action == action) || (permission.action == Action::All)))
            .filter(|permission| scope_checker.is_in_scope(*user_id, &permission.scope, obj));

        Ok(acls.count() > 0)
    }
}

#[cfg(test)]
mod tests {
    use repos::legacy_acl::{Acl, CheckScope};

    use models::*;
    use repos::*;

    fn create_merchant() -> Merchant {
        use bigdecimal::BigDecimal;
        use chrono::NaiveDateTime;

        Merchant {
            id: MerchantId::new(),
            legal_name: "Acme Inc".to_string(),
            contact_email: "ops@acme.example".to_string(),
            country: "US".to_string(),
            monthly_volume: BigDecimal::from(10_000),
            status: MerchantStatus::PendingReview,
            psp_provider: None,
            psp_validated: false,
            psp_last_verified_at: None,
            rejection_reason: None,
            created_at: NaiveDateTime::from_timestamp(0, 0),
            updated_at: NaiveDateTime::from_timestamp(0, 0),
            deleted_at: None,
        }
    }

    #[derive(Default)]
    struct ScopeChecker;

    impl CheckScope<Scope, Merchant> for ScopeChecker {
        fn is_in_scope(&self, _user_id: UserId, scope: &Scope, _obj: Option<&Merchant>) -> bool {
            match *scope {
                Scope::All => true,
                Scope::Owned => false,
            }
        }
    }

    impl CheckScope<Scope, UserRole> for ScopeChecker {
        fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&UserRole>) -> bool {
            match *scope {
                Scope::All => true,
                Scope::Owned => {
                    if let Some(user_role) = obj {
                        user_role.user_id == user_id
                    } else {
                        false
                    }
                }
            }
        }
    }

    #[test]
    fn test_super_user_for_merchants() {
        let acl = ApplicationAcl::new(vec![Role::Superuser], UserId(1232));
        let s = ScopeChecker::default();
        let resource = create_merchant();

        assert_eq!(acl.allows(Resource::Merchant, Action::All, &s, Some(&resource)).unwrap(), true);
        assert_eq!(acl.allows(Resource::Merchant, Action::Read, &s, Some(&resource)).unwrap(), true);
        assert_eq!(acl.allows(Resource::Merchant, Action::Write, &s, Some(&resource)).unwrap(), true);
    }

    #[test]
    fn test_employee_for_merchants() {
        let acl = ApplicationAcl::new(vec![Role::Employee], UserId(2));
        let s = ScopeChecker::default();
        let resource = create_merchant();

        assert_eq!(acl.allows(Resource::Merchant, Action::All, &s, Some(&resource)).unwrap(), false);
        assert_eq!(acl.allows(Resource::Merchant, Action::Read, &s, Some(&resource)).unwrap(), true);
        assert_eq!(acl.allows(Resource::Merchant, Action::Write, &s, Some(&resource)).unwrap(), true);
    }

    #[test]
    fn test_employee_cannot_touch_api_keys() {
        let acl = ApplicationAcl::new(vec![Role::Employee], UserId(2));
        let s = ScopeChecker::default();
        let resource = create_merchant();

        assert_eq!(acl.allows(Resource::ApiKey, Action::Read, &s, Some(&resource)).unwrap(), false);
        assert_eq!(acl.allows(Resource::ApiKey, Action::Write, &s, Some(&resource)).unwrap(), false);
    }

    #[test]
    fn test_super_user_for_user_roles() {
        let acl = ApplicationAcl::new(vec![Role::Superuser], UserId(1232));
        let s = ScopeChecker::default();

        let resource = UserRole {
            id: RoleId::new(),
            user_id: UserId(1),
            name: Role::Employee,
            data: None,
        };

        assert_eq!(acl.allows(Resource::UserRoles, Action::All, &s, Some(&resource)).unwrap(), true);
        assert_eq!(acl.allows(Resource::UserRoles, Action::Read, &s, Some(&resource)).unwrap(), true);
        assert_eq!(acl.allows(Resource::UserRoles, Action::Write, &s, Some(&resource)).unwrap(), true);
    }

    #[test]
    fn test_employee_for_user_roles() {
        let acl = ApplicationAcl::new(vec![Role::Employee], UserId(2));
        let s = ScopeChecker::default();

        let resource = UserRole {
            id: RoleId::new(),
            user_id: UserId(1),
            name: Role::Employee,
            data: None,
        };

        assert_eq!(acl.allows(Resource::UserRoles, Action::All, &s, Some(&resource)).unwrap(), false);
        assert_eq!(acl.allows(Resource::UserRoles, Action::Read, &s, Some(&resource)).unwrap(), false);
        assert_eq!(acl.allows(Resource::UserRoles, Action::Write, &s, Some(&resource)).unwrap(), false);
    }

    #[test]
    fn test_employee_reads_own_roles() {
        let acl = ApplicationAcl::new(vec![Role::Employee], UserId(1));
        let s = ScopeChecker::default();

        let resource = UserRole {
            id: RoleId::new(),
            user_id: UserId(1),
            name: Role::Employee,
            data: None,
        };

        assert_eq!(acl.allows(Resource::UserRoles, Action::Read, &s, Some(&resource)).unwrap(), true);
    }
}
