//! Generic access control plumbing shared by all repos. `SystemACL` is
//! used for calls the service itself originates, `UnauthorizedACL` for
//! callers without an established identity.

use models::UserId;

pub trait Acl<Resource, Action, Scope, Error, T> {
    /// Tells if a user with the given roles can do `action` on `resource`
    fn allows(
        &self,
        resource: Resource,
        action: Action,
        scope_checker: &CheckScope<Scope, T>,
        obj: Option<&T>,
    ) -> Result<bool, Error>;
}

/// Checks if an object is in the scope of the acting user
pub trait CheckScope<Scope, T> {
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&T>) -> bool;
}

#[derive(Clone, Debug, Default)]
pub struct SystemACL;

impl<Resource, Action, Scope, Error, T> Acl<Resource, Action, Scope, Error, T> for SystemACL {
    fn allows(
        &self,
        _resource: Resource,
        _action: Action,
        _scope_checker: &CheckScope<Scope, T>,
        _obj: Option<&T>,
    ) -> Result<bool, Error> {
        Ok(true)
    }
}

#[derive(Clone, Debug, Default)]
pub struct UnauthorizedACL;

impl<Resource, Action, Scope, Error, T> Acl<Resource, Action, Scope, Error, T> for UnauthorizedACL {
    fn allows(
        &self,
        _resource: Resource,
        _action: Action,
        _scope_checker: &CheckScope<Scope, T>,
        _obj: Option<&T>,
    ) -> Result<bool, Error> {
        Ok(false)
    }
}
