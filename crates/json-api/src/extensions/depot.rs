//! Depot helper extensions.

use std::any::Any;

use salvo::prelude::{Depot, StatusError};
use storefront_app::auth::Principal;

/// Helpers for mapping depot extraction failures to HTTP errors.
pub(crate) trait DepotExt {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError>;

    fn insert_principal(&mut self, principal: Principal);

    /// The authenticated caller, or 401 when the auth hoop did not run.
    fn principal_or_401(&self) -> Result<Principal, StatusError>;

    /// The authenticated caller if they are an admin, 403 otherwise.
    fn admin_or_403(&self) -> Result<Principal, StatusError>;
}

impl DepotExt for Depot {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError> {
        self.obtain::<T>()
            .map_err(|_ignored| StatusError::internal_server_error())
    }

    fn insert_principal(&mut self, principal: Principal) {
        self.inject(principal);
    }

    fn principal_or_401(&self) -> Result<Principal, StatusError> {
        self.obtain::<Principal>()
            .copied()
            .map_err(|_ignored| StatusError::unauthorized())
    }

    fn admin_or_403(&self) -> Result<Principal, StatusError> {
        let principal = self.principal_or_401()?;

        if principal.is_admin() {
            Ok(principal)
        } else {
            Err(StatusError::forbidden().brief("Admin access required"))
        }
    }
}
