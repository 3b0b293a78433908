//! Capability-based route authorization.
//!
//! Each protected route carries a [`Capability`] naming the resource, the
//! action and the roles allowed to perform it. [`guard`] resolves the caller
//! and rejects the request before the handler runs when the role is not in
//! the set. Ownership rules (a sponsor owning a sponsorship, a manager running
//! an orphanage) are checked by the services, not here.

use axum::{
    Extension,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use super::CurrentUser;
use crate::{entities::sea_orm_active_enums::Role, error::ApiError, router::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Orphan,
    Orphanage,
    Donation,
    Sponsorship,
    Campaign,
    Delivery,
    Volunteer,
    Ledger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Verify,
    Apply,
    Review,
    Repair,
}

#[derive(Debug, Clone, Copy)]
pub struct Capability {
    pub resource: Resource,
    pub action: Action,
    pub roles: &'static [Role],
}

impl Capability {
    pub const fn new(resource: Resource, action: Action, roles: &'static [Role]) -> Self {
        Self {
            resource,
            action,
            roles,
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

const ADMIN: &[Role] = &[Role::Admin];
const STAFF: &[Role] = &[Role::Admin, Role::OrphanageManager];
const APPLICANTS: &[Role] = &[Role::Volunteer, Role::Donor];

pub const ORPHAN_WRITE: Capability = Capability::new(Resource::Orphan, Action::Update, STAFF);
pub const ORPHAN_CREATE: Capability = Capability::new(Resource::Orphan, Action::Create, STAFF);
pub const ORPHAN_DELETE: Capability = Capability::new(Resource::Orphan, Action::Delete, ADMIN);
pub const ORPHANAGE_VERIFY: Capability =
    Capability::new(Resource::Orphanage, Action::Verify, ADMIN);
pub const DONATION_REVIEW: Capability =
    Capability::new(Resource::Donation, Action::Review, ADMIN);
pub const DONATION_STATS: Capability = Capability::new(Resource::Donation, Action::Read, ADMIN);
pub const SPONSORSHIP_STATS: Capability =
    Capability::new(Resource::Sponsorship, Action::Read, ADMIN);
pub const CAMPAIGN_CREATE: Capability =
    Capability::new(Resource::Campaign, Action::Create, STAFF);
pub const CAMPAIGN_STATS: Capability = Capability::new(Resource::Campaign, Action::Read, ADMIN);
pub const DELIVERY_WRITE: Capability = Capability::new(Resource::Delivery, Action::Update, ADMIN);
pub const DELIVERY_CREATE: Capability =
    Capability::new(Resource::Delivery, Action::Create, ADMIN);
pub const OPPORTUNITY_WRITE: Capability =
    Capability::new(Resource::Volunteer, Action::Update, STAFF);
pub const OPPORTUNITY_APPLY: Capability =
    Capability::new(Resource::Volunteer, Action::Apply, APPLICANTS);
pub const APPLICATION_REVIEW: Capability =
    Capability::new(Resource::Volunteer, Action::Review, STAFF);
pub const VOLUNTEER_STATS: Capability = Capability::new(Resource::Volunteer, Action::Read, ADMIN);
pub const LEDGER_AUDIT: Capability = Capability::new(Resource::Ledger, Action::Read, ADMIN);
pub const LEDGER_REPAIR: Capability = Capability::new(Resource::Ledger, Action::Repair, ADMIN);

/// Wraps `route` so that only callers holding `cap` reach the handler.
pub fn restrict(
    route: MethodRouter<AppState>,
    state: &AppState,
    cap: Capability,
) -> MethodRouter<AppState> {
    route
        .route_layer(middleware::from_fn_with_state(state.clone(), guard))
        .route_layer(Extension(cap))
}

pub async fn guard(
    Extension(cap): Extension<Capability>,
    user: CurrentUser,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !cap.permits(user.role()) {
        tracing::debug!(
            user_id = user.id(),
            resource = ?cap.resource,
            action = ?cap.action,
            "capability denied"
        );
        return Err(ApiError::Forbidden(format!(
            "User role {} is not authorized to access this route",
            role_name(user.role())
        )));
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Donor => "donor",
        Role::Volunteer => "volunteer",
        Role::OrphanageManager => "orphanage_manager",
        Role::Admin => "admin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_capabilities_exclude_donors() {
        assert!(CAMPAIGN_CREATE.permits(Role::Admin));
        assert!(CAMPAIGN_CREATE.permits(Role::OrphanageManager));
        assert!(!CAMPAIGN_CREATE.permits(Role::Donor));
        assert!(!CAMPAIGN_CREATE.permits(Role::Volunteer));
    }

    #[test]
    fn admin_only_capabilities() {
        for cap in [DONATION_REVIEW, ORPHANAGE_VERIFY, LEDGER_REPAIR, ORPHAN_DELETE] {
            assert!(cap.permits(Role::Admin));
            assert!(!cap.permits(Role::OrphanageManager));
        }
    }

    #[test]
    fn managers_cannot_apply_to_volunteer() {
        assert!(OPPORTUNITY_APPLY.permits(Role::Volunteer));
        assert!(OPPORTUNITY_APPLY.permits(Role::Donor));
        assert!(!OPPORTUNITY_APPLY.permits(Role::OrphanageManager));
    }
}
