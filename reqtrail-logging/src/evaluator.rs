//! Per-request logging decisions.
//!
//! Pure functions over a [`Policy`] snapshot: whether to log at all, and
//! which optional parts a logged request carries.

use reqtrail_core::context::{RequestContext, RequestPayload, ResponsePayload};
use reqtrail_core::policy::{Inclusion, Policy};

/// The payload a decision is made against: the explicit one, else the one the
/// host bound to the context.
pub fn effective_payload<'a>(
    ctx: &'a RequestContext,
    payload: Option<&'a RequestPayload>,
) -> Option<&'a RequestPayload> {
    payload.or(ctx.payload.as_ref())
}

/// Whether a request is logged at all.
///
/// Every clause must pass. Cheap checks run first; the order does not change
/// the outcome.
pub fn should_log(
    ctx: Option<&RequestContext>,
    payload: Option<&RequestPayload>,
    policy: &Policy,
) -> bool {
    let Some(ctx) = ctx else {
        return false;
    };

    if let Some(skip) = &policy.skip {
        if skip(ctx) {
            return false;
        }
    }

    let payload = effective_payload(ctx, payload);

    if policy.limit_to_service_requests && payload.is_none() {
        return false;
    }

    // Missing roles are a silent skip, not an authorization failure.
    if !policy.required_roles.is_empty() && !policy.roles_satisfied(&ctx.roles()) {
        return false;
    }

    if policy.limit_to_service_requests && !policy.excluded_kinds.is_empty() {
        if let Some(p) = payload {
            if policy.excludes(&p.kind) {
                return false;
            }
        }
    }

    true
}

/// Which optional parts to record for a request that is being logged.
pub fn fields_to_include(
    payload: Option<&RequestPayload>,
    response: Option<&ResponsePayload>,
    policy: &Policy,
) -> Inclusion {
    let body_hidden = payload.is_some_and(|p| policy.hides_body_for(&p.kind));
    let body = policy.enable_request_body_tracking && !body_hidden;

    Inclusion {
        body,
        form: body,
        session: policy.enable_session_tracking,
        response: policy.enable_response_tracking,
        error: policy.enable_error_tracking && response.is_some_and(ResponsePayload::is_failure),
        custom: policy.properties_hook.is_some(),
    }
}
