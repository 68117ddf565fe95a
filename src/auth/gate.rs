//! Per-route access gate
//!
//! Every route group carries a [`GateChain`]: an ordered list of stages run
//! against the request headers before the handler. A stage either passes an
//! updated [`GateContext`] to the next one or rejects the request.
//!
//! ```text
//! public()         -> []
//! authenticated()  -> [Authenticate]
//! role(r)          -> [Authenticate, Authorize(r)]
//! ```
//!
//! Chains can only be built through these constructors, so an Authorize
//! stage never runs without an Authenticate stage before it.

use crate::auth::error::AuthError;
use crate::auth::roles::{self, Role};
use crate::auth::tokens::{Identity, TokenCodec};
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

const BEARER_SCHEME: &str = "bearer";

/// What the gate knows about the caller so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateContext {
    Anonymous,
    Authenticated(Identity),
}

impl GateContext {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            GateContext::Anonymous => None,
            GateContext::Authenticated(identity) => Some(identity),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Authenticate,
    Authorize(Role),
}

impl Stage {
    fn apply(
        &self,
        headers: &HeaderMap,
        ctx: GateContext,
        codec: &TokenCodec,
        now: DateTime<Utc>,
    ) -> Result<GateContext, AuthError> {
        match self {
            Stage::Authenticate => {
                let token = extract_bearer(headers)?;
                let identity = codec.parse(token, now).map_err(|e| {
                    debug!(error = %e, "Rejected bearer token");
                    AuthError::from(e)
                })?;
                Ok(GateContext::Authenticated(identity))
            }
            Stage::Authorize(required) => {
                let identity = ctx.identity().ok_or(AuthError::Unauthenticated)?;
                if !roles::is_allowed(identity.role, *required) {
                    debug!(
                        subject = %identity.subject,
                        role = %identity.role,
                        required = %required,
                        "Role not allowed"
                    );
                    return Err(AuthError::Forbidden);
                }
                Ok(ctx)
            }
        }
    }
}

/// Ordered stages guarding one route group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateChain {
    stages: Vec<Stage>,
}

impl GateChain {
    /// No checks
    pub fn public() -> Self {
        Self { stages: Vec::new() }
    }

    /// Any valid token
    pub fn authenticated() -> Self {
        Self {
            stages: vec![Stage::Authenticate],
        }
    }

    /// A valid token carrying exactly `role`
    pub fn role(role: Role) -> Self {
        Self {
            stages: vec![Stage::Authenticate, Stage::Authorize(role)],
        }
    }

    pub fn is_public(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order, stopping at the first rejection
    pub fn run(
        &self,
        headers: &HeaderMap,
        codec: &TokenCodec,
        now: DateTime<Utc>,
    ) -> Result<GateContext, AuthError> {
        self.stages
            .iter()
            .try_fold(GateContext::Anonymous, |ctx, stage| {
                stage.apply(headers, ctx, codec, now)
            })
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The scheme is case-insensitive; anything other than exactly one header
/// holding the scheme, one space and one token is rejected.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let mut values = headers.get_all(AUTHORIZATION).iter();
    let value = match (values.next(), values.next()) {
        (Some(value), None) => value,
        _ => return Err(AuthError::Unauthenticated),
    };

    let value = value.to_str().map_err(|_| AuthError::Unauthenticated)?;
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::Unauthenticated)?;

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME)
        || token.is_empty()
        || token.contains(char::is_whitespace)
    {
        return Err(AuthError::Unauthenticated);
    }

    Ok(token)
}

/// Middleware state: the chain for one route group and the shared codec
#[derive(Debug, Clone)]
pub struct RouteGate {
    codec: Arc<TokenCodec>,
    chain: GateChain,
}

impl RouteGate {
    pub fn new(codec: Arc<TokenCodec>, chain: GateChain) -> Self {
        Self { codec, chain }
    }
}

/// axum middleware running a [`RouteGate`]; attach with
/// `route_layer(middleware::from_fn_with_state(gate, enforce))`.
///
/// On success the caller's [`Identity`] is available to handlers as
/// `Extension<Identity>`.
pub async fn enforce(
    State(gate): State<RouteGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let ctx = gate.chain.run(request.headers(), &gate.codec, Utc::now())?;

    if let GateContext::Authenticated(identity) = ctx {
        request.extensions_mut().insert(identity);
    }

    Ok(next.run(request).await)
}
