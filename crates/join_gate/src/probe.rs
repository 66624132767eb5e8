//! Lobby directory access that adapts to the deployed host build.
//!
//! Host builds differ in how the directory's unlock call looks: newer ones
//! take no arguments, older ones take an "open to public" flag. The probe
//! negotiates the shape once and binds the matching dispatch function; every
//! later call goes straight through the bound function.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::error::{DirectoryCallError, JoinGateError};

/// Unlock call shapes a host build may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockShape {
    NoArg,
    BoolArg,
}

/// The live directory service (a host singleton that may come and go).
///
/// A host build implements only the unlock shape it actually has; the other
/// one keeps the default `NotExposed` body.
pub trait DirectoryService {
    fn unlock(&self) -> Result<(), DirectoryCallError> {
        Err(DirectoryCallError::NotExposed)
    }

    fn unlock_public(&self, _open_to_public: bool) -> Result<(), DirectoryCallError> {
        Err(DirectoryCallError::NotExposed)
    }

    fn lock(&self) -> Result<(), DirectoryCallError>;
}

/// What the host build offers: its API surface and, at call time, the service.
pub trait DirectoryHost {
    /// Whether this host build exposes the given unlock shape.
    fn exposes(&self, shape: UnlockShape) -> bool;

    /// The directory service, if one exists right now.
    fn service(&self) -> Option<Rc<dyn DirectoryService>>;
}

/// Outcome of capability negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVariant {
    Unresolved,
    NoArg,
    BoolArg,
}

type UnlockFn = fn(&dyn DirectoryService, bool) -> Result<(), DirectoryCallError>;

fn unlock_no_arg(
    service: &dyn DirectoryService,
    _open_to_public: bool,
) -> Result<(), DirectoryCallError> {
    service.unlock()
}

fn unlock_bool_arg(
    service: &dyn DirectoryService,
    open_to_public: bool,
) -> Result<(), DirectoryCallError> {
    service.unlock_public(open_to_public)
}

/// Negotiation order, newest shape first.
const CANDIDATES: [(UnlockShape, ApiVariant, UnlockFn); 2] = [
    (UnlockShape::NoArg, ApiVariant::NoArg, unlock_no_arg),
    (UnlockShape::BoolArg, ApiVariant::BoolArg, unlock_bool_arg),
];

#[derive(Clone, Copy)]
struct Negotiated {
    variant: ApiVariant,
    unlock: Option<UnlockFn>,
}

fn negotiate(host: &dyn DirectoryHost) -> Negotiated {
    for (shape, variant, unlock) in CANDIDATES {
        if host.exposes(shape) {
            info!(
                target = "join_gate::probe",
                "lobby directory unlock resolved as {variant:?}"
            );
            return Negotiated {
                variant,
                unlock: Some(unlock),
            };
        }
    }
    // Cached for the rest of the process; never re-probed.
    warn!(
        target = "join_gate::probe",
        "no known lobby directory unlock shape, directory calls disabled"
    );
    Negotiated {
        variant: ApiVariant::Unresolved,
        unlock: None,
    }
}

/// Version-adaptive lobby directory port.
pub struct CapabilityProbe {
    host: Rc<dyn DirectoryHost>,
    negotiated: OnceCell<Negotiated>,
}

impl CapabilityProbe {
    pub fn new(host: Rc<dyn DirectoryHost>) -> Self {
        Self {
            host,
            negotiated: OnceCell::new(),
        }
    }

    fn negotiated(&self) -> Negotiated {
        *self.negotiated.get_or_init(|| negotiate(self.host.as_ref()))
    }

    /// Negotiate on first use, then return the cached result.
    pub fn detect_variant(&self) -> ApiVariant {
        self.negotiated().variant
    }

    fn service(&self) -> Result<Rc<dyn DirectoryService>, JoinGateError> {
        self.host.service().ok_or(JoinGateError::DirectoryUnavailable)
    }

    /// Make the session discoverable. `NoArg` builds ignore `open_to_public`.
    pub fn unlock(&self, open_to_public: bool) -> Result<ApiVariant, JoinGateError> {
        let Negotiated { variant, unlock } = self.negotiated();
        let Some(unlock) = unlock else {
            return Err(JoinGateError::ApiVariantUnresolved);
        };
        let service = self.service()?;
        unlock(service.as_ref(), open_to_public)
            .map_err(|err| JoinGateError::invocation("unlock", err))?;
        debug!(
            target = "join_gate::probe",
            "lobby unlocked via {variant:?} (open_to_public={open_to_public})"
        );
        Ok(variant)
    }

    /// Hide the session from the directory. Same shape on every host build.
    pub fn lock(&self) -> Result<(), JoinGateError> {
        let service = self.service()?;
        service
            .lock()
            .map_err(|err| JoinGateError::invocation("lock", err))?;
        debug!(target = "join_gate::probe", "lobby locked");
        Ok(())
    }
}

impl fmt::Debug for CapabilityProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityProbe")
            .field("variant", &self.negotiated.get().map(|n| n.variant))
            .finish()
    }
}
