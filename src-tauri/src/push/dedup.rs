use crate::push::payload::DeliveryIdentity;
use std::sync::Mutex;

/// Remembers the last delivery that was routed so the same tap is never
/// handled twice, no matter which path (live tap or cold start) sees it.
///
/// Shared by reference between the tap router and the cold-start resolver.
/// The lock is only ever held for the compare-and-assign in [`claim`], never
/// across an `.await`.
///
/// [`claim`]: DedupCell::claim
#[derive(Debug, Default)]
pub struct DedupCell {
    last_handled: Mutex<Option<DeliveryIdentity>>,
}

impl DedupCell {
    pub fn new() -> Self {
        Self {
            last_handled: Mutex::new(None),
        }
    }

    /// Returns true if the caller now owns `identity` and should route it.
    /// Returns false if it was the last identity handled.
    pub fn claim(&self, identity: &DeliveryIdentity) -> bool {
        let mut slot = match self.last_handled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.as_ref() == Some(identity) {
            return false;
        }
        *slot = Some(identity.clone());
        true
    }

    pub fn last_handled(&self) -> Option<DeliveryIdentity> {
        match self.last_handled.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
