use bitflow_governance::Actor;

/// Authenticated caller for a request, inserted by the auth middleware.
///
/// Immutable for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: Actor,
}

impl ActorContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }
}
