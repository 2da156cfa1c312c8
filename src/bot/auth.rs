use crate::bot::event::ActorId;

/// Single-administrator authorization: the actor id must equal the
/// configured admin id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminGuard {
    admin: ActorId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("actor {actor} is not the administrator")]
pub struct Unauthorized {
    pub actor: ActorId,
}

impl AdminGuard {
    pub fn new(admin: ActorId) -> Self {
        Self { admin }
    }

    pub fn admin(&self) -> ActorId {
        self.admin
    }

    pub fn check(&self, actor: ActorId) -> Result<(), Unauthorized> {
        if actor == self.admin {
            Ok(())
        } else {
            Err(Unauthorized { actor })
        }
    }
}
