use paperstock_core::MemberId;

/// Acting member for a request.
///
/// Inserted by the actor middleware and present for every stock route.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    member_id: MemberId,
}

impl ActorContext {
    pub fn new(member_id: MemberId) -> Self {
        Self { member_id }
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }
}
