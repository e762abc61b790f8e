use serde::{Deserialize, Serialize};

use super::{ApplicationId, ClaimId, UserId};

/// An admin's exclusive hold on one application under review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProcessingApplication {
    pub id: ClaimId,
    pub admin_id: UserId,
    pub application_id: ApplicationId,
}
