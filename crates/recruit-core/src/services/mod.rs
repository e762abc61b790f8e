//! Application services. Each public operation runs in one unit-of-work
//! transaction that is committed on success and rolled back otherwise.

mod application_admin_take;
mod application_answer;
mod application_decision;
mod application_formatting;
mod application_retrieve;
mod application_start;
mod user_accounts;

pub use application_admin_take::ApplicationAdminTakeService;
pub use application_answer::{AnswerProgress, ApplicationAnswerService};
pub use application_decision::ApplicationDecisionService;
pub use application_formatting::ApplicationFormattingService;
pub use application_retrieve::{ApplicationRetrieveService, InviteRevocationService};
pub use application_start::ApplicationStartService;
pub use user_accounts::UserAccountService;
