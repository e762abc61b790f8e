//! User-facing texts for domain errors.

use recruit_core::errors::Error;

const COOLDOWN_FORMAT: &str = "%d.%m.%Y %H:%M %Z";
const BANNED: &str = "You have been banned. Filling in an application is not possible.";

/// Reply to an applicant whose `/start` failed.
pub fn start_error(err: &Error, manager_contact: &str) -> String {
    match err {
        Error::UserIsBanned => BANNED.to_string(),
        Error::ApplicationAlreadyAccepted => {
            "Your application has already been accepted.".to_string()
        }
        Error::ApplicationAtWaitingStatus => "Your application is under review.".to_string(),
        Error::ApplicationCoolDown { eligible_at } => format!(
            "A new application can be submitted only once a month.\nYou can apply again on {}",
            eligible_at.format(COOLDOWN_FORMAT)
        ),
        _ => something_went_wrong(manager_contact),
    }
}

/// Reply to an applicant whose answer could not be recorded.
pub fn answer_error(err: &Error, manager_contact: &str) -> String {
    match err {
        Error::ApplicationDoesNotExist | Error::ApplicationWrongStatus { .. } => {
            "You have no application in progress. Send /start to fill one in.".to_string()
        }
        Error::EmptyAnswer => "The answer cannot be empty.".to_string(),
        Error::AnswerTooLong { max } => {
            format!("The answer is too long. Please keep it under {max} characters.")
        }
        Error::UserIsBanned => BANNED.to_string(),
        _ => something_went_wrong(manager_contact),
    }
}

/// Reply to an admin whose command failed.
pub fn admin_error(err: &Error) -> String {
    match err {
        Error::ApplicationDoesNotExist => "Application not found.".to_string(),
        Error::ApplicationWrongStatus { status } => {
            format!("The application is {status}; this action is not possible.")
        }
        Error::AdminAlreadyProcessedApplication => {
            "You are already reviewing an application. Accept or reject it first.".to_string()
        }
        Error::ApplicationClaimedByAnotherAdmin => {
            "This application is being reviewed by another admin.".to_string()
        }
        Error::UserNotFound(user) => format!("User {} not found.", user.0),
        other => format!("Command failed: {other}"),
    }
}

fn something_went_wrong(manager_contact: &str) -> String {
    format!("Something went wrong...\nContact the manager {manager_contact} to resolve this.")
}
