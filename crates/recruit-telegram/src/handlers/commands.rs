use teloxide::{prelude::*, types::Message};

use recruit_core::{
    domain::{Application, ApplicationId, ChatId, NewUser, UserId},
    formatting::escape_markdown,
    security::is_admin,
    Result,
};

use super::{answers::first_prompt, replies, reply, reply_markdown};
use crate::router::AppState;

const GREETING: &str = "Greetings!\nTo join the clan you need to fill in an application. \
Be ready to answer 5 questions!";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

#[derive(Debug, PartialEq, Eq)]
enum AdminCommand {
    Take(ApplicationId),
    Accept(ApplicationId),
    Reject {
        id: ApplicationId,
        reason: Option<String>,
    },
    Ban(UserId),
    Unban(UserId),
    Show(ApplicationId),
}

/// `None` for commands that are not admin commands; `Some(Err(usage))` on bad arguments.
fn parse_admin_command(
    cmd: &str,
    args: &str,
) -> Option<std::result::Result<AdminCommand, String>> {
    let mut parts = args.splitn(2, char::is_whitespace);
    let id = parts.next().unwrap_or("").trim().parse::<i64>().ok();
    let rest = parts.next().map(str::trim).filter(|r| !r.is_empty());

    let usage = match cmd {
        "take" => "/take <application_id>",
        "accept" => "/accept <application_id>",
        "reject" => "/reject <application_id> [reason]",
        "ban" => "/ban <user_id>",
        "unban" => "/unban <user_id>",
        "application" => "/application <application_id>",
        _ => return None,
    };
    let Some(id) = id else {
        return Some(Err(format!("Usage: {usage}")));
    };

    let command = match cmd {
        "take" => AdminCommand::Take(ApplicationId(id)),
        "accept" => AdminCommand::Accept(ApplicationId(id)),
        "reject" => AdminCommand::Reject {
            id: ApplicationId(id),
            reason: rest.map(str::to_string),
        },
        "ban" => AdminCommand::Ban(UserId(id)),
        "unban" => AdminCommand::Unban(UserId(id)),
        _ => AdminCommand::Show(ApplicationId(id)),
    };
    Some(Ok(command))
}

pub async fn handle_command(msg: &Message, text: &str, state: &AppState) -> ResponseResult<()> {
    let (cmd, args) = parse_command(text);
    let chat_id = ChatId(msg.chat.id.0);
    let user_id = msg.from().map(|u| UserId(u.id.0 as i64));

    if cmd == "start" {
        start(msg, state).await;
        return Ok(());
    }

    let Some(parsed) = parse_admin_command(&cmd, &args) else {
        tracing::debug!(command = %cmd, "ignoring unknown command");
        return Ok(());
    };

    let Some(admin_id) = user_id.filter(|_| is_admin(user_id, &state.cfg.admin_ids)) else {
        tracing::warn!(command = %cmd, user = ?user_id.map(|u| u.0), "admin command denied");
        reply(state, chat_id, "This command is available to admins only.").await;
        return Ok(());
    };

    match parsed {
        Ok(command) => run_admin_command(state, chat_id, admin_id, command).await,
        Err(usage) => reply(state, chat_id, &usage).await,
    }
    Ok(())
}

async fn start(msg: &Message, state: &AppState) {
    let chat_id = ChatId(msg.chat.id.0);
    if !msg.chat.is_private() {
        reply(
            state,
            chat_id,
            "This command can only be used in a private chat with the bot.",
        )
        .await;
        return;
    }
    let Some(user) = msg.from() else {
        return;
    };
    let profile = NewUser {
        id: UserId(user.id.0 as i64),
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
    };

    match register_and_start(state, profile).await {
        Ok(application) => {
            tracing::info!(
                user = application.user_id.0,
                application = application.id.0,
                "applicant starts filling in the form"
            );
            reply(state, chat_id, GREETING).await;
            reply(state, chat_id, first_prompt()).await;
        }
        Err(e) => {
            let text = replies::start_error(&e, &state.cfg.manager_contact);
            reply(state, chat_id, &text).await;
        }
    }
}

async fn register_and_start(state: &AppState, profile: NewUser) -> Result<Application> {
    let user = state.services.accounts.ensure_exists(profile).await?;
    state.services.start.start(user.id).await
}

async fn run_admin_command(
    state: &AppState,
    chat_id: ChatId,
    admin_id: UserId,
    command: AdminCommand,
) {
    tracing::info!(admin = admin_id.0, command = ?command, "admin command");
    let outcome = match command {
        AdminCommand::Take(id) => take(state, chat_id, admin_id, id).await,
        AdminCommand::Accept(id) => accept(state, chat_id, admin_id, id).await,
        AdminCommand::Reject { id, reason } => reject(state, chat_id, admin_id, id, reason).await,
        AdminCommand::Ban(user_id) => set_banned(state, chat_id, user_id, true).await,
        AdminCommand::Unban(user_id) => set_banned(state, chat_id, user_id, false).await,
        AdminCommand::Show(id) => show(state, chat_id, id).await,
    };
    if let Err(e) = outcome {
        reply(state, chat_id, &replies::admin_error(&e)).await;
    }
}

async fn take(
    state: &AppState,
    chat_id: ChatId,
    admin_id: UserId,
    id: ApplicationId,
) -> Result<()> {
    state.services.take.take(admin_id, id).await?;
    let report = state.services.formatting.format(id).await?;
    let hint = format!("Reply with /accept {id} or /reject {id} [reason].");
    reply_markdown(state, chat_id, &format!("{report}\n{}", escape_markdown(&hint))).await;
    Ok(())
}

async fn accept(
    state: &AppState,
    chat_id: ChatId,
    admin_id: UserId,
    id: ApplicationId,
) -> Result<()> {
    let clan_chat = ChatId(state.cfg.clan_chat_id);
    let link = state.messenger.create_invite_link(clan_chat).await?;

    let application = match state
        .services
        .decision
        .accept(admin_id, id, Some(link.clone()))
        .await
    {
        Ok(application) => application,
        Err(e) => {
            if let Err(revoke) = state.messenger.revoke_invite_link(clan_chat, &link).await {
                tracing::warn!(error = %revoke, "failed to revoke unused invite link");
            }
            return Err(e);
        }
    };

    let welcome = format!(
        "Congratulations, your application has been accepted!\nJoin the clan chat: {link}"
    );
    reply(state, application.user_id.into(), &welcome).await;
    reply(state, chat_id, &format!("Application №{id} accepted.")).await;
    Ok(())
}

async fn reject(
    state: &AppState,
    chat_id: ChatId,
    admin_id: UserId,
    id: ApplicationId,
    reason: Option<String>,
) -> Result<()> {
    let application = state.services.decision.reject(admin_id, id).await?;

    let mut notice = "Unfortunately, your application has been rejected.".to_string();
    if let Some(reason) = reason {
        notice.push_str(&format!("\nReason: {reason}"));
    }
    reply(state, application.user_id.into(), &notice).await;
    reply(state, chat_id, &format!("Application №{id} rejected.")).await;
    Ok(())
}

async fn set_banned(
    state: &AppState,
    chat_id: ChatId,
    user_id: UserId,
    banned: bool,
) -> Result<()> {
    let accounts = &state.services.accounts;
    let user = if banned {
        accounts.ban(user_id).await?
    } else {
        accounts.unban(user_id).await?
    };
    let verb = if user.is_banned { "banned" } else { "unbanned" };
    reply(state, chat_id, &format!("User {} {verb}.", user.id.0)).await;
    Ok(())
}

async fn show(state: &AppState, chat_id: ChatId, id: ApplicationId) -> Result<()> {
    let report = state.services.formatting.format(id).await?;
    reply_markdown(state, chat_id, &report).await;
    Ok(())
}
