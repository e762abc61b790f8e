use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};

use recruit_core::{
    config::Config,
    domain::ChatId,
    messaging::port::MessagingPort,
    ports::UnitOfWork,
    services::{
        ApplicationAdminTakeService, ApplicationAnswerService, ApplicationDecisionService,
        ApplicationFormattingService, ApplicationStartService, InviteRevocationService,
        UserAccountService,
    },
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub services: Arc<Services>,
    pub chat_locks: Arc<ChatLocks>,
}

/// Core services sharing one unit of work.
pub struct Services {
    pub accounts: UserAccountService,
    pub start: ApplicationStartService,
    pub answers: ApplicationAnswerService,
    pub take: ApplicationAdminTakeService,
    pub decision: ApplicationDecisionService,
    pub formatting: ApplicationFormattingService,
    pub invites: InviteRevocationService,
}

impl Services {
    pub fn new(
        cfg: &Config,
        uow: Arc<dyn UnitOfWork>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            accounts: UserAccountService::new(uow.clone()),
            start: ApplicationStartService::new(uow.clone()).with_cooldown(cfg.reapply_cooldown),
            answers: ApplicationAnswerService::new(uow.clone()),
            take: ApplicationAdminTakeService::new(uow.clone()),
            decision: ApplicationDecisionService::new(uow.clone()),
            formatting: ApplicationFormattingService::new(uow.clone()),
            invites: InviteRevocationService::new(uow, messenger, ChatId(cfg.clan_chat_id)),
        }
    }
}

/// Serializes updates per chat so answers land in the order they were sent.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Arc<Config>, uow: Arc<dyn UnitOfWork>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(bot = %me.username(), "recruit bot started"),
        Err(e) => tracing::warn!(error = %e, "get_me failed"),
    }
    tracing::info!(
        admins = cfg.admin_ids.len(),
        admin_chat = cfg.admin_chat_id,
        clan_chat = cfg.clan_chat_id,
        cooldown_days = cfg.reapply_cooldown.num_days(),
        "configuration loaded"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let services = Arc::new(Services::new(&cfg, uow, messenger.clone()));

    let state = Arc::new(AppState {
        cfg,
        messenger,
        services,
        chat_locks: Arc::new(ChatLocks::default()),
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chat_locks_serialize_one_chat_only() {
        let locks = ChatLocks::default();
        let held = locks.lock_chat(1).await;

        // Another chat is not blocked.
        let _other = locks.lock_chat(2).await;

        let waiting =
            tokio::time::timeout(std::time::Duration::from_millis(20), locks.lock_chat(1)).await;
        assert!(waiting.is_err());

        drop(held);
        let _again = locks.lock_chat(1).await;
    }
}
