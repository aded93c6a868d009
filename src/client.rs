use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use url::Url;

use crate::auth::{AuthProvider, AuthUser};
use crate::common::{Chat, ChatCommand, ChatEvent, ChatId, Message, Notice, User};
use crate::error::{ChatError, ChatResult};
use crate::links::{DeepLink, group_link, invite_link};
use crate::session::{
    Composer, InviteOutcome, InviteReconciler, SessionState, chat_header, create_group,
    project_chat_list, project_messages,
};
use crate::storage::{ChatStore, StoreError, Subscription};

pub struct ClientOptions {
    /// Origin and path invite links are built on.
    pub invite_base: Url,
    /// How often the store is asked for changes made by other processes.
    pub poll_interval: Duration,
    /// Deep link the app was launched with.
    pub launch_link: Option<DeepLink>,
}

/// The client task. Owns the session and every subscription; the UI only
/// sees it through the command and event channels.
pub struct ChatClient {
    event_sender: mpsc::Sender<ChatEvent>,
    command_receiver: mpsc::Receiver<ChatCommand>,
    store: Arc<dyn ChatStore>,
    auth: Arc<dyn AuthProvider>,
    invite_base: Url,
    poll_interval: Duration,
    link: Option<DeepLink>,
    session: Option<SessionState>,
    chat_list: Option<Subscription<Vec<Chat>>>,
    chats: Vec<Chat>,
}

impl ChatClient {
    pub fn new(
        event_sender: mpsc::Sender<ChatEvent>,
        command_receiver: mpsc::Receiver<ChatCommand>,
        store: Arc<dyn ChatStore>,
        auth: Arc<dyn AuthProvider>,
        options: ClientOptions,
    ) -> Self {
        Self {
            event_sender,
            command_receiver,
            store,
            auth,
            invite_base: options.invite_base,
            poll_interval: options.poll_interval,
            link: options.launch_link,
            session: None,
            chat_list: None,
            chats: Vec::new(),
        }
    }

    /// Runs until the command channel closes.
    pub async fn run(mut self) {
        let mut auth_state = self.auth.watch();
        let restored = auth_state.borrow_and_update().clone();
        match restored {
            Some(user) => self.on_auth_state(Some(user)).await,
            None => {
                let pending = self.pending_link();
                self.emit(ChatEvent::PendingLink(pending)).await;
            }
        }

        let mut poll = time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut auth_alive = true;
        log::info!("Chat client event loop started");

        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    if let Some(command) = command {
                        self.handle_command(command).await;
                    } else {
                        break;
                    }
                }
                changed = auth_state.changed(), if auth_alive => {
                    if changed.is_err() {
                        log::warn!("Auth provider went away");
                        auth_alive = false;
                        continue;
                    }
                    let user = auth_state.borrow_and_update().clone();
                    self.on_auth_state(user).await;
                }
                chats = next_chat_list(&mut self.chat_list) => {
                    self.on_chats(chats).await;
                }
                (chat_id, messages) = next_messages(&mut self.session) => {
                    self.on_messages(chat_id, messages).await;
                }
                _ = poll.tick() => {
                    self.poll_store().await;
                }
            }
        }

        self.end_session();
        log::info!("Chat client event loop stopped");
    }

    async fn handle_command(&mut self, command: ChatCommand) {
        let result = match command {
            ChatCommand::SignIn { display_name } => self.sign_in(&display_name).await,
            ChatCommand::SignOut => self.sign_out().await,
            ChatCommand::SelectChat(chat_id) => self.select_chat(chat_id).await,
            ChatCommand::CloseChat => {
                self.close_chat().await;
                Ok(())
            }
            ChatCommand::SendMessage { chat_id, text } => self.send_message(chat_id, text).await,
            ChatCommand::CreateGroup { name } => self.create_group(&name).await,
            ChatCommand::CopyInviteLink => self.copy_invite_link().await,
            ChatCommand::CopyGroupLink(chat_id) => self.copy_group_link(&chat_id).await,
            ChatCommand::OpenLink(raw) => self.open_link(&raw).await,
            ChatCommand::RetryLink => {
                self.process_link().await;
                Ok(())
            }
        };

        if let Err(err) = result {
            self.report(err).await;
        }
    }

    async fn emit(&self, event: ChatEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::warn!("Failed to notify UI: {err}");
        }
    }

    async fn report(&self, err: ChatError) {
        log::warn!("{err}");
        let notice = Notice::error(err.to_string());
        if let ChatError::MessageNotSent { chat_id, text, .. }
        | ChatError::ChatNotOpen { chat_id, text } = err
        {
            self.emit(ChatEvent::DraftRestored { chat_id, text }).await;
        }
        self.emit(ChatEvent::Notice(notice)).await;
    }

    fn session(&self) -> ChatResult<&SessionState> {
        self.session.as_ref().ok_or(ChatError::NotSignedIn)
    }

    fn pending_link(&self) -> Option<String> {
        self.link
            .as_ref()
            .filter(|link| link.has_token())
            .map(|link| link.as_str().to_string())
    }

    async fn on_auth_state(&mut self, user: Option<AuthUser>) {
        let Some(user) = user else {
            if self.session.is_some() {
                self.end_session();
                self.emit(ChatEvent::SignedOut).await;
            }
            return;
        };

        let display_name = user.display_name_or_default().to_string();
        if let Some(session) = self.session.as_mut() {
            if session.user().uid == user.uid {
                if session.user().display_name != display_name {
                    session.set_display_name(&display_name);
                    self.emit(ChatEvent::SignedIn {
                        uid: user.uid,
                        display_name,
                    })
                    .await;
                }
                return;
            }
            log::info!("Auth user changed; replacing session");
            self.end_session();
        }

        self.start_session(User {
            uid: user.uid,
            display_name,
        })
        .await;
    }

    async fn start_session(&mut self, user: User) {
        log::info!("Session started for {}", user.uid);
        match self.store.subscribe_chats(&user.uid).await {
            Ok(subscription) => self.chat_list = Some(subscription),
            Err(err) => {
                log::error!("Failed to subscribe to chat list: {err}");
                self.emit(ChatEvent::Notice(Notice::error(format!(
                    "Chat list unavailable: {err}"
                ))))
                .await;
            }
        }

        self.emit(ChatEvent::SignedIn {
            uid: user.uid.clone(),
            display_name: user.display_name.clone(),
        })
        .await;
        self.session = Some(SessionState::new(user));
        self.process_link().await;
    }

    fn end_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close_chat();
            log::info!("Session ended for {}", session.user().uid);
        }
        if let Some(chat_list) = self.chat_list.take() {
            chat_list.cancel();
        }
        self.chats.clear();
    }

    async fn sign_in(&mut self, display_name: &str) -> ChatResult<()> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Ok(());
        }

        self.auth.sign_in_anonymously().await?;
        let user = self.auth.update_profile(display_name).await?;
        self.store
            .upsert_user(&User {
                uid: user.uid.clone(),
                display_name: display_name.to_string(),
            })
            .await?;
        self.on_auth_state(Some(user)).await;
        Ok(())
    }

    async fn sign_out(&mut self) -> ChatResult<()> {
        self.auth.sign_out().await?;
        self.on_auth_state(None).await;
        Ok(())
    }

    /// Reconciles the current deep link, if any, for the signed-in user.
    /// The link survives a failure so it can be retried.
    async fn process_link(&mut self) {
        let Some(me) = self.session.as_ref().map(|session| session.user().clone()) else {
            return;
        };
        let Some(link) = self.link.as_mut() else {
            return;
        };

        let result = InviteReconciler::new(self.store.as_ref())
            .reconcile(&me, link)
            .await;
        match result {
            Ok(outcome) => {
                self.emit(ChatEvent::PendingLink(None)).await;
                if let InviteOutcome::Opened { chat_id, .. }
                | InviteOutcome::Joined { chat_id, .. } = outcome
                {
                    if let Err(err) = self.select_chat(chat_id).await {
                        self.report(err).await;
                    }
                }
            }
            Err(err) => {
                let pending = self.pending_link();
                self.report(err).await;
                self.emit(ChatEvent::PendingLink(pending)).await;
            }
        }
    }

    async fn open_link(&mut self, raw: &str) -> ChatResult<()> {
        let link = DeepLink::parse(raw)?;
        log::info!("Opening link {}", link.as_str());
        self.link = Some(link);
        if self.session.is_some() {
            self.process_link().await;
        } else {
            let pending = self.pending_link();
            self.emit(ChatEvent::PendingLink(pending)).await;
        }
        Ok(())
    }

    async fn select_chat(&mut self, chat_id: ChatId) -> ChatResult<()> {
        let cached = self.chats.iter().find(|chat| chat.id == chat_id).cloned();
        let chat = match cached {
            Some(chat) => chat,
            None => self
                .store
                .get_chat(&chat_id)
                .await?
                .ok_or_else(|| StoreError::not_found("chat", chat_id.as_str()))?,
        };

        let session = self.session.as_mut().ok_or(ChatError::NotSignedIn)?;
        if let Err(err) = session.select_chat(self.store.as_ref(), &chat_id).await {
            self.emit(ChatEvent::ChatClosed).await;
            self.publish_chat_list().await;
            return Err(err.into());
        }
        let header = chat_header(&chat, &session.user().uid);

        self.emit(ChatEvent::ChatOpened(header)).await;
        self.publish_chat_list().await;
        Ok(())
    }

    async fn close_chat(&mut self) {
        let closed = self.session.as_mut().and_then(SessionState::close_chat);
        if let Some(chat_id) = closed {
            log::info!("Closed chat {chat_id}");
            self.emit(ChatEvent::ChatClosed).await;
            self.publish_chat_list().await;
        }
    }

    async fn send_message(&mut self, chat_id: ChatId, text: String) -> ChatResult<()> {
        let session = self.session()?;
        if session.active_chat() != Some(&chat_id) {
            return Err(ChatError::ChatNotOpen { chat_id, text });
        }
        Composer::new(self.store.as_ref())
            .send(session.user(), &chat_id, &text)
            .await?;
        Ok(())
    }

    async fn create_group(&mut self, name: &str) -> ChatResult<()> {
        if name.trim().is_empty() {
            return Ok(());
        }
        let session = self.session()?;
        create_group(self.store.as_ref(), session.user(), name).await?;
        self.emit(ChatEvent::Notice(Notice::info(format!(
            "Group \"{}\" created",
            name.trim()
        ))))
        .await;
        Ok(())
    }

    async fn copy_invite_link(&self) -> ChatResult<()> {
        let session = self.session()?;
        let link = invite_link(&self.invite_base, &session.user().uid);
        self.emit(ChatEvent::LinkReady(link.to_string())).await;
        Ok(())
    }

    async fn copy_group_link(&self, chat_id: &ChatId) -> ChatResult<()> {
        self.session()?;
        let link = group_link(&self.invite_base, chat_id);
        self.emit(ChatEvent::LinkReady(link.to_string())).await;
        Ok(())
    }

    async fn publish_chat_list(&self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let entries = project_chat_list(&self.chats, &session.user().uid, session.active_chat());
        self.emit(ChatEvent::ChatsUpdated(entries)).await;
    }

    async fn on_chats(&mut self, chats: Option<Vec<Chat>>) {
        let Some(chats) = chats else {
            log::warn!("Chat list subscription closed");
            self.chat_list = None;
            return;
        };
        self.chats = chats;
        self.publish_chat_list().await;

        // Keep the header in step with name and summary changes.
        let header = self.session.as_ref().and_then(|session| {
            let active = session.active_chat()?;
            let chat = self.chats.iter().find(|chat| &chat.id == active)?;
            Some(chat_header(chat, &session.user().uid))
        });
        if let Some(header) = header {
            self.emit(ChatEvent::ChatOpened(header)).await;
        }
    }

    async fn on_messages(&mut self, chat_id: ChatId, messages: Vec<Message>) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.active_chat() != Some(&chat_id) {
            return;
        }
        let messages = project_messages(&messages, &chat_id, &session.user().uid);
        self.emit(ChatEvent::MessagesUpdated { chat_id, messages })
            .await;
    }

    async fn poll_store(&self) {
        match self.store.poll_changes().await {
            Ok(true) => log::debug!("Picked up external store changes"),
            Ok(false) => {}
            Err(err) => log::warn!("Failed to poll store: {err}"),
        }
    }
}

async fn next_chat_list(
    subscription: &mut Option<Subscription<Vec<Chat>>>,
) -> Option<Vec<Chat>> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => future::pending().await,
    }
}

async fn next_messages(session: &mut Option<SessionState>) -> (ChatId, Vec<Message>) {
    match session {
        Some(session) => session.next_messages().await,
        None => future::pending().await,
    }
}
