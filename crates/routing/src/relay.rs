//! The single inbound dispatcher.
//!
//! Branches are mutually exclusive and evaluated in a fixed order: banned,
//! command, active session, name prompt, agent chatter, offline message.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    chrono::Utc,
    relaydesk_channels::{
        Button, ForwardRecord, InboundEvent, Keyboard, MessagingGateway, ProfileStore,
        ProfileUpdate, SendOptions, UserDirectory,
    },
    relaydesk_common::{Identity, MessageRef, Participant},
    relaydesk_config::RelaySettings,
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    action::Action,
    agents::AgentPool,
    command::CommandDispatcher,
    delivery, greeting,
    i18n::{self, Language, agent},
    intake::{Decision, IntakeCoordinator, IntakePhase, NameOutcome, SupportRequest},
    lanes::EventHandler,
    registry::BanRegistry,
    session::{Relayed, SessionRouter},
};

pub struct Relay {
    gateway: Arc<dyn MessagingGateway>,
    profiles: Arc<dyn ProfileStore>,
    agents: AgentPool,
    bans: Arc<BanRegistry>,
    router: Arc<SessionRouter>,
    intake: Arc<IntakeCoordinator>,
    commands: CommandDispatcher,
    settings: RelaySettings,
    default_language: Language,
    last_auto_reply: Mutex<HashMap<Identity, Instant>>,
}

impl Relay {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        profiles: Arc<dyn ProfileStore>,
        directory: Arc<dyn UserDirectory>,
        agents: AgentPool,
        settings: RelaySettings,
    ) -> Self {
        let bans = Arc::new(BanRegistry::new());
        let router = Arc::new(SessionRouter::new(Arc::clone(&gateway)));
        let intake = Arc::new(IntakeCoordinator::new(
            Arc::clone(&gateway),
            Arc::clone(&router),
            agents.clone(),
            settings.legacy_stop_keyword,
        ));
        let commands = CommandDispatcher::new(
            agents.clone(),
            Arc::clone(&bans),
            Arc::clone(&router),
            Arc::clone(&intake),
            directory,
            Arc::clone(&gateway),
        );
        let default_language =
            Language::from_code(&settings.default_language).unwrap_or_default();
        Self {
            gateway,
            profiles,
            agents,
            bans,
            router,
            intake,
            commands,
            settings,
            default_language,
            last_auto_reply: Mutex::new(HashMap::new()),
        }
    }

    pub fn bans(&self) -> &BanRegistry {
        &self.bans
    }

    pub fn router(&self) -> &SessionRouter {
        &self.router
    }

    pub fn intake(&self) -> &IntakeCoordinator {
        &self.intake
    }

    /// Process one inbound event. Failures are logged, never returned.
    pub async fn handle(&self, event: InboundEvent) {
        let from = event.sender().id;
        if let Err(err) = self.dispatch(event).await {
            if err.is_invalid_state() {
                debug!(from = %from, error = %err, "event ignored");
            } else {
                warn!(from = %from, error = %err, "event handling failed");
            }
        }
    }

    async fn dispatch(&self, event: InboundEvent) -> Result<()> {
        let from = event.sender().clone();
        if self.bans.is_banned(from.id) {
            debug!(from = %from.id, "event from banned identity");
            if let InboundEvent::Action { action_id, .. } = &event {
                self.answer(action_id, None).await;
            }
            let language = self.language_of(from.id).await;
            self.send(from.id, language.banned(), SendOptions::html())
                .await?;
            return Ok(());
        }

        match event {
            InboundEvent::Command {
                command,
                args,
                message,
                ..
            } => self.on_command(&from, &command, &args, message).await,
            InboundEvent::Message { text, message, .. } => {
                self.on_message(&from, text, message).await
            },
            InboundEvent::Action {
                action_id,
                payload,
                message,
                ..
            } => {
                let toast = self.on_action(&from, &payload, message).await;
                let text = match &toast {
                    Ok(text) => text.as_deref(),
                    Err(_) => None,
                };
                self.answer(&action_id, text).await;
                toast.map(|_| ())
            },
        }
    }

    // ── commands ─────────────────────────────────────────────────────────────

    async fn on_command(
        &self,
        from: &Participant,
        command: &str,
        args: &str,
        message: MessageRef,
    ) -> Result<()> {
        match command {
            "start" | "help" if self.agents.contains(from.id) => {
                self.send(from.id, agent::help(), SendOptions::html()).await?;
                Ok(())
            },
            "start" => self.on_start(from).await,
            "stop" | "end" => self.stop_session(from.id).await,
            "cancel" => {
                let language = self.language_of(from.id).await;
                let text = if self.intake.cancel(from.id) {
                    language.request_cancelled()
                } else {
                    language.nothing_to_cancel()
                };
                self.send(from.id, text, SendOptions::plain()).await?;
                Ok(())
            },
            _ => {
                if self.commands.dispatch(from.id, command, args).await? {
                    return Ok(());
                }
                if self.router.is_active(from.id) {
                    self.relay(from.id, Relayed::Copy(message)).await
                } else {
                    debug!(from = %from.id, command, "unknown command");
                    Ok(())
                }
            },
        }
    }

    async fn on_start(&self, from: &Participant) -> Result<()> {
        self.save_profile(from.id, ProfileUpdate {
            full_name: Some(from.full_name()),
            username: from.username.clone(),
            ..Default::default()
        })
        .await;

        let hello = greeting::greeting(Utc::now(), self.settings.timezone, &from.full_name());
        self.send(from.id, &hello, SendOptions::plain()).await?;

        let buttons = Language::ALL.into_iter().map(|language| {
            Button::action(
                language.native_name(),
                Action::SelectLanguage(language).to_string(),
            )
        });
        self.send(
            from.id,
            i18n::LANGUAGE_PROMPT,
            SendOptions::plain().with_buttons(buttons),
        )
        .await?;
        Ok(())
    }

    /// Close `by`'s session and tell both sides.
    async fn stop_session(&self, by: Identity) -> Result<()> {
        let peer = match self.router.close(by) {
            Ok(peer) => peer,
            Err(Error::NotActive { .. }) => {
                let language = self.language_of(by).await;
                self.send(by, language.no_active_session(), SendOptions::plain())
                    .await?;
                return Ok(());
            },
            Err(err) => return Err(err),
        };

        let (by_text, peer_text) = if self.agents.contains(by) {
            (
                self.language_of(by).await.session_stopped(),
                self.language_of(peer).await.session_stopped_by_agent(),
            )
        } else {
            (
                self.language_of(by).await.session_stopped(),
                agent::stopped_by_user(),
            )
        };

        let (stopper, other) = (
            self.session_end_options(by),
            self.session_end_options(peer),
        );
        let first = self.send(by, by_text, stopper).await;
        let second = self.send(peer, peer_text, other).await;
        first.and(second).map(|_| ())
    }

    /// Agents in legacy mode lose the stop keyboard when the session ends.
    fn session_end_options(&self, id: Identity) -> SendOptions {
        if self.settings.legacy_stop_keyword && self.agents.contains(id) {
            SendOptions::html().with_keyboard(Keyboard::RemoveReply)
        } else {
            SendOptions::html()
        }
    }

    // ── messages ─────────────────────────────────────────────────────────────

    async fn on_message(
        &self,
        from: &Participant,
        text: Option<String>,
        message: MessageRef,
    ) -> Result<()> {
        if self.router.is_active(from.id) {
            if self.settings.legacy_stop_keyword && text.as_deref().is_some_and(is_stop_keyword)
            {
                return self.stop_session(from.id).await;
            }
            let content = match text {
                Some(text) => Relayed::Text(text),
                None => Relayed::Copy(message),
            };
            return self.relay(from.id, content).await;
        }

        if self.intake.phase(from.id) == Some(IntakePhase::AwaitingName) {
            let name = text.as_deref().unwrap_or_default();
            if let NameOutcome::Broadcast { .. } = self.intake.provide_name(from, name).await? {
                self.save_profile(from.id, ProfileUpdate {
                    display_name: Some(name.trim().to_string()),
                    ..Default::default()
                })
                .await;
            }
            return Ok(());
        }

        if self.agents.contains(from.id) {
            debug!(agent = %from.id, "agent message outside a session ignored");
            return Ok(());
        }

        self.forward_offline(from, text, message).await
    }

    async fn relay(&self, from: Identity, content: Relayed) -> Result<()> {
        match self.router.forward(from, content).await {
            Ok(_) => Ok(()),
            Err(err) => {
                let Some(peer) = err.unreachable_identity() else {
                    return Err(err);
                };
                let notice = if self.agents.contains(from) {
                    agent::user_unreachable(peer)
                } else {
                    self.language_of(from)
                        .await
                        .counterpart_unreachable()
                        .to_string()
                };
                self.send(from, &notice, self.session_end_options(from))
                    .await?;
                Err(err)
            },
        }
    }

    /// Hand a message from a user without a session to every agent.
    async fn forward_offline(
        &self,
        sender: &Participant,
        text: Option<String>,
        message: MessageRef,
    ) -> Result<()> {
        let from = sender.id;
        let sender_name = sender.full_name();
        let at = Utc::now().timestamp();
        for to in self.agents.iter() {
            let forwarded =
                match delivery::forward(self.gateway.as_ref(), to, from, message).await {
                    Ok(forwarded) => forwarded,
                    Err(err) => {
                        warn!(from = %from, agent = %to, error = %err, "could not forward message to agent");
                        continue;
                    },
                };
            let record = ForwardRecord {
                agent: to,
                forwarded,
                from,
                original: message,
                sender_name: sender_name.clone(),
                text: text.clone(),
                at,
            };
            if let Err(err) = self.profiles.record_forward(record).await {
                warn!(from = %from, agent = %to, error = %err, "forward record not saved");
            }
        }

        if self.should_auto_reply(from, Instant::now()) {
            let language = self.language_of(from).await;
            let reply = language.auto_reply(self.settings.support_url.as_deref());
            self.send(from, &reply, SendOptions::plain()).await?;
        }
        Ok(())
    }

    /// Whether `id` is due another automatic reply at `now`; records it if so.
    fn should_auto_reply(&self, id: Identity, now: Instant) -> bool {
        let cooldown = Duration::from_secs(self.settings.auto_reply_cooldown_secs);
        let mut last = self
            .last_auto_reply
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if last
            .get(&id)
            .is_some_and(|at| now.saturating_duration_since(*at) < cooldown)
        {
            return false;
        }
        last.retain(|_, at| now.saturating_duration_since(*at) < cooldown);
        last.insert(id, now);
        true
    }

    // ── inline actions ───────────────────────────────────────────────────────

    /// Returns the toast to show on the pressed button, if any.
    async fn on_action(
        &self,
        from: &Participant,
        payload: &str,
        message: Option<MessageRef>,
    ) -> Result<Option<String>> {
        let action = match payload.parse::<Action>() {
            Ok(action) => action,
            Err(err) => {
                debug!(from = %from.id, payload, error = %err, "unrecognised action");
                return Ok(None);
            },
        };

        match action {
            Action::SelectLanguage(language) => {
                self.select_language(from.id, language, message).await?;
                Ok(None)
            },
            Action::RequestSupport => {
                self.request_support(from.id).await?;
                Ok(None)
            },
            Action::Start(user) | Action::Deny(user) if !self.agents.contains(from.id) => {
                debug!(from = %from.id, user = %user, "decision from non-agent ignored");
                Ok(None)
            },
            Action::Start(user) => self.decide(from.id, user, Decision::Accept, message).await,
            Action::Deny(user) => self.decide(from.id, user, Decision::Deny, message).await,
            Action::End(user) => {
                if self.router.peer_of(from.id) != Some(user) {
                    let language = self.language_of(from.id).await;
                    return Ok(Some(language.no_active_session().to_string()));
                }
                self.stop_session(from.id).await?;
                Ok(None)
            },
        }
    }

    async fn select_language(
        &self,
        user: Identity,
        language: Language,
        prompt: Option<MessageRef>,
    ) -> Result<()> {
        self.save_profile(user, ProfileUpdate {
            language: Some(language.code().to_string()),
            ..Default::default()
        })
        .await;

        if let Some(prompt) = prompt {
            if let Err(err) = self.gateway.delete_message(user, prompt).await {
                debug!(user = %user, error = %err, "could not delete language prompt");
            }
        }

        let mut buttons = Vec::new();
        if let Some(url) = &self.settings.channel_url {
            buttons.push(Button::url(language.join_channel_button(), url));
        }
        buttons.push(Button::action(
            language.customer_service_button(),
            Action::RequestSupport.to_string(),
        ));
        self.send(
            user,
            language.menu(),
            SendOptions::html().with_buttons(buttons),
        )
        .await?;
        Ok(())
    }

    async fn request_support(&self, user: Identity) -> Result<()> {
        if self.agents.contains(user) {
            debug!(agent = %user, "support request from agent ignored");
            return Ok(());
        }
        let language = self.language_of(user).await;
        if self.router.is_active(user) {
            self.send(user, language.already_in_session(), SendOptions::html())
                .await?;
            return Ok(());
        }
        if let SupportRequest::AlreadyPending(phase) =
            self.intake.request_support(user, language).await?
        {
            let text = match phase {
                IntakePhase::AwaitingName => language.name_prompt(),
                IntakePhase::Broadcasting => language.request_pending(),
            };
            self.send(user, text, SendOptions::html()).await?;
        }
        Ok(())
    }

    async fn decide(
        &self,
        agent_id: Identity,
        user: Identity,
        decision: Decision,
        broadcast: Option<MessageRef>,
    ) -> Result<Option<String>> {
        match self.intake.resolve(user, decision, agent_id).await {
            Ok(resolution) => {
                if let Some(message) = broadcast {
                    if let Err(err) = self.gateway.delete_message(agent_id, message).await {
                        debug!(agent = %agent_id, error = %err, "could not delete request message");
                    }
                }
                info!(agent = %agent_id, user = %user, decision = ?resolution.decision, "request decided");
                Ok(match resolution.decision {
                    Decision::Accept => None,
                    Decision::Deny => Some(agent::denied(user)),
                })
            },
            Err(Error::AlreadyResolved { .. }) => {
                debug!(agent = %agent_id, user = %user, "request already handled");
                self.send(agent_id, agent::already_handled(), SendOptions::plain())
                    .await?;
                Ok(Some(agent::already_handled().to_string()))
            },
            Err(Error::AlreadyPaired { identity }) => {
                let text = if identity == agent_id {
                    agent::busy().to_string()
                } else {
                    agent::user_busy(user)
                };
                self.send(agent_id, &text, SendOptions::html()).await?;
                Ok(None)
            },
            Err(err) => Err(err),
        }
    }

    // ── helpers ──────────────────────────────────────────────────────────────

    async fn send(&self, to: Identity, text: &str, options: SendOptions) -> Result<MessageRef> {
        delivery::send(self.gateway.as_ref(), to, text, options).await
    }

    async fn answer(&self, action_id: &str, text: Option<&str>) {
        if let Err(err) = self.gateway.answer_action(action_id, text).await {
            debug!(action_id, error = %err, "could not answer action");
        }
    }

    async fn language_of(&self, id: Identity) -> Language {
        match self.profiles.get_profile(id).await {
            Ok(profile) => profile
                .and_then(|p| p.language)
                .and_then(|code| Language::from_code(&code))
                .unwrap_or(self.default_language),
            Err(err) => {
                warn!(identity = %id, error = %err, "profile lookup failed");
                self.default_language
            },
        }
    }

    async fn save_profile(&self, id: Identity, update: ProfileUpdate) {
        if let Err(err) = self.profiles.save_profile(id, update).await {
            warn!(identity = %id, error = %err, "profile save failed");
        }
    }
}

#[async_trait]
impl EventHandler for Relay {
    async fn handle(&self, event: InboundEvent) {
        Relay::handle(self, event).await;
    }
}

fn is_stop_keyword(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(i18n::LEGACY_STOP_LABEL)
}
