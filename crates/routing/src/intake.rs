//! Intake Coordinator: the support request before a session exists.
//!
//! `NONE → AWAITING_NAME → BROADCASTING → (accepted | denied | NONE)`.
//!
//! [`IntakeCoordinator::resolve`] is the first-wins point. It checks the
//! pending entry, opens the session and removes the entry under a single
//! lock, so for any user exactly one agent decision takes effect and every
//! later one sees [`Error::AlreadyResolved`]. Lock order is pending map,
//! then pairing table.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use {
    futures::future::join_all,
    relaydesk_channels::{Button, Keyboard, MessagingGateway, SendOptions},
    relaydesk_common::{Identity, MessageRef, Participant},
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    action::Action,
    agents::AgentPool,
    delivery,
    i18n::{self, Language, agent},
    session::SessionRouter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakePhase {
    AwaitingName,
    Broadcasting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Deny,
}

/// Result of [`IntakeCoordinator::request_support`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportRequest {
    /// Name prompt sent; the user is now awaiting name.
    Prompted,
    /// A request was already in progress; nothing changed.
    AlreadyPending(IntakePhase),
}

/// Result of [`IntakeCoordinator::provide_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameOutcome {
    /// Empty name; the user was asked again.
    Rejected,
    /// The request reached `agents` agents.
    Broadcast { agents: usize },
    /// No agent could be reached; the request was dropped.
    Unavailable,
}

/// The decision that won for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub user: Identity,
    pub agent: Identity,
    pub decision: Decision,
    pub display_name: String,
}

#[derive(Debug, Clone)]
struct PendingRequest {
    phase: IntakePhase,
    display_name: Option<String>,
    /// The name prompt, deleted once a name is accepted.
    prompt: Option<MessageRef>,
    language: Language,
}

pub struct IntakeCoordinator {
    pending: Mutex<HashMap<Identity, PendingRequest>>,
    router: Arc<SessionRouter>,
    agents: AgentPool,
    gateway: Arc<dyn MessagingGateway>,
    legacy_stop_keyword: bool,
}

impl IntakeCoordinator {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        router: Arc<SessionRouter>,
        agents: AgentPool,
        legacy_stop_keyword: bool,
    ) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            router,
            agents,
            gateway,
            legacy_stop_keyword,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Identity, PendingRequest>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn phase(&self, user: Identity) -> Option<IntakePhase> {
        self.lock().get(&user).map(|r| r.phase)
    }

    /// Start a request for `user` and ask for their name.
    pub async fn request_support(
        &self,
        user: Identity,
        language: Language,
    ) -> Result<SupportRequest> {
        {
            let mut pending = self.lock();
            if let Some(existing) = pending.get(&user) {
                debug!(user = %user, phase = ?existing.phase, "support already requested");
                return Ok(SupportRequest::AlreadyPending(existing.phase));
            }
            pending.insert(user, PendingRequest {
                phase: IntakePhase::AwaitingName,
                display_name: None,
                prompt: None,
                language,
            });
        }

        match delivery::send(
            self.gateway.as_ref(),
            user,
            language.name_prompt(),
            SendOptions::plain(),
        )
        .await
        {
            Ok(prompt) => {
                if let Some(request) = self.lock().get_mut(&user) {
                    if request.phase == IntakePhase::AwaitingName {
                        request.prompt = Some(prompt);
                    }
                }
                info!(user = %user, "support requested");
                Ok(SupportRequest::Prompted)
            },
            Err(err) => {
                if err.unreachable_identity().is_some() {
                    self.lock().remove(&user);
                }
                Err(err)
            },
        }
    }

    /// Accept the user's display name and broadcast the request to every
    /// agent.
    pub async fn provide_name(&self, user: &Participant, text: &str) -> Result<NameOutcome> {
        let name = text.trim();
        let (language, prompt) = {
            let mut pending = self.lock();
            let request = match pending.get_mut(&user.id) {
                Some(request) if request.phase == IntakePhase::AwaitingName => request,
                _ => {
                    return Err(Error::invalid_state(format!(
                        "{} is not awaiting a name",
                        user.id
                    )));
                },
            };
            if name.is_empty() {
                (request.language, None)
            } else {
                request.phase = IntakePhase::Broadcasting;
                request.display_name = Some(name.to_string());
                (request.language, request.prompt.take())
            }
        };

        let gateway = self.gateway.as_ref();
        if name.is_empty() {
            delivery::send(gateway, user.id, language.name_rejected(), SendOptions::plain())
                .await?;
            return Ok(NameOutcome::Rejected);
        }

        if let Some(prompt) = prompt {
            if let Err(err) = gateway.delete_message(user.id, prompt).await {
                debug!(user = %user.id, error = %err, "could not delete name prompt");
            }
        }

        match delivery::send(gateway, user.id, language.request_sent(), SendOptions::html()).await {
            Ok(_) => {},
            Err(err) if err.unreachable_identity() == Some(user.id) => {
                self.lock().remove(&user.id);
                return Err(err);
            },
            Err(err) => {
                warn!(user = %user.id, error = %err, "could not confirm request, broadcasting anyway");
            },
        }

        let text = agent::new_request(
            user.id,
            &user.full_name(),
            name,
            user.username.as_deref(),
            language,
        );
        let options = SendOptions::html().with_buttons([
            Button::action(agent::DENY_BUTTON, Action::Deny(user.id).to_string()),
            Button::action(agent::START_BUTTON, Action::Start(user.id).to_string()),
        ]);
        let results = join_all(
            self.agents
                .iter()
                .map(|to| delivery::send(gateway, to, &text, options.clone())),
        )
        .await;

        let mut reached = 0;
        for (to, result) in self.agents.iter().zip(results) {
            match result {
                Ok(_) => reached += 1,
                Err(err) => warn!(user = %user.id, agent = %to, error = %err, "could not notify agent"),
            }
        }

        if reached == 0 {
            self.lock().remove(&user.id);
            warn!(user = %user.id, "no agent reachable, request dropped");
            delivery::send(gateway, user.id, language.support_unavailable(), SendOptions::plain())
                .await?;
            return Ok(NameOutcome::Unavailable);
        }

        info!(user = %user.id, agents = reached, "support request broadcast");
        Ok(NameOutcome::Broadcast { agents: reached })
    }

    /// Apply `agent`'s decision on `user`'s request. The first decision wins.
    pub async fn resolve(
        &self,
        user: Identity,
        decision: Decision,
        agent: Identity,
    ) -> Result<Resolution> {
        let request = {
            let mut pending = self.lock();
            match pending.get(&user) {
                Some(request) if request.phase == IntakePhase::Broadcasting => {},
                _ => return Err(Error::AlreadyResolved { user }),
            }
            if decision == Decision::Accept {
                self.router.open(user, agent)?;
            }
            pending.remove(&user).ok_or(Error::AlreadyResolved { user })?
        };

        let display_name = request.display_name.unwrap_or_default();
        let language = request.language;
        let gateway = self.gateway.as_ref();
        info!(user = %user, agent = %agent, ?decision, "support request resolved");

        match decision {
            Decision::Accept => {
                if let Err(err) =
                    delivery::send(gateway, user, language.session_started(), SendOptions::html())
                        .await
                {
                    warn!(user = %user, error = %err, "could not notify user of session start");
                    if err.unreachable_identity().is_some() && self.router.close_pair(user, agent) {
                        delivery::send(
                            gateway,
                            agent,
                            &agent::user_unreachable(user),
                            SendOptions::html(),
                        )
                        .await?;
                        return Err(err);
                    }
                }

                let keyboard = if self.legacy_stop_keyword {
                    Keyboard::Reply {
                        rows: vec![vec![i18n::LEGACY_STOP_LABEL.to_string()]],
                        one_time: false,
                    }
                } else {
                    Keyboard::Inline(vec![vec![Button::action(
                        agent::END_BUTTON,
                        Action::End(user).to_string(),
                    )]])
                };
                delivery::send(
                    gateway,
                    agent,
                    &agent::session_started(user, &display_name, self.legacy_stop_keyword),
                    SendOptions::html().with_keyboard(keyboard),
                )
                .await?;
            },
            Decision::Deny => {
                delivery::send(gateway, user, language.request_denied(), SendOptions::html())
                    .await?;
            },
        }

        Ok(Resolution {
            user,
            agent,
            decision,
            display_name,
        })
    }

    /// Drop any request `user` has in progress. Returns whether one existed.
    pub fn cancel(&self, user: Identity) -> bool {
        let removed = self.lock().remove(&user).is_some();
        if removed {
            info!(user = %user, "support request withdrawn");
        }
        removed
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }
}
