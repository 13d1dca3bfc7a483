//! Command Dispatcher: agent-only administration commands.

use std::sync::Arc;

use {
    futures::{StreamExt, stream},
    relaydesk_channels::{MessagingGateway, SendOptions, UserDirectory},
    relaydesk_common::Identity,
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    agents::AgentPool,
    delivery,
    i18n::agent,
    intake::IntakeCoordinator,
    registry::BanRegistry,
    session::SessionRouter,
};

/// Concurrent sends during `/broadcast`.
const BROADCAST_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Ban(Identity),
    Unban(Identity),
    Banned,
    Broadcast(String),
}

impl AdminCommand {
    /// `None` when `command` is not an admin command at all.
    pub fn parse(command: &str, args: &str) -> Option<Result<Self>> {
        let target = || {
            args.parse::<Identity>()
                .map_err(|_| Error::validation(agent::usage(command)))
        };
        let parsed = match command {
            "ban" => target().map(Self::Ban),
            "unban" => target().map(Self::Unban),
            "banned" => Ok(Self::Banned),
            "broadcast" => {
                let text = args.trim();
                if text.is_empty() {
                    Err(Error::validation(agent::usage(command)))
                } else {
                    Ok(Self::Broadcast(text.to_string()))
                }
            },
            _ => return None,
        };
        Some(parsed)
    }
}

pub struct CommandDispatcher {
    agents: AgentPool,
    bans: Arc<BanRegistry>,
    router: Arc<SessionRouter>,
    intake: Arc<IntakeCoordinator>,
    directory: Arc<dyn UserDirectory>,
    gateway: Arc<dyn MessagingGateway>,
}

impl CommandDispatcher {
    pub fn new(
        agents: AgentPool,
        bans: Arc<BanRegistry>,
        router: Arc<SessionRouter>,
        intake: Arc<IntakeCoordinator>,
        directory: Arc<dyn UserDirectory>,
        gateway: Arc<dyn MessagingGateway>,
    ) -> Self {
        Self {
            agents,
            bans,
            router,
            intake,
            directory,
            gateway,
        }
    }

    /// Handle `/command args` from `from`.
    ///
    /// Returns `false` when `command` is not an admin command, leaving it to
    /// the caller. Admin commands from non-agents are swallowed silently.
    pub async fn dispatch(&self, from: Identity, command: &str, args: &str) -> Result<bool> {
        let Some(parsed) = AdminCommand::parse(command, args) else {
            return Ok(false);
        };
        if !self.agents.contains(from) {
            debug!(from = %from, command, "admin command from non-agent ignored");
            return Ok(true);
        }

        let reply = match parsed {
            Ok(command) => self.apply(from, command).await?,
            Err(Error::Validation { message }) => message,
            Err(err) => return Err(err),
        };
        delivery::send(self.gateway.as_ref(), from, &reply, SendOptions::html()).await?;
        Ok(true)
    }

    /// Apply `command` and return the acknowledgement for the issuing agent.
    pub async fn apply(&self, by: Identity, command: AdminCommand) -> Result<String> {
        match command {
            AdminCommand::Ban(target) => {
                if self.agents.contains(target) {
                    return Ok(agent::cannot_ban_agent().to_string());
                }
                let newly = self.bans.ban(target);
                info!(by = %by, target = %target, newly, "identity banned");
                self.intake.cancel(target);
                match self.router.close(target) {
                    // The issuing agent gets the notice with the acknowledgement.
                    Ok(peer) if peer == by => {
                        return Ok(format!(
                            "{}\n{}",
                            agent::banned(target, newly),
                            agent::session_closed_by_ban(target)
                        ));
                    },
                    Ok(peer) => {
                        delivery::send(
                            self.gateway.as_ref(),
                            peer,
                            &agent::session_closed_by_ban(target),
                            SendOptions::html(),
                        )
                        .await?;
                    },
                    Err(_) => {},
                }
                Ok(agent::banned(target, newly))
            },
            AdminCommand::Unban(target) => {
                let was_banned = self.bans.unban(target);
                info!(by = %by, target = %target, was_banned, "identity unbanned");
                Ok(agent::unbanned(target, was_banned))
            },
            AdminCommand::Banned => Ok(agent::ban_list(&self.bans.list_banned())),
            AdminCommand::Broadcast(text) => {
                let (delivered, failed) = self.broadcast(&text).await?;
                info!(by = %by, delivered, failed, "broadcast finished");
                Ok(agent::broadcast_summary(delivered, failed))
            },
        }
    }

    async fn broadcast(&self, text: &str) -> Result<(usize, usize)> {
        let recipients: Vec<Identity> = self
            .directory
            .list_users()
            .await?
            .into_iter()
            .filter(|id| !self.agents.contains(*id) && !self.bans.is_banned(*id))
            .collect();

        let gateway = self.gateway.as_ref();
        let results: Vec<bool> = stream::iter(recipients)
            .map(|to| async move {
                match delivery::send(gateway, to, text, SendOptions::plain()).await {
                    Ok(_) => true,
                    Err(err) => {
                        warn!(to = %to, error = %err, "broadcast delivery failed");
                        false
                    },
                }
            })
            .buffer_unordered(BROADCAST_CONCURRENCY)
            .collect()
            .await;

        let delivered = results.iter().filter(|ok| **ok).count();
        Ok((delivered, results.len() - delivered))
    }
}
