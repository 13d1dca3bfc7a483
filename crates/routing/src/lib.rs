//! Relay and session-routing engine.
//!
//! Every inbound event goes through [`Relay::handle`], which walks one fixed
//! decision tree:
//! 1. Banned sender → ban notice, nothing else
//! 2. Command (`/start`, `/stop`, `/cancel`, agent-only admin commands)
//! 3. Active session → forward to the paired identity
//! 4. Intake in progress → advance the support request
//! 5. Otherwise → hand the message to the agents, auto-reply with a cooldown
//!
//! State lives in three owned tables: the [`BanRegistry`], the
//! [`SessionRouter`] pairing table and the [`IntakeCoordinator`] pending map.

pub mod action;
pub mod agents;
pub mod command;
pub mod delivery;
pub mod error;
pub mod greeting;
pub mod i18n;
pub mod intake;
pub mod lanes;
pub mod registry;
pub mod relay;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use {
    action::Action,
    agents::AgentPool,
    command::{AdminCommand, CommandDispatcher},
    error::{Error, Result},
    i18n::Language,
    intake::{Decision, IntakeCoordinator, IntakePhase, NameOutcome, Resolution, SupportRequest},
    lanes::{EventHandler, EventLanes},
    registry::BanRegistry,
    relay::Relay,
    session::{Relayed, SessionRouter},
};
