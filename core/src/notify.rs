//! Notification dispatch — the contract with the external SMS/email
//! sender.
//!
//! RULE: notifications are fire-and-forget. The state change commits
//! first; a failed send is logged and counted, never bubbled up as the
//! operation's error. Implementations must be time-bounded — a slow
//! provider may not stall the desk.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Sms,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Email => "email",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sms" => Some(Channel::Sms),
            "email" => Some(Channel::Email),
            _ => None,
        }
    }
}

/// The outbound payload contract. The transport itself is external.
pub trait NotificationSender {
    fn send(
        &self,
        channel: Channel,
        template_key: &str,
        recipient_id: &str,
        context: &serde_json::Value,
    ) -> anyhow::Result<()>;
}

/// Default sender: writes the payload to the log. Used by tests and by
/// deployments that wire the real sender at the transport layer.
pub struct LogSender;

impl NotificationSender for LogSender {
    fn send(
        &self,
        channel: Channel,
        template_key: &str,
        recipient_id: &str,
        context: &serde_json::Value,
    ) -> anyhow::Result<()> {
        log::info!(
            "notify channel={} template={} recipient={} context={}",
            channel.as_str(),
            template_key,
            recipient_id,
            context
        );
        Ok(())
    }
}
