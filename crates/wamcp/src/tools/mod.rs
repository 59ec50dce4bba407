// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WhatsApp Business tool catalog and dispatcher.

pub mod args;
pub mod catalog;
pub mod graph;
pub mod media;
pub mod messaging;
pub mod profile;
pub mod templates;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

pub use crate::credential::TokenSource;

use self::args::Args;
use self::graph::GraphClient;

/// Every tool the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    CreateMessageTemplate,
    DeleteMessageTemplate,
    GetMessageTemplates,
    GetTemplateStatus,
    GetBusinessProfile,
    GetPhoneNumber,
    GetPhoneNumbers,
    UploadMedia,
    GetMedia,
    GetMediaInfo,
    SendMessage,
    SendReply,
    SendTemplateMessage,
    SendMedia,
    SendMediaById,
    SendContacts,
    SendLocation,
    SendInteractiveButtons,
    SendInteractiveList,
}

impl Tool {
    pub const ALL: [Tool; 19] = [
        Self::CreateMessageTemplate,
        Self::DeleteMessageTemplate,
        Self::GetMessageTemplates,
        Self::GetTemplateStatus,
        Self::GetBusinessProfile,
        Self::GetPhoneNumber,
        Self::GetPhoneNumbers,
        Self::UploadMedia,
        Self::GetMedia,
        Self::GetMediaInfo,
        Self::SendMessage,
        Self::SendReply,
        Self::SendTemplateMessage,
        Self::SendMedia,
        Self::SendMediaById,
        Self::SendContacts,
        Self::SendLocation,
        Self::SendInteractiveButtons,
        Self::SendInteractiveList,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateMessageTemplate => "WHATSAPP_CREATE_MESSAGE_TEMPLATE",
            Self::DeleteMessageTemplate => "WHATSAPP_DELETE_MESSAGE_TEMPLATE",
            Self::GetMessageTemplates => "WHATSAPP_GET_MESSAGE_TEMPLATES",
            Self::GetTemplateStatus => "WHATSAPP_GET_TEMPLATE_STATUS",
            Self::GetBusinessProfile => "WHATSAPP_GET_BUSINESS_PROFILE",
            Self::GetPhoneNumber => "WHATSAPP_GET_PHONE_NUMBER",
            Self::GetPhoneNumbers => "WHATSAPP_GET_PHONE_NUMBERS",
            Self::UploadMedia => "WHATSAPP_UPLOAD_MEDIA",
            Self::GetMedia => "WHATSAPP_GET_MEDIA",
            Self::GetMediaInfo => "WHATSAPP_GET_MEDIA_INFO",
            Self::SendMessage => "WHATSAPP_SEND_MESSAGE",
            Self::SendReply => "WHATSAPP_SEND_REPLY",
            Self::SendTemplateMessage => "WHATSAPP_SEND_TEMPLATE_MESSAGE",
            Self::SendMedia => "WHATSAPP_SEND_MEDIA",
            Self::SendMediaById => "WHATSAPP_SEND_MEDIA_BY_ID",
            Self::SendContacts => "WHATSAPP_SEND_CONTACTS",
            Self::SendLocation => "WHATSAPP_SEND_LOCATION",
            Self::SendInteractiveButtons => "WHATSAPP_SEND_INTERACTIVE_BUTTONS",
            Self::SendInteractiveList => "WHATSAPP_SEND_INTERACTIVE_LIST",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed tool call: message plus the provider's error body, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolError {
    pub message: String,
    pub data: Option<Value>,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), data: None }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ToolError {}

/// Uniform tool result: `{successful, error?, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self { successful: true, error: None, data: Some(data) }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { successful: false, error: Some(message.into()), data: None }
    }

    /// Pretty-printed JSON, as placed in the MCP text content.
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl From<ToolError> for Envelope {
    fn from(e: ToolError) -> Self {
        Self { successful: false, error: Some(e.message), data: e.data }
    }
}

/// Account identifiers the tools address requests to.
#[derive(Debug, Clone, Default)]
pub struct AccountIds {
    pub phone_number_id: Option<String>,
    pub business_account_id: Option<String>,
}

/// Per-call context handed to each tool handler.
pub struct Call<'a> {
    pub graph: &'a GraphClient,
    pub token: &'a str,
    pub accounts: &'a AccountIds,
}

impl Call<'_> {
    pub fn phone_number_id(&self) -> Result<&str, ToolError> {
        self.accounts
            .phone_number_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::new("WHATSAPP_PHONE_NUMBER_ID is not set"))
    }

    pub fn business_account_id(&self) -> Result<&str, ToolError> {
        self.accounts
            .business_account_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::new("WHATSAPP_BUSINESS_ACCOUNT_ID is not set"))
    }
}

/// Routes a tool name and argument bag to its handler.
pub struct Dispatcher {
    tokens: Arc<dyn TokenSource>,
    graph: GraphClient,
    accounts: AccountIds,
}

impl Dispatcher {
    pub fn new(tokens: Arc<dyn TokenSource>, graph: GraphClient, accounts: AccountIds) -> Self {
        Self { tokens, graph, accounts }
    }

    pub fn accounts(&self) -> &AccountIds {
        &self.accounts
    }

    pub fn tools(&self) -> Vec<catalog::ToolSpec> {
        catalog::all()
    }

    /// Run one tool. Never fails: every outcome is an envelope.
    pub async fn call(&self, name: &str, arguments: &Value) -> Envelope {
        let Some(tool) = Tool::from_name(name) else {
            warn!(tool = name, "unknown tool");
            return Envelope::failure(format!("Unknown tool: {name}"));
        };

        let Some(token) = self.tokens.valid_token().await else {
            return Envelope::failure(self.tokens.missing_token_message());
        };

        debug!(%tool, "tool call");
        let call = Call { graph: &self.graph, token: &token, accounts: &self.accounts };
        let args = Args::new(arguments);
        let result = match tool {
            Tool::CreateMessageTemplate => templates::create_template(&call, args).await,
            Tool::DeleteMessageTemplate => templates::delete_template(&call, args).await,
            Tool::GetMessageTemplates => templates::list_templates(&call, args).await,
            Tool::GetTemplateStatus => templates::template_status(&call, args).await,
            Tool::GetBusinessProfile => profile::business_profile(&call, args).await,
            Tool::GetPhoneNumber => profile::phone_number(&call, args).await,
            Tool::GetPhoneNumbers => profile::phone_numbers(&call, args).await,
            Tool::UploadMedia => media::upload_media(&call, args).await,
            Tool::GetMedia => media::get_media(&call, args).await,
            Tool::GetMediaInfo => media::get_media_info(&call, args).await,
            Tool::SendMessage => messaging::send_message(&call, args).await,
            Tool::SendReply => messaging::send_reply(&call, args).await,
            Tool::SendTemplateMessage => messaging::send_template_message(&call, args).await,
            Tool::SendMedia => messaging::send_media(&call, args).await,
            Tool::SendMediaById => messaging::send_media_by_id(&call, args).await,
            Tool::SendContacts => messaging::send_contacts(&call, args).await,
            Tool::SendLocation => messaging::send_location(&call, args).await,
            Tool::SendInteractiveButtons => messaging::send_interactive_buttons(&call, args).await,
            Tool::SendInteractiveList => messaging::send_interactive_list(&call, args).await,
        };

        match result {
            Ok(data) => Envelope::success(data),
            Err(e) => {
                warn!(%tool, "tool call failed: {e}");
                e.into()
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
