// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool descriptions and JSON input schemas advertised by `tools/list`.

use serde::Serialize;
use serde_json::{json, Value};

use crate::tools::Tool;

/// One entry of the `tools/list` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Specs for every tool, in catalog order.
pub fn all() -> Vec<ToolSpec> {
    Tool::ALL.into_iter().map(describe).collect()
}

const MEDIA_TYPES: [&str; 5] = ["image", "video", "audio", "document", "sticker"];
const RECIPIENT: &str = "Recipient phone number in international format (e.g., +9198xxxxxx)";
const REPLY_TO: &str = "Optional message ID to reply to (context.message_id)";

fn object(properties: Value, required: &[&str]) -> Value {
    if required.is_empty() {
        json!({ "type": "object", "properties": properties })
    } else {
        json!({ "type": "object", "properties": properties, "required": required })
    }
}

fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

pub fn describe(tool: Tool) -> ToolSpec {
    let (description, input_schema) = match tool {
        Tool::CreateMessageTemplate => (
            "Create a new message template for the WhatsApp Business Account. Templates must be \
             approved by WhatsApp before they can be used, and are required for marketing messages \
             and messages sent outside the 24-hour window.",
            object(
                json!({
                    "name": string("Name of the message template"),
                    "language": string("Language code for the template (e.g., 'en_US', 'es_ES')"),
                    "category": {
                        "type": "string",
                        "description": "Category of the template",
                        "enum": ["MARKETING", "UTILITY", "AUTHENTICATION"],
                    },
                    "components": {
                        "type": "array",
                        "description": "Template components (HEADER, BODY, FOOTER, BUTTONS), each with a 'type' field",
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": { "type": "string", "enum": ["HEADER", "BODY", "FOOTER", "BUTTONS"] },
                                "format": { "type": "string", "enum": ["TEXT", "IMAGE", "VIDEO", "DOCUMENT"] },
                                "text": { "type": "string" },
                                "example": { "type": "object" },
                                "buttons": { "type": "array", "items": { "type": "object" } },
                            },
                            "required": ["type"],
                        },
                    },
                }),
                &["name", "language", "category", "components"],
            ),
        ),
        Tool::DeleteMessageTemplate => (
            "Delete a message template from the WhatsApp Business Account. Deletion is permanent.",
            object(json!({ "template_id": string("The ID of the message template to delete") }), &["template_id"]),
        ),
        Tool::GetMessageTemplates => (
            "List message templates for the WhatsApp Business Account.",
            object(
                json!({
                    "after": string("Pagination cursor (from paging.cursors.after)"),
                    "category": string("Filter by category (e.g., MARKETING, UTILITY, AUTHENTICATION)"),
                    "language": string("Filter by language (e.g., en_US)"),
                    "limit": { "type": "integer", "description": "Number of templates to return", "default": 25 },
                    "name_or_content": string("Search templates by name or content substring"),
                    "status": string("Filter by status (e.g., APPROVED, PENDING, REJECTED, DISABLED)"),
                }),
                &[],
            ),
        ),
        Tool::GetTemplateStatus => (
            "Get the status and details of a message template (approved, rejected or pending review).",
            object(
                json!({
                    "template_id": string("The ID of the message template"),
                    "fields": {
                        "type": "string",
                        "description": "Comma-separated list of fields to return",
                        "default": "id,name,status,category,language",
                    },
                }),
                &["template_id"],
            ),
        ),
        Tool::GetBusinessProfile => (
            "Get the business profile of the configured WhatsApp Business phone number.",
            object(
                json!({
                    "fields": {
                        "type": "string",
                        "description": "Comma-separated list of fields to return",
                        "default": "about,address,description,email,profile_picture_url,websites,vertical",
                    },
                }),
                &[],
            ),
        ),
        Tool::GetPhoneNumber => (
            "Get details of a phone number associated with the WhatsApp Business Account.",
            object(
                json!({
                    "phone_number_id": string("Phone number ID (defaults to WHATSAPP_PHONE_NUMBER_ID)"),
                    "fields": string("Comma-separated list of fields to return"),
                }),
                &[],
            ),
        ),
        Tool::GetPhoneNumbers => (
            "Get all phone numbers associated with the WhatsApp Business Account (WABA).",
            object(
                json!({
                    "limit": { "type": "integer", "description": "Number of phone numbers to return", "default": 25 },
                }),
                &[],
            ),
        ),
        Tool::UploadMedia => (
            "Upload a local media file (image, video, audio, document, sticker). Returns a media ID \
             for use with WHATSAPP_SEND_MEDIA_BY_ID.",
            object(
                json!({
                    "media_type": { "type": "string", "description": "Type of media being uploaded", "enum": MEDIA_TYPES },
                    "file_to_upload": {
                        "type": "object",
                        "description": "Local file to upload",
                        "properties": {
                            "path": string("Absolute or relative path to the file"),
                            "filename": string("Optional filename override (defaults to the path's basename)"),
                            "mime_type": string("Optional MIME type override (e.g., image/jpeg)"),
                        },
                        "required": ["path"],
                    },
                }),
                &["media_type", "file_to_upload"],
            ),
        ),
        Tool::GetMedia => (
            "Get uploaded media information including a short-lived download URL.",
            object(json!({ "media_id": string("The media ID to fetch info for") }), &["media_id"]),
        ),
        Tool::GetMediaInfo => (
            "Get uploaded media metadata (size, type, hash) without a download URL.",
            object(json!({ "media_id": string("The media ID to fetch metadata for") }), &["media_id"]),
        ),
        Tool::SendMessage => (
            "Send a text message. Delivered only if the recipient has messaged first.",
            object(
                json!({
                    "to_number": string(RECIPIENT),
                    "text": string("Text message body"),
                    "preview_url": { "type": "boolean", "description": "Show a URL preview (default: false)" },
                    "message_id": string(REPLY_TO),
                }),
                &["to_number", "text"],
            ),
        ),
        Tool::SendReply => (
            "Reply to a specific message in a conversation.",
            object(
                json!({
                    "to_number": string(RECIPIENT),
                    "text": string("Text message body"),
                    "reply_to_message_id": string("Message ID to reply to"),
                    "preview_url": { "type": "boolean", "description": "Show a URL preview (default: false)" },
                }),
                &["to_number", "reply_to_message_id", "text"],
            ),
        ),
        Tool::SendTemplateMessage => (
            "Send an approved template message.",
            object(
                json!({
                    "to_number": string(RECIPIENT),
                    "template_name": string("Approved template name"),
                    "language_code": { "type": "string", "description": "Template language code", "default": "en_US" },
                    "components": { "type": "array", "description": "Optional template components", "items": { "type": "object" } },
                }),
                &["to_number", "template_name"],
            ),
        ),
        Tool::SendMedia => (
            "Send a media message by public URL. Delivered only if the recipient has messaged first.",
            object(
                json!({
                    "phone_number_id": string("Sender phone number ID (defaults to WHATSAPP_PHONE_NUMBER_ID)"),
                    "to_number": string(RECIPIENT),
                    "media_type": { "type": "string", "enum": MEDIA_TYPES },
                    "link": string("Publicly accessible HTTPS URL to the media"),
                    "caption": string("Optional caption (image, video and document only)"),
                }),
                &["to_number", "media_type", "link"],
            ),
        ),
        Tool::SendMediaById => (
            "Send previously uploaded media by media ID.",
            object(
                json!({
                    "to_number": string(RECIPIENT),
                    "media_type": { "type": "string", "enum": MEDIA_TYPES },
                    "media_id": string("Media ID from an upload or webhook"),
                    "caption": string("Optional caption (image, video and document only)"),
                    "filename": string("Optional filename (document only)"),
                    "reply_to_message_id": string(REPLY_TO),
                }),
                &["to_number", "media_type", "media_id"],
            ),
        ),
        Tool::SendContacts => (
            "Send one or more contact cards.",
            object(
                json!({
                    "to_number": string(RECIPIENT),
                    "contacts": { "type": "array", "description": "Contact objects in WhatsApp payload format", "items": { "type": "object" } },
                }),
                &["to_number", "contacts"],
            ),
        ),
        Tool::SendLocation => (
            "Send a location pin.",
            object(
                json!({
                    "to_number": string(RECIPIENT),
                    "latitude": string("Latitude (e.g., 12.9716)"),
                    "longitude": string("Longitude (e.g., 77.5946)"),
                    "name": string("Location name"),
                    "address": string("Location address"),
                }),
                &["to_number", "latitude", "longitude", "name", "address"],
            ),
        ),
        Tool::SendInteractiveButtons => (
            "Send an interactive message with up to 3 reply buttons.",
            object(
                json!({
                    "to_number": string(RECIPIENT),
                    "body_text": string("Main body text"),
                    "buttons": {
                        "type": "array",
                        "description": "Up to 3 buttons: [{id?, title}]",
                        "items": {
                            "type": "object",
                            "properties": { "id": { "type": "string" }, "title": { "type": "string" } },
                            "required": ["title"],
                        },
                    },
                    "header_text": string("Optional text header"),
                    "footer_text": string("Optional footer"),
                    "reply_to_message_id": string(REPLY_TO),
                }),
                &["to_number", "body_text", "buttons"],
            ),
        ),
        Tool::SendInteractiveList => (
            "Send an interactive list message with up to 10 rows in total.",
            object(
                json!({
                    "to_number": string(RECIPIENT),
                    "body_text": string("Main body text"),
                    "button_text": string("Text on the list button"),
                    "sections": {
                        "type": "array",
                        "description": "Sections: [{title?, rows: [{id?, title, description?}]}]",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "rows": { "type": "array", "items": { "type": "object" } },
                            },
                            "required": ["rows"],
                        },
                    },
                    "header_text": string("Optional text header"),
                    "footer_text": string("Optional footer"),
                    "reply_to_message_id": string(REPLY_TO),
                }),
                &["to_number", "body_text", "button_text", "sections"],
            ),
        ),
    };

    ToolSpec { name: tool.as_str(), description, input_schema }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
