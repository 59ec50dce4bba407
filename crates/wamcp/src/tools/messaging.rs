// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound messages: text, templates, media, contacts, location and
//! interactive buttons/lists.
//!
//! Payload construction is kept separate from sending so the request
//! shapes can be checked without a provider.

use serde_json::{json, Map, Value};

use crate::tools::args::{scalar, Args};
use crate::tools::media::MediaType;
use crate::tools::{Call, ToolError};

pub const MAX_BUTTONS: usize = 3;
pub const MAX_LIST_ROWS: usize = 10;
const DEFAULT_TEMPLATE_LANGUAGE: &str = "en_US";

/// Where a media message's content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSource<'a> {
    Link(&'a str),
    Id(&'a str),
}

/// Optional media attributes, filtered by what the media type supports.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaExtras<'a> {
    pub caption: Option<&'a str>,
    pub filename: Option<&'a str>,
}

fn envelope(to: &str, kind: &str, content: Value, reply_to: Option<&str>) -> Value {
    let mut msg = Map::new();
    msg.insert("messaging_product".into(), json!("whatsapp"));
    msg.insert("recipient_type".into(), json!("individual"));
    msg.insert("to".into(), json!(to));
    msg.insert("type".into(), json!(kind));
    msg.insert(kind.into(), content);
    if let Some(id) = reply_to {
        msg.insert("context".into(), json!({ "message_id": id }));
    }
    Value::Object(msg)
}

pub fn text_message(to: &str, body: &str, preview_url: bool, reply_to: Option<&str>) -> Value {
    envelope(to, "text", json!({ "body": body, "preview_url": preview_url }), reply_to)
}

pub fn template_message(to: &str, name: &str, language: &str, components: Option<&Value>) -> Value {
    let mut template = json!({ "name": name, "language": { "code": language } });
    if let (Some(components), Some(obj)) = (components, template.as_object_mut()) {
        obj.insert("components".into(), components.clone());
    }
    envelope(to, "template", template, None)
}

pub fn media_message(
    to: &str,
    media_type: MediaType,
    source: MediaSource<'_>,
    extras: MediaExtras<'_>,
    reply_to: Option<&str>,
) -> Value {
    let mut media = Map::new();
    match source {
        MediaSource::Link(link) => media.insert("link".into(), json!(link)),
        MediaSource::Id(id) => media.insert("id".into(), json!(id)),
    };
    if let Some(caption) = extras.caption.filter(|_| media_type.allows_caption()) {
        media.insert("caption".into(), json!(caption));
    }
    if let Some(filename) = extras.filename.filter(|_| media_type.allows_filename()) {
        media.insert("filename".into(), json!(filename));
    }
    envelope(to, media_type.as_str(), Value::Object(media), reply_to)
}

pub fn location_message(to: &str, latitude: f64, longitude: f64, name: &str, address: &str) -> Value {
    envelope(
        to,
        "location",
        json!({ "latitude": latitude, "longitude": longitude, "name": name, "address": address }),
        None,
    )
}

/// Contacts are passed through as given; the array sits under `contacts`.
pub fn contacts_message(to: &str, contacts: &[Value]) -> Value {
    envelope(to, "contacts", Value::Array(contacts.to_vec()), None)
}

/// Reply-button interactive body from `body_text`, `buttons` and optional
/// `header_text`/`footer_text`.
pub fn buttons_interactive(args: Args<'_>) -> Result<Value, ToolError> {
    let body = args.str("body_text").unwrap_or_default();
    let buttons = non_empty_array(args.raw("buttons"), "buttons must be a non-empty array")?;
    if buttons.len() > MAX_BUTTONS {
        return Err(ToolError::new(format!("buttons can have at most {MAX_BUTTONS} items")));
    }

    let mut replies = Vec::with_capacity(buttons.len());
    for (idx, button) in buttons.iter().enumerate() {
        let title = title_of(button).ok_or_else(|| {
            ToolError::new("Each button must be an object with at least a non-empty 'title' field")
        })?;
        let id = id_of(button).unwrap_or_else(|| format!("btn_{}", idx + 1));
        replies.push(json!({ "type": "reply", "reply": { "id": id, "title": title } }));
    }

    let mut interactive = json!({
        "type": "button",
        "body": { "text": body },
        "action": { "buttons": replies },
    });
    decorate(&mut interactive, args);
    Ok(interactive)
}

/// List interactive body; at most [`MAX_LIST_ROWS`] rows across all sections.
pub fn list_interactive(args: Args<'_>) -> Result<Value, ToolError> {
    let body = args.str("body_text").unwrap_or_default();
    let button = args.str("button_text").unwrap_or_default();
    let sections = non_empty_array(args.raw("sections"), "sections must be a non-empty array")?;

    let mut total = 0usize;
    let mut out = Vec::with_capacity(sections.len());
    for (s_idx, section) in sections.iter().enumerate() {
        let rows = non_empty_array(
            section.get("rows"),
            "Each section must be an object with a non-empty 'rows' array",
        )?;

        let mut wa_rows = Vec::with_capacity(rows.len());
        for (r_idx, row) in rows.iter().enumerate() {
            let title = title_of(row).ok_or_else(|| {
                ToolError::new("Each row must be an object with at least a non-empty 'title' field")
            })?;
            let id = id_of(row).unwrap_or_else(|| format!("row_{}_{}", s_idx + 1, r_idx + 1));
            let mut wa_row = json!({ "id": id, "title": title });
            if let (Some(desc), Some(obj)) = (row.get("description").and_then(scalar), wa_row.as_object_mut()) {
                obj.insert("description".into(), json!(desc));
            }
            wa_rows.push(wa_row);

            total += 1;
            if total > MAX_LIST_ROWS {
                return Err(ToolError::new(format!(
                    "List messages support at most {MAX_LIST_ROWS} total rows across all sections"
                )));
            }
        }

        let mut wa_section = json!({ "rows": wa_rows });
        if let (Some(title), Some(obj)) = (section.get("title").and_then(scalar), wa_section.as_object_mut()) {
            obj.insert("title".into(), json!(title));
        }
        out.push(wa_section);
    }

    let mut interactive = json!({
        "type": "list",
        "body": { "text": body },
        "action": { "button": button, "sections": out },
    });
    decorate(&mut interactive, args);
    Ok(interactive)
}

fn decorate(interactive: &mut Value, args: Args<'_>) {
    let Some(obj) = interactive.as_object_mut() else { return };
    if let Some(header) = args.str("header_text") {
        obj.insert("header".into(), json!({ "type": "text", "text": header }));
    }
    if let Some(footer) = args.str("footer_text") {
        obj.insert("footer".into(), json!({ "text": footer }));
    }
}

fn non_empty_array<'a>(value: Option<&'a Value>, message: &str) -> Result<&'a Vec<Value>, ToolError> {
    value
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ToolError::new(message))
}

fn title_of(item: &Value) -> Option<String> {
    item.as_object()?.get("title").and_then(scalar)
}

fn id_of(item: &Value) -> Option<String> {
    item.as_object()?.get("id").and_then(scalar)
}

async fn send(call: &Call<'_>, phone: &str, payload: &Value) -> Result<Value, ToolError> {
    call.graph.post_json(call.token, &format!("{phone}/messages"), payload).await
}

pub async fn send_message(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = call.phone_number_id()?;
    let [to, text] = args.required(["to_number", "text"])?;
    let reply_to = args.str("message_id").or_else(|| args.str("reply_to_message_id"));
    let payload = text_message(&to, &text, args.flag("preview_url"), reply_to.as_deref());
    send(call, phone, &payload).await
}

pub async fn send_reply(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = call.phone_number_id()?;
    let [to, text, reply_to] = args.required(["to_number", "text", "reply_to_message_id"])?;
    let payload = text_message(&to, &text, args.flag("preview_url"), Some(&reply_to));
    send(call, phone, &payload).await
}

pub async fn send_template_message(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = call.phone_number_id()?;
    let [to, name] = args.required(["to_number", "template_name"])?;
    let language = args.str("language_code").unwrap_or_else(|| DEFAULT_TEMPLATE_LANGUAGE.to_owned());
    let payload = template_message(&to, &name, &language, args.value("components"));
    send(call, phone, &payload).await
}

/// Media by public link. A `phone_number_id` argument overrides the configured sender.
pub async fn send_media(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = match args.str("phone_number_id") {
        Some(id) => id,
        None => call.phone_number_id()?.to_owned(),
    };
    let [to, media_type, link] = args.required(["to_number", "media_type", "link"])?;
    let media_type = MediaType::parse(&media_type)?;
    let caption = args.str("caption");
    let extras = MediaExtras { caption: caption.as_deref(), filename: None };
    let payload = media_message(&to, media_type, MediaSource::Link(&link), extras, None);
    send(call, &phone, &payload).await
}

pub async fn send_media_by_id(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = call.phone_number_id()?;
    let [to, media_type, media_id] = args.required(["to_number", "media_type", "media_id"])?;
    let media_type = MediaType::parse(&media_type)?;
    let (caption, filename) = (args.str("caption"), args.str("filename"));
    let extras = MediaExtras { caption: caption.as_deref(), filename: filename.as_deref() };
    let reply_to = args.str("reply_to_message_id");
    let payload = media_message(&to, media_type, MediaSource::Id(&media_id), extras, reply_to.as_deref());
    send(call, phone, &payload).await
}

pub async fn send_contacts(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = call.phone_number_id()?;
    args.check(&["to_number", "contacts"])?;
    let to = args.str("to_number").unwrap_or_default();
    let contacts = non_empty_array(args.raw("contacts"), "contacts must be a non-empty array")?;
    send(call, phone, &contacts_message(&to, contacts)).await
}

pub async fn send_location(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = call.phone_number_id()?;
    let [to, _, _, name, address] =
        args.required(["to_number", "latitude", "longitude", "name", "address"])?;
    let (Some(latitude), Some(longitude)) = (args.float("latitude"), args.float("longitude")) else {
        return Err(ToolError::new("latitude and longitude must be valid numbers"));
    };
    send(call, phone, &location_message(&to, latitude, longitude, &name, &address)).await
}

pub async fn send_interactive_buttons(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = call.phone_number_id()?;
    let [to, _, _] = args.required(["to_number", "body_text", "buttons"])?;
    let interactive = buttons_interactive(args)?;
    let reply_to = args.str("reply_to_message_id");
    send(call, phone, &envelope(&to, "interactive", interactive, reply_to.as_deref())).await
}

pub async fn send_interactive_list(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = call.phone_number_id()?;
    let [to, _, _, _] = args.required(["to_number", "body_text", "button_text", "sections"])?;
    let interactive = list_interactive(args)?;
    let reply_to = args.str("reply_to_message_id");
    send(call, phone, &envelope(&to, "interactive", interactive, reply_to.as_deref())).await
}

#[cfg(test)]
#[path = "messaging_tests.rs"]
mod tests;
