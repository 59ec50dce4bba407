// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Media upload and lookup.

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

use crate::tools::args::Args;
use crate::tools::{Call, ToolError};

const MEDIA_INFO_FIELDS: &str = "id,mime_type,sha256,file_size";

/// Media kinds accepted by the messages and media endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

impl MediaType {
    /// Case-insensitive, whitespace-tolerant parse.
    pub fn parse(s: &str) -> Result<Self, ToolError> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "document" => Ok(Self::Document),
            "sticker" => Ok(Self::Sticker),
            _ => Err(ToolError::new("media_type must be one of: image, video, audio, document, sticker")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Sticker => "sticker",
        }
    }

    pub fn allows_caption(&self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Document)
    }

    pub fn allows_filename(&self) -> bool {
        matches!(self, Self::Document)
    }

    /// Content type used when neither an override nor a guess is available.
    pub fn fallback_mime(&self) -> &'static str {
        match self {
            Self::Sticker => "image/webp",
            _ => "application/octet-stream",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload a local file as multipart form data.
pub async fn upload_media(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = call.phone_number_id()?;

    let file = args.object("file_to_upload");
    let (Some(media_type), Some(path)) = (args.str("media_type"), file.str("path")) else {
        return Err(ToolError::new("Missing required parameter(s): media_type and file_to_upload.path"));
    };
    let media_type = MediaType::parse(&media_type)?;

    let path = absolute(Path::new(&path))?;
    let is_file = tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file());
    if !is_file {
        return Err(ToolError::new(format!("File not found: {}", path.display())));
    }

    let filename = file.str("filename").unwrap_or_else(|| {
        path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    });
    let mime = upload_mime(media_type, &filename, file.str("mime_type"));

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ToolError::new(format!("Unexpected error: {e}")))?;
    debug!(path = %path.display(), %mime, size = bytes.len(), "uploading media");

    let part = Part::bytes(bytes)
        .file_name(filename)
        .mime_str(&mime)
        .map_err(|e| ToolError::new(format!("Unexpected error: {e}")))?;
    let form = Form::new()
        .text("messaging_product", "whatsapp")
        .text("type", mime)
        .part("file", part);

    call.graph.upload(call.token, &format!("{phone}/media"), form).await
}

pub async fn get_media(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let [media_id] = args.required(["media_id"])?;
    call.graph.get(call.token, &media_id, &[]).await
}

/// Media metadata with any download `url` removed.
pub async fn get_media_info(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let [media_id] = args.required(["media_id"])?;
    let mut data = call
        .graph
        .get(call.token, &media_id, &[("fields", MEDIA_INFO_FIELDS.to_owned())])
        .await?;
    if let Some(map) = data.as_object_mut() {
        map.remove("url");
    }
    Ok(data)
}

/// Explicit override, else guessed from the filename, else the type's fallback.
pub fn upload_mime(media_type: MediaType, filename: &str, explicit: Option<String>) -> String {
    explicit
        .or_else(|| mime_guess::from_path(filename).first().map(|m| m.essence_str().to_owned()))
        .unwrap_or_else(|| media_type.fallback_mime().to_owned())
}

fn absolute(path: &Path) -> Result<PathBuf, ToolError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| ToolError::new(format!("Unexpected error: {e}")))
}

#[cfg(test)]
#[path = "media_tests.rs"]
mod tests;
