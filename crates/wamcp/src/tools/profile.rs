// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Business profile and phone number lookups.

use serde_json::Value;

use crate::tools::args::Args;
use crate::tools::templates::{paged, DEFAULT_LIMIT};
use crate::tools::{Call, ToolError};

const PROFILE_FIELDS: &str = "about,address,description,email,profile_picture_url,websites,vertical";
const PHONE_FIELDS: &str = "id,display_phone_number,verified_name,code_verification_status,\
quality_rating,platform_type,throughput,webhook_configuration,last_onboarded_time";

pub async fn business_profile(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = call.phone_number_id()?;
    let fields = args.str("fields").unwrap_or_else(|| PROFILE_FIELDS.to_owned());
    call.graph
        .get(call.token, &format!("{phone}/whatsapp_business_profile"), &[("fields", fields)])
        .await
}

/// Details for the given phone number id, or the configured one.
pub async fn phone_number(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let phone = match args.str("phone_number_id") {
        Some(id) => id,
        None => call.phone_number_id().map(str::to_owned).map_err(|_| {
            ToolError::new("Missing phone_number_id. Provide it or set WHATSAPP_PHONE_NUMBER_ID")
        })?,
    };
    let fields = args.str("fields").unwrap_or_else(|| PHONE_FIELDS.to_owned());
    call.graph.get(call.token, &phone, &[("fields", fields)]).await
}

pub async fn phone_numbers(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let waba = call.business_account_id()?;
    let limit = args.int_or("limit", DEFAULT_LIMIT).to_string();
    let payload = call.graph.get(call.token, &format!("{waba}/phone_numbers"), &[("limit", limit)]).await?;
    Ok(paged(payload))
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
