// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message template management on the business account.

use serde_json::{json, Value};

use crate::tools::args::Args;
use crate::tools::{Call, ToolError};

const TEMPLATE_FIELDS: &str = "id,name,status,category,language";
const LIST_FILTERS: [&str; 5] = ["after", "category", "language", "name_or_content", "status"];
pub const DEFAULT_LIMIT: i64 = 25;

pub async fn create_template(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let waba = call.business_account_id()?;

    // Presence only: an empty components array is the provider's call to reject.
    let fields = ["name", "language", "category", "components"];
    let missing: Vec<&str> = fields.iter().copied().filter(|k| !args.has(k)).collect();
    if !missing.is_empty() {
        return Err(ToolError::new(format!("Missing required parameter(s): {}", missing.join(", "))));
    }

    let mut body = serde_json::Map::new();
    for key in fields {
        body.insert(key.to_owned(), args.raw(key).cloned().unwrap_or(Value::Null));
    }
    call.graph
        .post_json(call.token, &format!("{waba}/message_templates"), &Value::Object(body))
        .await
}

/// Resolve the template name (best effort), then delete by `hsm_id` and name.
pub async fn delete_template(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let waba = call.business_account_id()?;
    let [template_id] = args.required(["template_id"])?;

    let template_name = call
        .graph
        .get_optional(call.token, &template_id, &[("fields", "name".to_owned())])
        .await
        .and_then(|v| v.get("name").and_then(Value::as_str).map(str::to_owned))
        .filter(|n| !n.is_empty());

    let mut query = vec![("hsm_id", template_id.clone())];
    if let Some(ref name) = template_name {
        query.push(("name", name.clone()));
    }
    let response = call.graph.delete(call.token, &format!("{waba}/message_templates"), &query).await?;

    Ok(json!({
        "template_id": template_id,
        "template_name": template_name,
        "response": response,
    }))
}

pub async fn list_templates(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let waba = call.business_account_id()?;

    let mut query: Vec<(&str, String)> =
        LIST_FILTERS.into_iter().filter_map(|k| args.str(k).map(|v| (k, v))).collect();
    query.push(("limit", args.int_or("limit", DEFAULT_LIMIT).to_string()));

    let payload = call.graph.get(call.token, &format!("{waba}/message_templates"), &query).await?;
    Ok(paged(payload))
}

pub async fn template_status(call: &Call<'_>, args: Args<'_>) -> Result<Value, ToolError> {
    let [template_id] = args.required(["template_id"])?;
    let fields = args.str("fields").unwrap_or_else(|| TEMPLATE_FIELDS.to_owned());
    call.graph.get(call.token, &template_id, &[("fields", fields)]).await
}

/// Reduce a collection response to `{data, paging}`.
pub fn paged(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => json!({
            "data": map.remove("data").unwrap_or(Value::Null),
            "paging": map.remove("paging").unwrap_or(Value::Null),
        }),
        other => json!({ "data": other, "paging": null }),
    }
}

#[cfg(test)]
#[path = "templates_tests.rs"]
mod tests;
