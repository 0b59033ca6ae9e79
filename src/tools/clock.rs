//! Current time tool - reports the wall clock at a fixed UTC offset

use super::{Tool, ToolContext, ToolError};
use crate::ui::{CardField, Fragment};
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

pub struct CurrentTimeTool;

#[derive(Debug, Deserialize)]
struct CurrentTimeInput {
    #[serde(default)]
    utc_offset_hours: i32,
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &'static str {
        "current_time"
    }

    fn description(&self) -> String {
        "Get the current date and time. Pass utc_offset_hours for a local time; omit it for UTC."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "utc_offset_hours": {
                    "type": "integer",
                    "description": "Offset from UTC in whole hours, between -12 and 14"
                }
            }
        })
    }

    async fn run(&self, parameters: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        ctx.side.append(Fragment::loading("Checking the clock")).await;

        let input: CurrentTimeInput = serde_json::from_value(parameters)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let offset = (-12..=14)
            .contains(&input.utc_offset_hours)
            .then(|| FixedOffset::east_opt(input.utc_offset_hours * 3600))
            .flatten()
            .ok_or_else(|| {
                ToolError::InvalidInput(format!(
                    "utc_offset_hours must be between -12 and 14, got {}",
                    input.utc_offset_hours
                ))
            })?;

        let now = Utc::now().with_timezone(&offset);
        let iso = now.to_rfc3339();

        ctx.side
            .update(
                Fragment::card(
                    now.format("%H:%M").to_string(),
                    vec![
                        CardField::new("Date", now.format("%A, %B %-d, %Y").to_string()),
                        CardField::new("Offset", offset.to_string()),
                    ],
                )
                .with_subtitle("Current time"),
            )
            .await;

        Ok(json!({
            "iso": iso,
            "utc_offset_hours": input.utc_offset_hours,
        }))
    }
}
