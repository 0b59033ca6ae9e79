//! Dice tool - rolls N dice with S sides and renders the rolls as a table

use super::{Tool, ToolContext, ToolError};
use crate::ui::Fragment;
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

const MAX_SIDES: u32 = 1000;
const MAX_COUNT: u32 = 20;

pub struct RollDiceTool;

#[derive(Debug, Deserialize)]
struct RollDiceInput {
    #[serde(default = "default_sides")]
    sides: u32,
    #[serde(default = "default_count")]
    count: u32,
}

fn default_sides() -> u32 {
    6
}

fn default_count() -> u32 {
    1
}

fn roll(sides: u32, count: u32) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen_range(1..=sides)).collect()
}

#[async_trait]
impl Tool for RollDiceTool {
    fn name(&self) -> &'static str {
        "roll_dice"
    }

    fn description(&self) -> String {
        format!(
            "Roll one or more fair dice. sides defaults to 6 (max {MAX_SIDES}), count defaults to 1 (max {MAX_COUNT})."
        )
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sides": {
                    "type": "integer",
                    "description": "Number of faces on each die"
                },
                "count": {
                    "type": "integer",
                    "description": "How many dice to roll"
                }
            }
        })
    }

    async fn run(&self, parameters: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        let input: RollDiceInput = serde_json::from_value(parameters)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        if !(2..=MAX_SIDES).contains(&input.sides) {
            return Err(ToolError::InvalidInput(format!(
                "sides must be between 2 and {MAX_SIDES}"
            )));
        }
        if !(1..=MAX_COUNT).contains(&input.count) {
            return Err(ToolError::InvalidInput(format!(
                "count must be between 1 and {MAX_COUNT}"
            )));
        }

        ctx.side
            .append(Fragment::loading(format!("Rolling {}d{}", input.count, input.sides)))
            .await;

        // ThreadRng is not Send; finish with it before the next await
        let rolls = roll(input.sides, input.count);
        let total: u32 = rolls.iter().sum();

        let mut rows: Vec<Vec<String>> = rolls
            .iter()
            .enumerate()
            .map(|(i, value)| vec![format!("#{}", i + 1), value.to_string()])
            .collect();
        rows.push(vec!["Total".to_string(), total.to_string()]);

        ctx.side
            .update(Fragment::Table {
                columns: vec!["Die".to_string(), format!("d{}", input.sides)],
                rows,
            })
            .await;

        Ok(json!({
            "sides": input.sides,
            "rolls": rolls,
            "total": total,
        }))
    }
}
