//! Builder calls described as JSON.
//!
//! A recipe is an array of steps, each tagged by `op`:
//!
//! ```json
//! [
//!   {"op": "filter", "condition": {"status": "active"}},
//!   {"op": "keywordFilter", "keyword": "abc", "fields": ["title", "desc"]},
//!   {"op": "lookup", "from": "orders", "localField": "user_id",
//!    "foreignField": "userId", "as": "orders", "options": {"exposes": ["total"]}},
//!   {"op": "unwind", "field": "orders"},
//!   {"op": "sort", "spec": {"createdAt": -1}},
//!   {"op": "skip", "n": 20},
//!   {"op": "limit", "n": 10},
//!   {"op": "expose", "fields": ["name", "orders"]}
//! ]
//! ```

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::builder::PipelineBuilder;
use crate::config::BuilderConfig;
use crate::error::{Error, Result};
use crate::lookup::LookupOptions;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    Filter {
        condition: Value,
    },
    KeywordFilter {
        keyword: String,
        fields: Vec<String>,
    },
    Lookup {
        from: String,
        local_field: String,
        foreign_field: String,
        #[serde(rename = "as")]
        alias: String,
        #[serde(default)]
        options: Option<LookupOptions>,
    },
    Unwind {
        field: String,
    },
    Sort {
        spec: Value,
    },
    Skip {
        n: i64,
    },
    Limit {
        n: i64,
    },
    Expose {
        fields: Vec<String>,
    },
}

/// Parse a recipe array.
pub fn parse(recipe: &Value) -> Result<Vec<Step>> {
    let arr = recipe
        .as_array()
        .ok_or_else(|| Error::InvalidRecipe("recipe must be an array".into()))?;
    arr.iter()
        .enumerate()
        .map(|(i, step)| parse_step(step).map_err(|e| prefix(i, e)))
        .collect()
}

/// Parse a single step object.
pub fn parse_step(step: &Value) -> Result<Step> {
    if step.get("op").and_then(|v| v.as_str()).is_none() {
        return Err(Error::InvalidRecipe("step requires an 'op' string".into()));
    }
    serde_json::from_value(step.clone()).map_err(|e| Error::InvalidRecipe(e.to_string()))
}

/// Replay steps onto a builder, in order.
pub fn apply(builder: &mut PipelineBuilder, steps: &[Step]) {
    for step in steps {
        apply_step(builder, step);
    }
}

pub fn apply_step(builder: &mut PipelineBuilder, step: &Step) {
    debug!(?step, "applying recipe step");
    match step {
        Step::Filter { condition } => {
            builder.filter(condition.clone());
        }
        Step::KeywordFilter { keyword, fields } => {
            builder.keyword_filter(keyword, fields.as_slice());
        }
        Step::Lookup {
            from,
            local_field,
            foreign_field,
            alias,
            options,
        } => {
            builder.lookup(from, local_field, foreign_field, alias, options.as_ref());
        }
        Step::Unwind { field } => {
            builder.unwind(field);
        }
        Step::Sort { spec } => {
            builder.sort(spec.clone());
        }
        Step::Skip { n } => {
            builder.skip(*n);
        }
        Step::Limit { n } => {
            builder.limit(*n);
        }
        Step::Expose { fields } => builder.expose(fields.as_slice()),
    }
}

/// Parse and replay a recipe on a fresh builder.
pub fn build(recipe: &Value, config: BuilderConfig) -> Result<Vec<Value>> {
    let steps = parse(recipe)?;
    let mut builder = PipelineBuilder::with_config(config);
    apply(&mut builder, &steps);
    Ok(builder.into_stages())
}

fn prefix(i: usize, e: Error) -> Error {
    match e {
        Error::InvalidRecipe(msg) => Error::InvalidRecipe(format!("step {i}: {msg}")),
        other => other,
    }
}
