//! Structural check of built stages.
//!
//! The builder never validates what it emits. Callers that want an early
//! error before handing a pipeline to the database can run [`validate`]
//! on the output of [`PipelineBuilder::get`](crate::PipelineBuilder::get).
//! Only the shape of each stage is checked, never the documents it will see.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Check every stage of a pipeline.
pub fn validate(stages: &[Value]) -> Result<()> {
    for (i, stage_val) in stages.iter().enumerate() {
        validate_stage(stage_val).map_err(|e| match e {
            Error::InvalidPipeline(msg) => Error::InvalidPipeline(format!("stage {i}: {msg}")),
            other => other,
        })?;
    }
    Ok(())
}

/// Check a pipeline given as a JSON array.
pub fn validate_value(pipeline_json: &Value) -> Result<()> {
    let arr = pipeline_json
        .as_array()
        .ok_or_else(|| Error::InvalidPipeline("pipeline must be an array".into()))?;
    validate(arr)
}

fn validate_stage(stage_val: &Value) -> Result<()> {
    let obj = stage_val.as_object().ok_or_else(|| {
        Error::InvalidPipeline("each pipeline stage must be an object".into())
    })?;
    let mut entries = obj.iter();
    let (stage_name, stage_body) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(Error::InvalidPipeline(
                "each pipeline stage must have exactly one key".into(),
            ))
        }
    };

    match stage_name.as_str() {
        "$match" => {
            if stage_body.is_null() {
                return Err(Error::InvalidPipeline("$match must not be null".into()));
            }
            Ok(())
        }
        "$sort" => {
            let obj = stage_body
                .as_object()
                .ok_or_else(|| Error::InvalidPipeline("$sort must be an object".into()))?;
            if obj.is_empty() {
                return Err(Error::InvalidPipeline("$sort must name at least one field".into()));
            }
            Ok(())
        }
        "$skip" => positive_count(stage_body, "$skip"),
        "$limit" => positive_count(stage_body, "$limit"),
        "$project" => {
            stage_body
                .as_object()
                .ok_or_else(|| Error::InvalidPipeline("$project must be an object".into()))?;
            Ok(())
        }
        "$unwind" => validate_unwind(stage_body),
        "$lookup" => {
            let obj = stage_body.as_object().ok_or_else(|| {
                Error::InvalidPipeline("$lookup must be an object".into())
            })?;
            validate_lookup(obj)
        }
        _ => Err(Error::InvalidPipeline(format!(
            "unknown stage: {}",
            stage_name
        ))),
    }
}

fn positive_count(val: &Value, name: &str) -> Result<()> {
    match val.as_u64() {
        Some(n) if n > 0 => Ok(()),
        _ => Err(Error::InvalidPipeline(format!(
            "{name} must be a positive integer"
        ))),
    }
}

fn validate_unwind(val: &Value) -> Result<()> {
    let path = match val {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => obj
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidPipeline("$unwind requires 'path' string".into()))?,
        _ => {
            return Err(Error::InvalidPipeline(
                "$unwind must be a string or object".into(),
            ))
        }
    };
    if !path.starts_with('$') {
        return Err(Error::InvalidPipeline(
            "$unwind path must start with $".into(),
        ));
    }
    Ok(())
}

fn require_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    obj.get(key).and_then(|v| v.as_str()).ok_or_else(|| {
        Error::InvalidPipeline(format!("$lookup requires '{key}' string"))
    })
}

fn validate_lookup(obj: &Map<String, Value>) -> Result<()> {
    require_str(obj, "from")?;
    require_str(obj, "as")?;

    match obj.get("pipeline") {
        None => {
            require_str(obj, "localField")?;
            require_str(obj, "foreignField")?;
            Ok(())
        }
        Some(sub) => {
            let sub = sub.as_array().ok_or_else(|| {
                Error::InvalidPipeline("$lookup 'pipeline' must be an array".into())
            })?;
            if let Some(vars) = obj.get("let") {
                if !vars.is_object() {
                    return Err(Error::InvalidPipeline(
                        "$lookup 'let' must be an object".into(),
                    ));
                }
            }
            validate(sub).map_err(|e| match e {
                Error::InvalidPipeline(msg) => {
                    Error::InvalidPipeline(format!("$lookup pipeline: {msg}"))
                }
                other => other,
            })
        }
    }
}
