use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::BuilderConfig;
use crate::document::{field_ref, include_projection, regex_condition, stage, Stage};
use crate::lookup::{lookup_stage, LookupOptions};

/// Incrementally assembles an aggregation pipeline.
///
/// Stages come out in the order the methods were called. The one exception
/// is `$match`: [`filter`](Self::filter) and
/// [`keyword_filter`](Self::keyword_filter) write into the first `$match`
/// stage when there is one, keeping its original position.
///
/// No method ever fails. Malformed inputs are passed through and only
/// surface when the pipeline is executed.
///
/// ```
/// use querymaker::PipelineBuilder;
/// use serde_json::json;
///
/// let mut builder = PipelineBuilder::new();
/// builder
///     .filter(json!({"status": "active"}))
///     .lookup("orders", "user_id", "userId", "orders", None)
///     .sort(json!({"createdAt": -1}))
///     .skip(20)
///     .limit(10);
/// builder.expose(&["name", "orders"]);
///
/// assert_eq!(builder.get().len(), 6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
    config: BuilderConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Set the match condition. An existing `$match` is replaced outright,
    /// not merged: the last call wins.
    pub fn filter(&mut self, condition: Value) -> &mut Self {
        match self.match_body_mut() {
            Some(body) => {
                debug!("replacing $match condition");
                *body = condition;
            }
            None => self.push(stage("$match", condition)),
        }
        self
    }

    /// Case-insensitive regex search for `keyword`.
    ///
    /// With one field the condition is stored under that field's key in the
    /// `$match`, but the regex itself sits under a fixed `name` key:
    /// `{field: {"name": {"$regex": ..}}}`. Callers rely on this shape so it
    /// is kept as is.
    ///
    /// With several fields the per-field regexes are ORed. If the `$match`
    /// already holds an `$or`, the whole existing condition is ANDed with the
    /// new group so repeated searches narrow the result.
    pub fn keyword_filter<S: AsRef<str>>(&mut self, keyword: &str, fields: &[S]) -> &mut Self {
        if fields.is_empty() {
            return self;
        }

        let regex = regex_condition(
            &self.config.keyword_pattern(keyword),
            &self.config.keyword_options,
        );

        if let [field] = fields {
            let field = field.as_ref();
            let condition = json!({"name": regex});
            match self.match_body_mut() {
                Some(Value::Object(map)) => {
                    map.insert(field.to_string(), condition);
                }
                Some(body) => {
                    let mut keyword = Map::new();
                    keyword.insert(field.to_string(), condition);
                    and_with(body, Value::Object(keyword));
                }
                None => {
                    let mut body = Map::new();
                    body.insert(field.to_string(), condition);
                    self.push(stage("$match", Value::Object(body)));
                }
            }
            debug!(field, "keyword filter on single field");
            return self;
        }

        let any_of: Vec<Value> = fields
            .iter()
            .map(|f| {
                let mut cond = Map::new();
                cond.insert(f.as_ref().to_string(), regex.clone());
                Value::Object(cond)
            })
            .collect();

        match self.match_body_mut() {
            Some(Value::Object(map)) if !map.contains_key("$or") => {
                map.insert("$or".to_string(), Value::Array(any_of));
            }
            Some(body) => and_with(body, json!({"$or": any_of})),
            None => self.push(stage("$match", json!({"$or": any_of}))),
        }
        debug!(fields = fields.len(), "keyword filter on multiple fields");
        self
    }

    /// Append a `$lookup`. See [`LookupOptions`] for when the correlated
    /// `let`/`pipeline` form is produced instead of a plain equi-join.
    pub fn lookup(
        &mut self,
        from: &str,
        local_field: &str,
        foreign_field: &str,
        alias: &str,
        opts: Option<&LookupOptions>,
    ) -> &mut Self {
        let default_opts = LookupOptions::default();
        let opts = opts.unwrap_or(&default_opts);
        let lookup = lookup_stage(
            from,
            local_field,
            foreign_field,
            alias,
            opts,
            &self.config.soft_delete_field,
        );
        self.push(lookup);
        self
    }

    /// Documents with a missing, null or empty array are always kept.
    pub fn unwind(&mut self, field: &str) -> &mut Self {
        self.push(stage(
            "$unwind",
            json!({
                "path": field_ref(field),
                "preserveNullAndEmptyArrays": true,
            }),
        ));
        self
    }

    pub fn sort(&mut self, spec: Value) -> &mut Self {
        self.push(stage("$sort", spec));
        self
    }

    /// Zero or negative counts add nothing.
    pub fn skip(&mut self, n: i64) -> &mut Self {
        if n > 0 {
            self.push(stage("$skip", json!(n)));
        }
        self
    }

    /// Zero or negative counts add nothing.
    pub fn limit(&mut self, n: i64) -> &mut Self {
        if n > 0 {
            self.push(stage("$limit", json!(n)));
        }
        self
    }

    /// Append the final inclusion `$project`. Ends a call chain.
    pub fn expose<S: AsRef<str>>(&mut self, fields: &[S]) {
        self.push(stage("$project", include_projection(fields)));
    }

    /// Stages accumulated so far.
    pub fn get(&self) -> &[Stage] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<Stage> {
        self.stages
    }

    /// The pipeline as a JSON array, ready for an aggregate call.
    pub fn to_value(&self) -> Value {
        Value::Array(self.stages.clone())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn push(&mut self, stage: Stage) {
        if let Some(op) = crate::document::operator(&stage) {
            debug!(stage = op, position = self.stages.len(), "appending stage");
        }
        self.stages.push(stage);
    }

    /// Body of the first `$match` stage.
    fn match_body_mut(&mut self) -> Option<&mut Value> {
        self.stages
            .iter_mut()
            .find_map(|s| s.as_object_mut().and_then(|m| m.get_mut("$match")))
    }
}

/// Replace `body` with `{"$and": [body, other]}`.
fn and_with(body: &mut Value, other: Value) {
    let existing = std::mem::take(body);
    *body = json!({"$and": [existing, other]});
}
