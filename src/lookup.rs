use serde::Deserialize;
use serde_json::{Value, json};

use crate::document::{field_ref, include_projection, let_var_name, stage, var_ref, Stage};

/// Options for [`PipelineBuilder::lookup`](crate::PipelineBuilder::lookup).
///
/// Leaving both `exposes` and `pipeline` empty selects the plain equi-join
/// form; any of the other options then has no effect.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LookupOptions {
    /// Extra `$expr` condition ANDed into the joined collection's match.
    pub filter: Option<Value>,
    /// Stages appended verbatim after the join match.
    pub pipeline: Vec<Value>,
    /// Join only soft-deleted documents instead of live ones.
    pub from_trash: bool,
    /// Fields kept by a trailing inclusion `$project`.
    pub exposes: Vec<String>,
    /// Local field holds an array; join with `$in` instead of `$eq`.
    pub is_array: bool,
}

impl LookupOptions {
    fn is_correlated(&self) -> bool {
        !self.exposes.is_empty() || !self.pipeline.is_empty()
    }

    fn extra_filter(&self) -> Option<&Value> {
        match &self.filter {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(filter) => Some(filter),
        }
    }
}

/// `$expr` condition selecting live (or, with `from_trash`, trashed) documents.
pub fn soft_delete_condition(field: &str, from_trash: bool) -> Value {
    let path = field_ref(field);
    if from_trash {
        json!({"$and": [
            {"$ne": [path, null]},
            {"$ne": [{"$type": path}, "missing"]},
        ]})
    } else {
        json!({"$or": [
            {"$eq": [{"$type": path}, "missing"]},
            {"$eq": [{"$type": path}, "null"]},
        ]})
    }
}

pub(crate) fn lookup_stage(
    from: &str,
    local_field: &str,
    foreign_field: &str,
    alias: &str,
    opts: &LookupOptions,
    soft_delete_field: &str,
) -> Stage {
    if !opts.is_correlated() {
        return stage(
            "$lookup",
            json!({
                "from": from,
                "localField": local_field,
                "foreignField": foreign_field,
                "as": alias,
            }),
        );
    }

    let var = let_var_name(local_field);
    let join_op = if opts.is_array { "$in" } else { "$eq" };

    let mut conditions = vec![json!({join_op: [field_ref(foreign_field), var_ref(&var)]})];
    if let Some(filter) = opts.extra_filter() {
        conditions.push(filter.clone());
    }
    conditions.push(soft_delete_condition(soft_delete_field, opts.from_trash));

    let mut sub_pipeline = Vec::with_capacity(opts.pipeline.len() + 2);
    sub_pipeline.push(stage("$match", json!({"$expr": {"$and": conditions}})));
    sub_pipeline.extend(opts.pipeline.iter().cloned());
    if !opts.exposes.is_empty() {
        sub_pipeline.push(stage("$project", include_projection(opts.exposes.as_slice())));
    }

    stage(
        "$lookup",
        json!({
            "from": from,
            "let": {var: field_ref(local_field)},
            "pipeline": sub_pipeline,
            "as": alias,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(opts: &LookupOptions) -> Value {
        lookup_stage("orders", "user_id", "userId", "orders", opts, "deletedAt")
    }

    #[test]
    fn plain_lookup_without_options() {
        let s = build(&LookupOptions::default());
        assert_eq!(
            s,
            json!({"$lookup": {
                "from": "orders",
                "localField": "user_id",
                "foreignField": "userId",
                "as": "orders",
            }})
        );
    }

    #[test]
    fn plain_lookup_ignores_filter_and_trash() {
        let opts = LookupOptions {
            filter: Some(json!({"$eq": ["$status", "paid"]})),
            from_trash: true,
            is_array: true,
            ..Default::default()
        };
        let body = &build(&opts)["$lookup"];
        assert!(body.get("let").is_none());
        assert!(body.get("pipeline").is_none());
        assert_eq!(body["localField"], "user_id");
    }

    #[test]
    fn correlated_lookup_with_exposes() {
        let opts = LookupOptions {
            exposes: vec!["total".into()],
            ..Default::default()
        };
        assert_eq!(
            build(&opts),
            json!({"$lookup": {
                "from": "orders",
                "let": {"userid_tmp": "$user_id"},
                "pipeline": [
                    {"$match": {"$expr": {"$and": [
                        {"$eq": ["$userId", "$$userid_tmp"]},
                        {"$or": [
                            {"$eq": [{"$type": "$deletedAt"}, "missing"]},
                            {"$eq": [{"$type": "$deletedAt"}, "null"]},
                        ]},
                    ]}}},
                    {"$project": {"total": 1}},
                ],
                "as": "orders",
            }})
        );
    }

    #[test]
    fn correlated_key_order() {
        let opts = LookupOptions {
            exposes: vec!["total".into()],
            ..Default::default()
        };
        let s = build(&opts);
        let keys: Vec<&String> = s["$lookup"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["from", "let", "pipeline", "as"]);
    }

    #[test]
    fn from_trash_flips_soft_delete() {
        let opts = LookupOptions {
            exposes: vec!["total".into()],
            from_trash: true,
            ..Default::default()
        };
        let conditions = &build(&opts)["$lookup"]["pipeline"][0]["$match"]["$expr"]["$and"];
        assert_eq!(
            conditions[1],
            json!({"$and": [
                {"$ne": ["$deletedAt", null]},
                {"$ne": [{"$type": "$deletedAt"}, "missing"]},
            ]})
        );
    }

    #[test]
    fn is_array_uses_in() {
        let opts = LookupOptions {
            exposes: vec!["name".into()],
            is_array: true,
            ..Default::default()
        };
        let conditions = &build(&opts)["$lookup"]["pipeline"][0]["$match"]["$expr"]["$and"];
        assert_eq!(conditions[0], json!({"$in": ["$userId", "$$userid_tmp"]}));
    }

    #[test]
    fn filter_and_extra_pipeline() {
        let opts = LookupOptions {
            filter: Some(json!({"$eq": ["$status", "paid"]})),
            pipeline: vec![json!({"$sort": {"createdAt": -1}}), json!({"$limit": 1})],
            ..Default::default()
        };
        let body = &build(&opts)["$lookup"];
        let conditions = body["pipeline"][0]["$match"]["$expr"]["$and"].as_array().unwrap();
        assert_eq!(conditions.len(), 3);
        assert_eq!(conditions[1], json!({"$eq": ["$status", "paid"]}));

        let stages = body["pipeline"].as_array().unwrap();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[1], json!({"$sort": {"createdAt": -1}}));
        assert_eq!(stages[2], json!({"$limit": 1}));
    }

    #[test]
    fn empty_filter_is_skipped() {
        let opts = LookupOptions {
            filter: Some(json!({})),
            exposes: vec!["a".into()],
            ..Default::default()
        };
        let conditions = &build(&opts)["$lookup"]["pipeline"][0]["$match"]["$expr"]["$and"];
        assert_eq!(conditions.as_array().unwrap().len(), 2);
    }

    #[test]
    fn custom_soft_delete_field() {
        assert_eq!(
            soft_delete_condition("removedAt", false)["$or"][0],
            json!({"$eq": [{"$type": "$removedAt"}, "missing"]})
        );
    }

    #[test]
    fn options_from_json() {
        let opts: LookupOptions = serde_json::from_value(json!({
            "fromTrash": true,
            "exposes": ["a", "b"],
            "isArray": true,
        }))
        .unwrap();
        assert!(opts.from_trash);
        assert!(opts.is_array);
        assert_eq!(opts.exposes, ["a", "b"]);
        assert!(opts.filter.is_none());
        assert!(opts.pipeline.is_empty());
    }
}
