use serde_json::{Map, Value, json};

/// A single pipeline stage: a one-key object such as `{"$match": {...}}`.
pub type Stage = Value;

/// Wrap a stage body under its operator name.
pub fn stage(operator: &str, body: Value) -> Stage {
    let mut map = Map::new();
    map.insert(operator.to_string(), body);
    Value::Object(map)
}

/// Operator name of a stage, if it is a well-formed one-key object.
pub fn operator(stage: &Stage) -> Option<&str> {
    match stage {
        Value::Object(map) if map.len() == 1 => map.keys().next().map(String::as_str),
        _ => None,
    }
}

/// Field path reference: `user_id` -> `"$user_id"`.
pub fn field_ref(field: &str) -> String {
    format!("${field}")
}

/// Pipeline variable reference: `userid_tmp` -> `"$$userid_tmp"`.
pub fn var_ref(name: &str) -> String {
    format!("$${name}")
}

/// Name of the `let` variable bound to a local field in a correlated lookup.
///
/// Underscores are stripped and `_tmp` is appended, so `user_id` becomes
/// `userid_tmp`. Two fields that differ only by underscore placement
/// (`a_bc` and `ab_c`) map to the same variable.
pub fn let_var_name(local_field: &str) -> String {
    format!("{}_tmp", local_field.replace('_', ""))
}

/// Inclusion projection `{field: 1, ...}` in the order given.
pub fn include_projection<S: AsRef<str>>(fields: &[S]) -> Value {
    let mut project = Map::new();
    for field in fields {
        project.insert(field.as_ref().to_string(), json!(1));
    }
    Value::Object(project)
}

/// Case handling is driven by `options`, normally `"i"`.
pub fn regex_condition(pattern: &str, options: &str) -> Value {
    json!({"$regex": pattern, "$options": options})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_wraps_body() {
        assert_eq!(stage("$skip", json!(5)), json!({"$skip": 5}));
    }

    #[test]
    fn operator_of_stage() {
        assert_eq!(operator(&json!({"$limit": 3})), Some("$limit"));
        assert_eq!(operator(&json!({"$limit": 3, "$skip": 1})), None);
        assert_eq!(operator(&json!([1, 2])), None);
    }

    #[test]
    fn let_var_strips_underscores() {
        assert_eq!(let_var_name("user_id"), "userid_tmp");
        assert_eq!(let_var_name("owner"), "owner_tmp");
        assert_eq!(let_var_name("a_b_c"), "abc_tmp");
    }

    #[test]
    fn let_var_collides_on_underscore_placement() {
        assert_eq!(let_var_name("a_bc"), let_var_name("ab_c"));
    }

    #[test]
    fn refs() {
        assert_eq!(field_ref("items"), "$items");
        assert_eq!(var_ref("userid_tmp"), "$$userid_tmp");
    }

    #[test]
    fn projection_keeps_order() {
        let p = include_projection(&["b", "a", "c"]);
        let keys: Vec<&String> = p.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert_eq!(p, json!({"a": 1, "b": 1, "c": 1}));
    }

    #[test]
    fn regex_condition_shape() {
        assert_eq!(
            regex_condition("abc", "i"),
            json!({"$regex": "abc", "$options": "i"})
        );
    }
}
