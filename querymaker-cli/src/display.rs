use colored::Colorize;
use serde_json::Value;

/// Format a pipeline for display.
/// If `raw_json` is true, output a single JSON line suitable for piping.
pub fn format_pipeline(stages: &[Value], raw_json: bool) -> String {
    if raw_json {
        return Value::Array(stages.to_vec()).to_string();
    }
    if stages.is_empty() {
        return "(empty pipeline)".dimmed().to_string();
    }

    stages
        .iter()
        .enumerate()
        .map(|(i, stage)| format!("{} {}", format!("[{i}]").dimmed(), pretty_json(stage)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_error(msg: &str) -> String {
    format!("{} {}", "Error:".red().bold(), msg.red())
}

pub fn format_ok(msg: &str) -> String {
    msg.green().to_string()
}

fn pretty_json(value: &Value) -> String {
    let formatted = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    colorize_json(&formatted)
}

fn colorize_json(json_str: &str) -> String {
    let mut result = String::with_capacity(json_str.len() * 2);
    let mut in_key = false;
    let mut in_string = false;
    let mut is_key = true;
    let mut escape = false;
    let mut token = String::new();

    for ch in json_str.chars() {
        if escape {
            token.push(ch);
            escape = false;
            continue;
        }

        if ch == '\\' && (in_key || in_string) {
            token.push(ch);
            escape = true;
            continue;
        }

        if ch == '"' {
            if in_key {
                token.push('"');
                // stage operators stand out from plain field names
                let styled = if token.starts_with("\"$") {
                    token.magenta().bold()
                } else {
                    token.blue().bold()
                };
                result.push_str(&styled.to_string());
                token.clear();
                in_key = false;
                is_key = false;
            } else if in_string {
                token.push('"');
                let styled = if token.starts_with("\"$") {
                    token.cyan()
                } else {
                    token.green()
                };
                result.push_str(&styled.to_string());
                token.clear();
                in_string = false;
            } else if is_key {
                in_key = true;
                token.push('"');
            } else {
                in_string = true;
                token.push('"');
            }
            continue;
        }

        if in_key || in_string {
            token.push(ch);
            continue;
        }

        match ch {
            ':' => {
                result.push_str(&":".dimmed().to_string());
                is_key = false;
            }
            ',' => {
                flush_primitive(&mut result, &mut token);
                result.push(',');
                is_key = true;
            }
            '{' => {
                result.push('{');
                is_key = true;
            }
            '}' | ']' => {
                flush_primitive(&mut result, &mut token);
                result.push(ch);
                is_key = false;
            }
            '[' => {
                result.push('[');
                is_key = false;
            }
            _ if ch.is_whitespace() => {
                flush_primitive(&mut result, &mut token);
                result.push(ch);
            }
            _ => token.push(ch),
        }
    }

    flush_primitive(&mut result, &mut token);
    result
}

fn flush_primitive(result: &mut String, token: &mut String) {
    if token.is_empty() {
        return;
    }
    let trimmed = token.trim();
    let styled = match trimmed {
        "true" | "false" => trimmed.yellow().to_string(),
        "null" => trimmed.dimmed().to_string(),
        _ if trimmed.parse::<f64>().is_ok() => trimmed.cyan().to_string(),
        _ => token.clone(),
    };
    result.push_str(&styled);
    token.clear();
}

pub fn print_banner(version: &str) {
    println!(
        "{} {}    {}",
        "querymaker".cyan().bold(),
        format!("v{version}").white().bold(),
        "Type \"help\" for usage, \"exit\" to quit.".dimmed()
    );
    println!();
}

pub fn print_help() {
    let help = r#"
querymaker - build aggregation pipelines step by step

Steps (one JSON object per line):
  {"op": "filter", "condition": {...}}                  Set the $match condition
  {"op": "keywordFilter", "keyword": "k", "fields": [..]}  Regex search on fields
  {"op": "lookup", "from": "c", "localField": "l",
   "foreignField": "f", "as": "a", "options": {...}}    Join another collection
  {"op": "unwind", "field": "a"}                        Unwind an array field
  {"op": "sort", "spec": {...}}                         Sort
  {"op": "skip", "n": N}                                Skip N documents
  {"op": "limit", "n": N}                               Keep N documents
  {"op": "expose", "fields": [..]}                      Final projection

Lookup options: filter, pipeline, fromTrash, exposes, isArray

Other:
  show                                                  Print the pipeline
  check                                                 Check stage shapes
  reset                                                 Start a new pipeline
  help                                                  Show this help
  exit / quit                                           Exit the shell
"#;
    println!("{}", help.trim());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_json_is_single_line() {
        let out = format_pipeline(&[json!({"$limit": 1}), json!({"$skip": 2})], true);
        assert_eq!(out, r#"[{"$limit":1},{"$skip":2}]"#);
    }

    #[test]
    fn colorized_output_keeps_text() {
        colored::control::set_override(false);
        let out = format_pipeline(&[json!({"$unwind": {"path": "$items"}})], false);
        assert!(out.starts_with("[0] {"));
        assert!(out.contains(r#""$unwind""#));
        assert!(out.contains(r#""$items""#));
    }

    #[test]
    fn empty_pipeline() {
        colored::control::set_override(false);
        assert_eq!(format_pipeline(&[], false), "(empty pipeline)");
    }
}
