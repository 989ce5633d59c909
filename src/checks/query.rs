//! JMESPath queries over command output
//!
//! Expressions are evaluated by the `jmespath` crate; this module converts
//! between its variables and `serde_json::Value`. Missing fields evaluate to
//! `null`.

use jmespath::Variable;
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{ScenarioError, ScenarioResult};

/// A validated query expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    source: String,
}

impl Query {
    pub fn parse(source: &str) -> ScenarioResult<Self> {
        jmespath::compile(source).map_err(|err| invalid(source, err))?;
        Ok(Self {
            source: source.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, root: &Value) -> ScenarioResult<Value> {
        let expr = jmespath::compile(&self.source).map_err(|err| invalid(&self.source, err))?;

        let json = serde_json::to_string(root).map_err(|err| invalid(&self.source, err))?;
        let data = Variable::from_json(&json).map_err(|err| invalid(&self.source, err))?;

        let found = expr.search(data).map_err(|err| invalid(&self.source, err))?;
        let value = serde_json::to_value(&*found).map_err(|err| invalid(&self.source, err))?;
        Ok(integral_numbers(value))
    }
}

impl FromStr for Query {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Query::parse(s)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// JMESPath truthiness: null, false and empty strings/arrays/objects are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(_) => true,
    }
}

/// Whole floats come back as integers so `length(..)` compares equal to `2`
fn integral_numbers(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Value::Number(Number::from(f as i64))
            }
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(integral_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, integral_numbers(item)))
                .collect(),
        ),
        other => other,
    }
}

fn invalid(query: &str, err: impl fmt::Display) -> ScenarioError {
    ScenarioError::InvalidQuery {
        query: query.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(query: &str, value: &Value) -> Value {
        Query::parse(query).unwrap().evaluate(value).unwrap()
    }

    fn workspace() -> Value {
        json!({
            "name": "clitest000001",
            "type": "Microsoft.Synapse/workspaces",
            "tags": {"key1": "value1"},
            "identity": {"principalId": "0000-1111"},
            "managedVirtualNetworkSettings": {"allowedAadTenantIdsForLinking": ["72f988bf"]},
            "odata.type": "#Workspace"
        })
    }

    #[test]
    fn test_field_paths() {
        let ws = workspace();
        assert_eq!(eval("name", &ws), json!("clitest000001"));
        assert_eq!(eval("tags.key1", &ws), json!("value1"));
        assert_eq!(eval("identity.principalId", &ws), json!("0000-1111"));
        assert_eq!(
            eval("managedVirtualNetworkSettings.allowedAadTenantIdsForLinking[0]", &ws),
            json!("72f988bf")
        );
        assert_eq!(eval("\"odata.type\"", &ws), json!("#Workspace"));
        assert_eq!(eval("tags.missing", &ws), Value::Null);
        assert_eq!(eval("name.deeper", &ws), Value::Null);
    }

    #[test]
    fn test_indexes() {
        let list = json!([{"type": "a"}, {"type": "b"}, {"type": "c"}]);
        assert_eq!(eval("[0].type", &list), json!("a"));
        assert_eq!(eval("[-1].type", &list), json!("c"));
        assert_eq!(eval("[5].type", &list), Value::Null);
        assert_eq!(
            eval("sessions[0].jobType", &json!({"sessions": [{"jobType": "SparkBatch"}]})),
            json!("SparkBatch")
        );
    }

    #[test]
    fn test_projections() {
        let value = json!({"pools": [{"name": "p1"}, {"name": "p2"}, {"other": 1}], "nested": [[1, 2], [3]]});
        assert_eq!(eval("pools[*].name", &value), json!(["p1", "p2"]));
        assert_eq!(eval("pools[].name", &value), json!(["p1", "p2"]));
        assert_eq!(eval("nested[]", &value), json!([1, 2, 3]));
    }

    #[test]
    fn test_flatten_after_projection_applies_to_the_projected_list() {
        let value = json!({"pools": [{"tags": ["a", "b"]}, {"tags": ["c"]}]});
        assert_eq!(eval("pools[*].tags[]", &value), json!(["a", "b", "c"]));
    }

    #[test]
    fn test_functions() {
        let list = json!(["workspaces/{workspaceName}", "workspaces/{workspaceName}/bigDataPools/{bigDataPoolName}"]);
        assert_eq!(eval("length([])", &list), json!(2));
        assert_eq!(eval("length(@)", &json!("abc")), json!(3));
        assert_eq!(
            eval("contains([], 'workspaces/{workspaceName}/bigDataPools/{bigDataPoolName}')", &list),
            json!(true)
        );
        assert_eq!(eval("contains(name, 'test')", &workspace()), json!(true));
        assert_eq!(eval("contains([], `3`)", &json!([1, 2, 3])), json!(true));
        assert_eq!(eval("keys(tags)", &workspace()), json!(["key1"]));
        assert_eq!(eval("type(tags)", &workspace()), json!("object"));
        assert_eq!(eval("length(tags)", &workspace()), json!(1));
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("'it\\'s'", &Value::Null), json!("it's"));
        assert_eq!(eval("`{\"a\": [1]}`.a[0]", &Value::Null), json!(1));
    }

    #[test]
    fn test_function_errors() {
        let query = Query::parse("length(count)").unwrap();
        assert!(matches!(
            query.evaluate(&json!({"count": 3})),
            Err(ScenarioError::InvalidQuery { .. })
        ));
        for bad in ["nope(@)", "length(@, @)"] {
            let result = Query::parse(bad).and_then(|query| query.evaluate(&json!([])));
            assert!(result.is_err(), "expected an error for {bad:?}");
        }
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["a.", "a[", "a[x]", "'open", "length(a"] {
            assert!(
                matches!(Query::parse(bad), Err(ScenarioError::InvalidQuery { .. })),
                "expected parse error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!(0)));
        assert!(is_truthy(&json!("x")));
    }
}
