//! Request predicates for stubs.
//!
//! A predicate is an operator applied to one or more request fields:
//!
//! ```json
//! {"equals": {"method": "GET", "path": "/sausages"}, "caseSensitive": true}
//! ```
//!
//! Predicates combine with `and`, `or`, and `not`. Shapes this module does not
//! model (`jsonpath`, `xpath`, `inject`, ...) are kept verbatim as [`Predicate::Raw`].

use super::responses::Body;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    DeepEquals,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    Exists,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Equals,
        Operator::DeepEquals,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::Matches,
        Operator::Exists,
    ];

    /// Key used for this operator in Mountebank JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::DeepEquals => "deepEquals",
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::Matches => "matches",
            Operator::Exists => "exists",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == key)
    }
}

/// Request fields an operator is applied to.
///
/// Predicates on any other field (`form`, `requestFrom`, tcp `data`) are kept as
/// [`Predicate::Raw`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
}

/// An operator over request fields, the leaf of a predicate tree
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub operator: Operator,
    pub fields: RequestFields,
    pub case_sensitive: Option<bool>,
    /// Regex stripped from field values before matching
    pub except: Option<String>,
}

impl FieldPredicate {
    pub fn new(operator: Operator) -> Self {
        Self {
            operator,
            fields: RequestFields::default(),
            case_sensitive: None,
            except: None,
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.fields.method = Some(method.into().to_uppercase());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.fields.path = Some(path.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.query.insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.fields.body = Some(body.into());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }

    pub fn except(mut self, pattern: impl Into<String>) -> Self {
        self.except = Some(pattern.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Field(FieldPredicate),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Raw(serde_json::Value),
}

impl Predicate {
    /// Start a field predicate, e.g. `Predicate::matching(Operator::Equals).path("/")`.
    pub fn matching(operator: Operator) -> FieldPredicate {
        FieldPredicate::new(operator)
    }

    pub fn equals() -> FieldPredicate {
        FieldPredicate::new(Operator::Equals)
    }

    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(predicates.into_iter().collect())
    }

    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(predicates.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(predicate: impl Into<Predicate>) -> Self {
        Predicate::Not(Box::new(predicate.into()))
    }

    fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut obj = serde_json::Map::new();
        match self {
            Predicate::Field(field) => {
                obj.insert(
                    field.operator.as_str().to_string(),
                    serde_json::to_value(&field.fields)?,
                );
                if let Some(case_sensitive) = field.case_sensitive {
                    obj.insert("caseSensitive".into(), case_sensitive.into());
                }
                if let Some(except) = &field.except {
                    obj.insert("except".into(), except.clone().into());
                }
            }
            Predicate::And(children) | Predicate::Or(children) => {
                let key = if matches!(self, Predicate::And(_)) {
                    "and"
                } else {
                    "or"
                };
                let values = children
                    .iter()
                    .map(Predicate::to_value)
                    .collect::<Result<Vec<_>, _>>()?;
                obj.insert(key.into(), values.into());
            }
            Predicate::Not(child) => {
                obj.insert("not".into(), child.to_value()?);
            }
            Predicate::Raw(value) => return Ok(value.clone()),
        }
        Ok(serde_json::Value::Object(obj))
    }

    fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let serde_json::Value::Object(obj) = &value else {
            return Ok(Predicate::Raw(value));
        };

        if let Some(children) = obj.get("and").or_else(|| obj.get("or")) {
            let children: Vec<serde_json::Value> = serde_json::from_value(children.clone())?;
            let children = children
                .into_iter()
                .map(Predicate::from_value)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(if obj.contains_key("and") {
                Predicate::And(children)
            } else {
                Predicate::Or(children)
            });
        }
        if let Some(child) = obj.get("not") {
            return Ok(Predicate::Not(Box::new(Predicate::from_value(
                child.clone(),
            )?)));
        }

        // Anything beyond operator, caseSensitive and except is a shape we do not model
        let known = |k: &String| {
            Operator::from_key(k).is_some() || k == "caseSensitive" || k == "except"
        };
        let operators: Vec<Operator> = obj.keys().filter_map(|k| Operator::from_key(k)).collect();
        if operators.len() != 1 || !obj.keys().all(known) {
            return Ok(Predicate::Raw(value));
        }

        let operator = operators[0];
        let fields: RequestFields = match serde_json::from_value(obj[operator.as_str()].clone()) {
            Ok(fields) => fields,
            Err(_) => return Ok(Predicate::Raw(value)),
        };
        Ok(Predicate::Field(FieldPredicate {
            operator,
            fields,
            case_sensitive: obj.get("caseSensitive").and_then(|v| v.as_bool()),
            except: obj
                .get("except")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }))
    }
}

impl From<FieldPredicate> for Predicate {
    fn from(field: FieldPredicate) -> Self {
        Predicate::Field(field)
    }
}

impl Serialize for Predicate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::Error;
        self.to_value()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let value = serde_json::Value::deserialize(deserializer)?;
        Predicate::from_value(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn test_field_predicate_shape() {
        let predicate: Predicate = Predicate::equals()
            .method("get")
            .path("/sausages")
            .query("size", "large")
            .header("foo", "bar")
            .case_sensitive(true)
            .into();

        assert_json_eq!(
            serde_json::to_value(&predicate).unwrap(),
            json!({
                "equals": {
                    "method": "GET",
                    "path": "/sausages",
                    "query": {"size": "large"},
                    "headers": {"foo": "bar"}
                },
                "caseSensitive": true
            })
        );
    }

    #[test]
    fn test_every_operator_key() {
        for op in Operator::ALL {
            let value =
                serde_json::to_value(Predicate::from(Predicate::matching(op).path("/"))).unwrap();
            assert!(value.get(op.as_str()).is_some(), "missing key for {op:?}");
            assert_eq!(Operator::from_key(op.as_str()), Some(op));
        }
    }

    #[test]
    fn test_logical_shape() {
        let predicate = Predicate::or([
            Predicate::from(Predicate::equals().path("/a")),
            Predicate::not(Predicate::matching(Operator::StartsWith).path("/b")),
        ]);

        assert_json_eq!(
            serde_json::to_value(&predicate).unwrap(),
            json!({"or": [
                {"equals": {"path": "/a"}},
                {"not": {"startsWith": {"path": "/b"}}}
            ]})
        );
    }

    #[test]
    fn test_parse_back_logical_and_fields() {
        let value = json!({"and": [
            {"equals": {"method": "POST"}, "except": "\\d+"},
            {"contains": {"body": {"a": 1}}}
        ]});
        let predicate: Predicate = serde_json::from_value(value.clone()).unwrap();

        match &predicate {
            Predicate::And(children) => {
                assert_eq!(children.len(), 2);
                match &children[0] {
                    Predicate::Field(f) => {
                        assert_eq!(f.operator, Operator::Equals);
                        assert_eq!(f.fields.method.as_deref(), Some("POST"));
                        assert_eq!(f.except.as_deref(), Some("\\d+"));
                    }
                    other => panic!("expected field predicate, got {other:?}"),
                }
            }
            other => panic!("expected and, got {other:?}"),
        }
        assert_json_eq!(serde_json::to_value(&predicate).unwrap(), value);
    }

    #[test]
    fn test_unmodelled_shapes_are_kept_raw() {
        let jsonpath = json!({"equals": {"body": "x"}, "jsonpath": {"selector": "$.a"}});
        let predicate: Predicate = serde_json::from_value(jsonpath.clone()).unwrap();
        assert!(matches!(predicate, Predicate::Raw(_)));
        assert_json_eq!(serde_json::to_value(&predicate).unwrap(), jsonpath);

        let inject = json!({"inject": "function (config) { return true; }"});
        let predicate: Predicate = serde_json::from_value(inject.clone()).unwrap();
        assert_eq!(predicate, Predicate::Raw(inject));
    }
}
