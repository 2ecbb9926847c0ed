//! Filter expressions over database properties, and the builder that
//! assembles them step by step.
//!
//! Expressions serialize to the exact JSON shapes the query API expects
//! (`{"property": p, "select": {"equals": v}}`, `{"and": [...]}`), so the
//! same value is sent on the wire and persisted in the filter history.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::notion::{DatabaseSchema, PropertyType};

/// Boolean AND/OR tree over property conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterExpression {
    And { and: Vec<FilterExpression> },
    Or { or: Vec<FilterExpression> },
    Condition(PropertyCondition),
}

/// A leaf condition on one named property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCondition {
    pub property: String,
    #[serde(flatten)]
    pub operator: PropertyOperator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyOperator {
    Select(EqualsString),
    Status(EqualsString),
    MultiSelect(ContainsString),
    Number(NumberCondition),
    Checkbox(EqualsBool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualsString {
    pub equals: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainsString {
    pub contains: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualsBool {
    pub equals: bool,
}

/// Numeric comparison payload. `between` is sugar for both bound fields set
/// on the same condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greater_than: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub less_than: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greater_than_or_equal_to: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub less_than_or_equal_to: Option<f64>,
}

const UNKNOWN_FILTER: &str = "UNKNOWN_FILTER";

impl FilterExpression {
    /// Human-readable one-line rendering, used in history listings and the
    /// confirmation step.
    pub fn summary(&self) -> String {
        match self {
            FilterExpression::And { and } => join_summaries(and, " AND "),
            FilterExpression::Or { or } => join_summaries(or, " OR "),
            FilterExpression::Condition(condition) => condition.summary(),
        }
    }

    /// Checks every leaf against the database schema: the property must
    /// exist and the operator must match its declared type.
    pub fn validate(&self, schema: &DatabaseSchema) -> Result<(), FilterError> {
        match self {
            FilterExpression::And { and } => and.iter().try_for_each(|f| f.validate(schema)),
            FilterExpression::Or { or } => or.iter().try_for_each(|f| f.validate(schema)),
            FilterExpression::Condition(condition) => condition.validate(schema),
        }
    }
}

fn join_summaries(parts: &[FilterExpression], separator: &str) -> String {
    let rendered: Vec<String> = parts.iter().map(FilterExpression::summary).collect();
    format!("({})", rendered.join(separator))
}

impl PropertyCondition {
    pub fn summary(&self) -> String {
        let property = &self.property;
        match &self.operator {
            PropertyOperator::Select(v) | PropertyOperator::Status(v) => {
                format!("{property} = {}", v.equals)
            }
            PropertyOperator::MultiSelect(v) => format!("{property} CONTAINS {}", v.contains),
            PropertyOperator::Checkbox(v) => {
                format!("{property} = {}", if v.equals { "True" } else { "False" })
            }
            PropertyOperator::Number(n) => {
                if let (Some(low), Some(high)) =
                    (n.greater_than_or_equal_to, n.less_than_or_equal_to)
                {
                    return format!("{property} BETWEEN {low} AND {high}");
                }
                if let Some(v) = n.equals {
                    format!("{property} = {v}")
                } else if let Some(v) = n.greater_than {
                    format!("{property} > {v}")
                } else if let Some(v) = n.less_than {
                    format!("{property} < {v}")
                } else if let Some(v) = n.greater_than_or_equal_to {
                    format!("{property} >= {v}")
                } else if let Some(v) = n.less_than_or_equal_to {
                    format!("{property} <= {v}")
                } else {
                    UNKNOWN_FILTER.to_string()
                }
            }
        }
    }

    fn validate(&self, schema: &DatabaseSchema) -> Result<(), FilterError> {
        let declared = schema
            .property_type(&self.property)
            .ok_or_else(|| FilterError::UnknownProperty(self.property.clone()))?;
        let expected = match &self.operator {
            PropertyOperator::Select(_) => PropertyType::Select,
            PropertyOperator::Status(_) => PropertyType::Status,
            PropertyOperator::MultiSelect(_) => PropertyType::MultiSelect,
            PropertyOperator::Number(_) => PropertyType::Number,
            PropertyOperator::Checkbox(_) => PropertyType::Checkbox,
        };
        if *declared != expected {
            return Err(FilterError::TypeMismatch {
                property: self.property.clone(),
                declared: declared.as_str().to_string(),
                operator: expected.as_str().to_string(),
            });
        }
        Ok(())
    }
}

/// Errors raised while building or validating filters. All are reportable
/// and re-promptable; none abort the run.
#[derive(Debug, PartialEq)]
pub enum FilterError {
    UnknownProperty(String),
    UnsupportedPropertyType { property: String, property_type: String },
    TypeMismatch { property: String, declared: String, operator: String },
    UnknownOperator(String),
    State(&'static str),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::UnknownProperty(name) => {
                write!(f, "property '{name}' not found in the database")
            }
            FilterError::UnsupportedPropertyType {
                property,
                property_type,
            } => write!(
                f,
                "filtering on property '{property}' of type '{property_type}' is not supported"
            ),
            FilterError::TypeMismatch {
                property,
                declared,
                operator,
            } => write!(
                f,
                "property '{property}' is of type '{declared}' but the condition targets '{operator}'"
            ),
            FilterError::UnknownOperator(op) => write!(f, "unknown number operator '{op}'"),
            FilterError::State(expected) => {
                write!(f, "builder is not in the expected state: {expected}")
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// Comparison operators available for number properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberOperator {
    Equals,
    GreaterThan,
    LessThan,
    GreaterThanOrEqualTo,
    LessThanOrEqualTo,
    Between,
}

impl std::str::FromStr for NumberOperator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(NumberOperator::Equals),
            "greater_than" => Ok(NumberOperator::GreaterThan),
            "less_than" => Ok(NumberOperator::LessThan),
            "greater_than_or_equal_to" => Ok(NumberOperator::GreaterThanOrEqualTo),
            "less_than_or_equal_to" => Ok(NumberOperator::LessThanOrEqualTo),
            "between" => Ok(NumberOperator::Between),
            other => Err(FilterError::UnknownOperator(other.to_string())),
        }
    }
}

/// Where the builder currently is. Transitions:
/// CollectingProperty -> (number) CollectingOperator -> CollectingValue ->
/// CollectingProperty, until `finish_collecting` moves to Confirming;
/// `confirm` terminates, `restart` clears and returns to CollectingProperty.
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderState {
    CollectingProperty,
    CollectingOperator { property: String },
    CollectingValue { property: String, operator: Option<NumberOperator> },
    Confirming,
}

/// Assembles a [`FilterExpression`] condition by condition, independent of
/// any text I/O. Conditions on the same property are OR'd together;
/// conditions across different properties are AND'd.
pub struct FilterBuilder {
    schema: DatabaseSchema,
    groups: Vec<(String, Vec<PropertyCondition>)>,
    state: BuilderState,
}

impl FilterBuilder {
    pub fn new(schema: DatabaseSchema) -> Self {
        FilterBuilder {
            schema,
            groups: Vec::new(),
            state: BuilderState::CollectingProperty,
        }
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// One (property, summary) line per collected group, for progress
    /// display between conditions.
    pub fn collected(&self) -> Vec<(String, String)> {
        self.groups
            .iter()
            .map(|(property, conditions)| (property.clone(), group_summary(conditions)))
            .collect()
    }

    /// Start a condition on the named property. Rejects names absent from
    /// the schema and types without filter support; both leave the builder
    /// in CollectingProperty so the caller can re-prompt.
    pub fn select_property(&mut self, name: &str) -> Result<PropertyType, FilterError> {
        if self.state != BuilderState::CollectingProperty {
            return Err(FilterError::State("collecting a property name"));
        }
        let property_type = self
            .schema
            .property_type(name)
            .ok_or_else(|| FilterError::UnknownProperty(name.to_string()))?
            .clone();
        match property_type {
            PropertyType::Number => {
                self.state = BuilderState::CollectingOperator {
                    property: name.to_string(),
                };
            }
            PropertyType::Select
            | PropertyType::Status
            | PropertyType::MultiSelect
            | PropertyType::Checkbox => {
                self.state = BuilderState::CollectingValue {
                    property: name.to_string(),
                    operator: None,
                };
            }
            ref unsupported => {
                return Err(FilterError::UnsupportedPropertyType {
                    property: name.to_string(),
                    property_type: unsupported.as_str().to_string(),
                });
            }
        }
        Ok(property_type)
    }

    /// Choose the comparison for a number property.
    pub fn select_number_operator(&mut self, operator: NumberOperator) -> Result<(), FilterError> {
        let BuilderState::CollectingOperator { property } = &self.state else {
            return Err(FilterError::State("collecting a number operator"));
        };
        self.state = BuilderState::CollectingValue {
            property: property.clone(),
            operator: Some(operator),
        };
        Ok(())
    }

    /// Provide comma-separated values for a select/status/multi_select
    /// property. Each value becomes one condition; they are OR'd with any
    /// earlier conditions on the same property. Returns how many conditions
    /// were added.
    pub fn provide_values(&mut self, raw: &str) -> Result<usize, FilterError> {
        let (property, operator) = self.expect_collecting_value()?;
        if operator.is_some() {
            return Err(FilterError::State("a text value (number operator pending)"));
        }
        let property_type = self.declared_type(&property)?;
        let values: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        let mut added = 0;
        for value in values {
            let operator = match property_type {
                PropertyType::Select => PropertyOperator::Select(EqualsString { equals: value }),
                PropertyType::Status => PropertyOperator::Status(EqualsString { equals: value }),
                PropertyType::MultiSelect => {
                    PropertyOperator::MultiSelect(ContainsString { contains: value })
                }
                _ => return Err(FilterError::State("a text-valued property")),
            };
            self.push_condition(property.clone(), operator);
            added += 1;
        }
        self.state = BuilderState::CollectingProperty;
        Ok(added)
    }

    /// Provide the boolean for a checkbox property.
    pub fn provide_checkbox(&mut self, value: bool) -> Result<(), FilterError> {
        let (property, operator) = self.expect_collecting_value()?;
        if operator.is_some() || self.declared_type(&property)? != PropertyType::Checkbox {
            return Err(FilterError::State("a checkbox property"));
        }
        self.push_condition(
            property,
            PropertyOperator::Checkbox(EqualsBool { equals: value }),
        );
        self.state = BuilderState::CollectingProperty;
        Ok(())
    }

    /// Provide the number for a single-bound comparison.
    pub fn provide_number(&mut self, value: f64) -> Result<(), FilterError> {
        let (property, operator) = self.expect_collecting_value()?;
        let condition = match operator {
            Some(NumberOperator::Equals) => NumberCondition {
                equals: Some(value),
                ..Default::default()
            },
            Some(NumberOperator::GreaterThan) => NumberCondition {
                greater_than: Some(value),
                ..Default::default()
            },
            Some(NumberOperator::LessThan) => NumberCondition {
                less_than: Some(value),
                ..Default::default()
            },
            Some(NumberOperator::GreaterThanOrEqualTo) => NumberCondition {
                greater_than_or_equal_to: Some(value),
                ..Default::default()
            },
            Some(NumberOperator::LessThanOrEqualTo) => NumberCondition {
                less_than_or_equal_to: Some(value),
                ..Default::default()
            },
            Some(NumberOperator::Between) => {
                return Err(FilterError::State("a range (between takes two bounds)"))
            }
            None => return Err(FilterError::State("a number operator to be chosen first")),
        };
        self.push_condition(property, PropertyOperator::Number(condition));
        self.state = BuilderState::CollectingProperty;
        Ok(())
    }

    /// Provide both bounds of a `between` comparison, as a single condition
    /// carrying both bound fields.
    pub fn provide_range(&mut self, low: f64, high: f64) -> Result<(), FilterError> {
        let (property, operator) = self.expect_collecting_value()?;
        if operator != Some(NumberOperator::Between) {
            return Err(FilterError::State("a between operator"));
        }
        self.push_condition(
            property,
            PropertyOperator::Number(NumberCondition {
                greater_than_or_equal_to: Some(low),
                less_than_or_equal_to: Some(high),
                ..Default::default()
            }),
        );
        self.state = BuilderState::CollectingProperty;
        Ok(())
    }

    /// Done collecting; move to the confirmation step. Returns the summary
    /// of what would be applied, or None when nothing was collected.
    pub fn finish_collecting(&mut self) -> Result<Option<String>, FilterError> {
        if self.state != BuilderState::CollectingProperty {
            return Err(FilterError::State("collecting (finish a pending condition first)"));
        }
        self.state = BuilderState::Confirming;
        Ok(self.build_expression().map(|f| f.summary()))
    }

    /// Accept the collected filters, terminating the machine.
    pub fn confirm(&mut self) -> Result<Option<FilterExpression>, FilterError> {
        if self.state != BuilderState::Confirming {
            return Err(FilterError::State("confirming"));
        }
        let expression = self.build_expression();
        self.state = BuilderState::CollectingProperty;
        self.groups.clear();
        Ok(expression)
    }

    /// Reject the collected filters and start over with nothing collected.
    pub fn restart(&mut self) -> Result<(), FilterError> {
        if self.state != BuilderState::Confirming {
            return Err(FilterError::State("confirming"));
        }
        self.groups.clear();
        self.state = BuilderState::CollectingProperty;
        Ok(())
    }

    fn expect_collecting_value(&self) -> Result<(String, Option<NumberOperator>), FilterError> {
        match &self.state {
            BuilderState::CollectingValue { property, operator } => {
                Ok((property.clone(), *operator))
            }
            _ => Err(FilterError::State("collecting a value")),
        }
    }

    fn declared_type(&self, property: &str) -> Result<PropertyType, FilterError> {
        self.schema
            .property_type(property)
            .cloned()
            .ok_or_else(|| FilterError::UnknownProperty(property.to_string()))
    }

    fn push_condition(&mut self, property: String, operator: PropertyOperator) {
        let condition = PropertyCondition {
            property: property.clone(),
            operator,
        };
        if let Some((_, conditions)) = self.groups.iter_mut().find(|(name, _)| *name == property) {
            conditions.push(condition);
        } else {
            self.groups.push((property, vec![condition]));
        }
    }

    fn build_expression(&self) -> Option<FilterExpression> {
        let mut per_property: Vec<FilterExpression> = Vec::new();
        for (_, conditions) in &self.groups {
            per_property.push(combine_or(conditions));
        }
        match per_property.len() {
            0 => None,
            1 => per_property.pop(),
            _ => Some(FilterExpression::And { and: per_property }),
        }
    }
}

fn combine_or(conditions: &[PropertyCondition]) -> FilterExpression {
    if conditions.len() == 1 {
        FilterExpression::Condition(conditions[0].clone())
    } else {
        FilterExpression::Or {
            or: conditions
                .iter()
                .cloned()
                .map(FilterExpression::Condition)
                .collect(),
        }
    }
}

fn group_summary(conditions: &[PropertyCondition]) -> String {
    combine_or(conditions).summary()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn schema() -> DatabaseSchema {
        let mut properties = BTreeMap::new();
        properties.insert("Priority".to_string(), PropertyType::Select);
        properties.insert("STATUS".to_string(), PropertyType::Status);
        properties.insert("Estimation".to_string(), PropertyType::MultiSelect);
        properties.insert("Points".to_string(), PropertyType::Number);
        properties.insert("Done".to_string(), PropertyType::Checkbox);
        properties.insert("Name".to_string(), PropertyType::Title);
        DatabaseSchema { properties }
    }

    #[test]
    fn summary_renders_and_of_select_and_checkbox() {
        let filter = FilterExpression::And {
            and: vec![
                FilterExpression::Condition(PropertyCondition {
                    property: "Priority".to_string(),
                    operator: PropertyOperator::Select(EqualsString {
                        equals: "High".to_string(),
                    }),
                }),
                FilterExpression::Condition(PropertyCondition {
                    property: "Done".to_string(),
                    operator: PropertyOperator::Checkbox(EqualsBool { equals: true }),
                }),
            ],
        };
        assert_eq!(filter.summary(), "(Priority = High AND Done = True)");
    }

    #[test]
    fn summary_renders_between_from_both_bounds() {
        let filter = FilterExpression::Condition(PropertyCondition {
            property: "Points".to_string(),
            operator: PropertyOperator::Number(NumberCondition {
                greater_than_or_equal_to: Some(2.0),
                less_than_or_equal_to: Some(5.0),
                ..Default::default()
            }),
        });
        assert_eq!(filter.summary(), "Points BETWEEN 2 AND 5");
    }

    #[test]
    fn serializes_to_the_wire_shape() {
        let filter = FilterExpression::Condition(PropertyCondition {
            property: "Priority".to_string(),
            operator: PropertyOperator::Select(EqualsString {
                equals: "High".to_string(),
            }),
        });
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "property": "Priority", "select": { "equals": "High" } })
        );

        let round_tripped: FilterExpression = serde_json::from_value(json).unwrap();
        assert_eq!(round_tripped, filter);
    }

    #[test]
    fn deserializes_nested_and_or() {
        let json = serde_json::json!({
            "and": [
                { "property": "Priority", "select": { "equals": "High" } },
                { "or": [
                    { "property": "Points", "number": { "greater_than": 3.0 } },
                    { "property": "Done", "checkbox": { "equals": false } }
                ] }
            ]
        });
        let filter: FilterExpression = serde_json::from_value(json).unwrap();
        assert_eq!(
            filter.summary(),
            "(Priority = High AND (Points > 3 OR Done = False))"
        );
    }

    #[test]
    fn builder_rejects_unknown_property() {
        let mut builder = FilterBuilder::new(schema());
        let err = builder.select_property("Severity").unwrap_err();
        assert_eq!(err, FilterError::UnknownProperty("Severity".to_string()));
        assert_eq!(*builder.state(), BuilderState::CollectingProperty);
    }

    #[test]
    fn builder_rejects_unsupported_property_type() {
        let mut builder = FilterBuilder::new(schema());
        let err = builder.select_property("Name").unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedPropertyType { .. }));
    }

    #[test]
    fn same_property_values_or_across_properties_and() {
        let mut builder = FilterBuilder::new(schema());
        builder.select_property("Priority").unwrap();
        assert_eq!(builder.provide_values("Mid, High").unwrap(), 2);
        builder.select_property("Done").unwrap();
        builder.provide_checkbox(true).unwrap();

        let summary = builder.finish_collecting().unwrap().unwrap();
        assert_eq!(
            summary,
            "((Priority = Mid OR Priority = High) AND Done = True)"
        );
        let filter = builder.confirm().unwrap().unwrap();
        filter.validate(&schema()).unwrap();
    }

    #[test]
    fn between_collapses_to_one_condition_with_both_bounds() {
        let mut builder = FilterBuilder::new(schema());
        builder.select_property("Points").unwrap();
        builder.select_number_operator(NumberOperator::Between).unwrap();
        builder.provide_range(2.0, 5.0).unwrap();
        let filter = {
            builder.finish_collecting().unwrap();
            builder.confirm().unwrap().unwrap()
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "property": "Points",
                "number": { "greater_than_or_equal_to": 2.0, "less_than_or_equal_to": 5.0 }
            })
        );
    }

    #[test]
    fn restart_clears_collected_conditions() {
        let mut builder = FilterBuilder::new(schema());
        builder.select_property("Priority").unwrap();
        builder.provide_values("High").unwrap();
        builder.finish_collecting().unwrap();
        builder.restart().unwrap();
        assert!(builder.is_empty());
        let summary = builder.finish_collecting().unwrap();
        assert!(summary.is_none());
        assert!(builder.confirm().unwrap().is_none());
    }

    #[test]
    fn out_of_order_calls_are_state_errors() {
        let mut builder = FilterBuilder::new(schema());
        assert!(matches!(
            builder.provide_checkbox(true),
            Err(FilterError::State(_))
        ));
        builder.select_property("Points").unwrap();
        assert!(matches!(
            builder.provide_number(3.0),
            Err(FilterError::State(_))
        ));
        builder
            .select_number_operator(NumberOperator::GreaterThan)
            .unwrap();
        builder.provide_number(3.0).unwrap();
        assert_eq!(*builder.state(), BuilderState::CollectingProperty);
    }

    #[test]
    fn validate_rejects_operator_type_mismatch() {
        let filter = FilterExpression::Condition(PropertyCondition {
            property: "Priority".to_string(),
            operator: PropertyOperator::Checkbox(EqualsBool { equals: true }),
        });
        assert!(matches!(
            filter.validate(&schema()),
            Err(FilterError::TypeMismatch { .. })
        ));
    }
}
