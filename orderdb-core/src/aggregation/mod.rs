//! Aggregation pipeline
//!
//! MongoDB-style aggregation with pipeline operators:
//! - $match: Filter documents
//! - $group: Group by a key and accumulate ($sum, $avg, $min, $max, $first, $count)
//! - $sort: Order results
//! - $project: Select fields
//! - $skip / $limit: Window results
//! - $count: Replace the stream with a single count document

pub mod executor;

pub use executor::AggregationExecutor;

use crate::document::{Value, ID_FIELD};
use crate::query::{Filter, Projection, QueryError, QueryParseError, QueryParser, Sort};
use serde_json::Value as JsonValue;

/// Pipeline stage in aggregation
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStage {
    Match(Filter),
    Group(GroupStage),
    Sort(Sort),
    Project(Projection),
    Skip(u64),
    Limit(u64),
    /// Emit `{ <name>: <number of input documents> }`
    Count(String),
}

/// `$group` stage: the `_id` expression plus named accumulators
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStage {
    pub key: Operand,
    pub accumulators: Vec<(String, Accumulator)>,
}

impl GroupStage {
    /// Group on the value of a field path
    pub fn by_field(path: impl Into<String>) -> Self {
        Self {
            key: Operand::Field(path.into()),
            accumulators: Vec::new(),
        }
    }

    /// Group every input document together (`_id: null`)
    pub fn all() -> Self {
        Self {
            key: Operand::Literal(Value::Null),
            accumulators: Vec::new(),
        }
    }

    pub fn accumulate(mut self, output: impl Into<String>, accumulator: Accumulator) -> Self {
        self.accumulators.push((output.into(), accumulator));
        self
    }

    pub fn sum(self, output: impl Into<String>, operand: Operand) -> Self {
        self.accumulate(output, Accumulator::Sum(operand))
    }
}

/// Expression evaluated against each input document
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `"$path"`
    Field(String),
    Literal(Value),
}

impl Operand {
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field(path.into())
    }

    fn from_json(value: &JsonValue) -> Self {
        match value.as_str().and_then(|s| s.strip_prefix('$')) {
            Some(path) => Operand::Field(path.to_string()),
            None => Operand::Literal(Value::from(value.clone())),
        }
    }
}

/// Group accumulators
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Sum(Operand),
    Avg(Operand),
    Min(Operand),
    Max(Operand),
    First(Operand),
    Count,
}

impl Accumulator {
    fn from_json(output: &str, spec: &JsonValue) -> Result<Self, AggregationError> {
        let (op, arg) = spec
            .as_object()
            .filter(|o| o.len() == 1)
            .and_then(|o| o.iter().next())
            .ok_or_else(|| {
                AggregationError::InvalidOperation(format!(
                    "accumulator for '{}' must be a single-operator object",
                    output
                ))
            })?;
        let operand = Operand::from_json(arg);

        match op.as_str() {
            "$sum" => Ok(Accumulator::Sum(operand)),
            "$avg" => Ok(Accumulator::Avg(operand)),
            "$min" => Ok(Accumulator::Min(operand)),
            "$max" => Ok(Accumulator::Max(operand)),
            "$first" => Ok(Accumulator::First(operand)),
            "$count" => Ok(Accumulator::Count),
            other => Err(AggregationError::InvalidOperation(other.to_string())),
        }
    }
}

/// Aggregation pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<PipelineStage>,
}

impl Pipeline {
    pub fn new(stages: Vec<PipelineStage>) -> Self {
        Self { stages }
    }

    pub fn stage(mut self, stage: PipelineStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Parse a JSON array of single-key stage objects
    pub fn from_json(value: &JsonValue) -> Result<Self, AggregationError> {
        let stages = value
            .as_array()
            .ok_or_else(|| AggregationError::InvalidStage("pipeline must be an array".to_string()))?;

        stages
            .iter()
            .map(Self::parse_stage)
            .collect::<Result<Vec<_>, _>>()
            .map(Pipeline::new)
    }

    pub fn parse(json: &str) -> Result<Self, AggregationError> {
        let value: JsonValue = serde_json::from_str(json)
            .map_err(|e| AggregationError::InvalidStage(format!("invalid JSON: {}", e)))?;
        Self::from_json(&value)
    }

    fn parse_stage(value: &JsonValue) -> Result<PipelineStage, AggregationError> {
        let (name, spec) = value
            .as_object()
            .filter(|o| o.len() == 1)
            .and_then(|o| o.iter().next())
            .ok_or_else(|| {
                AggregationError::InvalidStage("each stage must be an object with one operator".to_string())
            })?;

        let stage = match name.as_str() {
            "$match" => PipelineStage::Match(QueryParser::parse_filter(spec)?),
            "$sort" => PipelineStage::Sort(QueryParser::parse_sort(spec)?),
            "$project" => PipelineStage::Project(QueryParser::parse_projection(spec)?),
            "$skip" => PipelineStage::Skip(Self::parse_count(name, spec)?),
            "$limit" => PipelineStage::Limit(Self::parse_count(name, spec)?),
            "$count" => {
                let field = spec
                    .as_str()
                    .filter(|s| !s.is_empty() && !s.starts_with('$'))
                    .ok_or_else(|| {
                        AggregationError::InvalidStage("$count requires a field name".to_string())
                    })?;
                PipelineStage::Count(field.to_string())
            }
            "$group" => PipelineStage::Group(Self::parse_group(spec)?),
            other => return Err(AggregationError::InvalidStage(other.to_string())),
        };

        Ok(stage)
    }

    fn parse_count(name: &str, spec: &JsonValue) -> Result<u64, AggregationError> {
        spec.as_u64().ok_or_else(|| {
            AggregationError::InvalidStage(format!("{} requires a non-negative integer", name))
        })
    }

    fn parse_group(spec: &JsonValue) -> Result<GroupStage, AggregationError> {
        let obj = spec
            .as_object()
            .ok_or_else(|| AggregationError::InvalidStage("$group must be an object".to_string()))?;

        let key = obj
            .get(ID_FIELD)
            .map(Operand::from_json)
            .ok_or_else(|| AggregationError::InvalidStage("$group requires an _id".to_string()))?;

        let mut group = GroupStage {
            key,
            accumulators: Vec::new(),
        };
        for (output, acc) in obj.iter().filter(|(k, _)| k.as_str() != ID_FIELD) {
            if output.starts_with('$') || output.contains('.') {
                return Err(AggregationError::InvalidStage(format!(
                    "invalid $group output field '{}'",
                    output
                )));
            }
            group = group.accumulate(output.clone(), Accumulator::from_json(output, acc)?);
        }

        Ok(group)
    }
}

/// Aggregation error
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid query in stage: {0}")]
    Parse(#[from] QueryParseError),

    #[error("Execution error: {0}")]
    Execution(#[from] QueryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_total_by_customer_pipeline() {
        let pipeline = Pipeline::from_json(&json!([
            { "$group": { "_id": "$cust_name", "totalPrice": { "$sum": "$price" } } },
            { "$sort": { "totalPrice": 1 } }
        ]))
        .unwrap();

        assert_eq!(
            pipeline,
            Pipeline::new(vec![
                PipelineStage::Group(
                    GroupStage::by_field("cust_name").sum("totalPrice", Operand::field("price"))
                ),
                PipelineStage::Sort(Sort::new().asc("totalPrice")),
            ])
        );
    }

    #[test]
    fn test_parse_group_with_constant_key_and_count() {
        let pipeline = Pipeline::parse(
            r#"[ { "$match": { "status": "A" } },
                 { "$group": { "_id": null, "orders": { "$sum": 1 }, "avg": { "$avg": "$price" } } } ]"#,
        )
        .unwrap();

        match &pipeline.stages[1] {
            PipelineStage::Group(group) => {
                assert_eq!(group.key, Operand::Literal(Value::Null));
                assert_eq!(
                    group.accumulators,
                    vec![
                        ("orders".to_string(), Accumulator::Sum(Operand::Literal(Value::Int32(1)))),
                        ("avg".to_string(), Accumulator::Avg(Operand::field("price"))),
                    ]
                );
            }
            other => panic!("expected group stage, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_stages() {
        assert!(matches!(
            Pipeline::from_json(&json!({ "$match": {} })),
            Err(AggregationError::InvalidStage(_))
        ));
        assert!(matches!(
            Pipeline::from_json(&json!([{ "$lookup": {} }])),
            Err(AggregationError::InvalidStage(_))
        ));
        assert!(matches!(
            Pipeline::from_json(&json!([{ "$group": { "total": { "$sum": "$price" } } }])),
            Err(AggregationError::InvalidStage(_))
        ));
        assert!(matches!(
            Pipeline::from_json(&json!([{ "$group": { "_id": null, "x": { "$push": "$price" } } }])),
            Err(AggregationError::InvalidOperation(_))
        ));
        assert!(matches!(
            Pipeline::from_json(&json!([{ "$match": { "price": { "$foo": 1 } } }])),
            Err(AggregationError::Parse(_))
        ));
        assert!(Pipeline::from_json(&json!([{ "$limit": -1 }])).is_err());
    }
}
