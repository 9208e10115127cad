//! Aggregation pipeline executor

use super::{Accumulator, AggregationError, GroupStage, Operand, Pipeline, PipelineStage};
use crate::document::{Document, Value, ID_FIELD};
use crate::query::{compare_values, values_equal, QueryError, QueryExecutor};
use std::borrow::Cow;
use std::cmp::Ordering as CmpOrdering;

/// Runs a [`Pipeline`] over a set of documents
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationExecutor {
    query: QueryExecutor,
}

impl AggregationExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute each stage in order, feeding its output to the next
    pub fn execute(&self, documents: &[Document], pipeline: &Pipeline) -> Result<Vec<Document>, AggregationError> {
        let mut current: Vec<Document> = documents.to_vec();

        for stage in &pipeline.stages {
            current = match stage {
                PipelineStage::Match(filter) => current
                    .into_iter()
                    .filter(|doc| self.query.matches_filter(doc, filter))
                    .collect(),
                PipelineStage::Group(group) => self.group(&current, group),
                PipelineStage::Sort(sort) => {
                    self.query.sort_documents(&mut current, sort);
                    current
                }
                PipelineStage::Project(projection) => {
                    if !projection.is_valid() {
                        return Err(QueryError::InvalidProjection(format!("{:?}", projection.fields)).into());
                    }
                    current.iter().map(|doc| self.query.project(doc, projection)).collect()
                }
                PipelineStage::Skip(n) => {
                    let n = usize::try_from(*n).unwrap_or(usize::MAX).min(current.len());
                    current.drain(..n);
                    current
                }
                PipelineStage::Limit(n) => {
                    current.truncate(usize::try_from(*n).unwrap_or(usize::MAX));
                    current
                }
                PipelineStage::Count(field) => {
                    if current.is_empty() {
                        current
                    } else {
                        let mut doc = Document::new();
                        doc.insert(field.clone(), integral(current.len() as i64));
                        vec![doc]
                    }
                }
            };
        }

        Ok(current)
    }

    /// Groups are emitted in the order their key is first seen
    fn group(&self, documents: &[Document], stage: &GroupStage) -> Vec<Document> {
        let mut groups: Vec<(Value, Vec<AccumulatorState>)> = Vec::new();

        for doc in documents {
            let key = evaluate(doc, &stage.key).unwrap_or(Value::Null);
            let index = match groups.iter().position(|(k, _)| values_equal(k, &key)) {
                Some(index) => index,
                None => {
                    let states = stage
                        .accumulators
                        .iter()
                        .map(|(_, acc)| AccumulatorState::new(acc))
                        .collect();
                    groups.push((key, states));
                    groups.len() - 1
                }
            };

            for ((_, acc), state) in stage.accumulators.iter().zip(groups[index].1.iter_mut()) {
                state.update(acc, doc);
            }
        }

        groups
            .into_iter()
            .map(|(key, states)| {
                let mut out = Document::new();
                out.insert(ID_FIELD, key);
                for ((name, _), state) in stage.accumulators.iter().zip(states) {
                    out.insert(name.clone(), state.finish());
                }
                out
            })
            .collect()
    }
}

fn evaluate(doc: &Document, operand: &Operand) -> Option<Value> {
    match operand {
        Operand::Field(path) => doc.lookup(path).map(Cow::into_owned),
        Operand::Literal(value) => Some(value.clone()),
    }
}

/// Narrowest integer representation
fn integral(n: i64) -> Value {
    i32::try_from(n).map(Value::Int32).unwrap_or(Value::Int64(n))
}

/// Running state of one accumulator within one group
#[derive(Debug)]
enum AccumulatorState {
    /// Integral until a float is seen or the integer sum overflows
    Sum { int: i64, float: f64, is_float: bool },
    Avg { total: f64, count: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
    First(Option<Value>),
    Count(i64),
}

impl AccumulatorState {
    fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::Sum(_) => AccumulatorState::Sum {
                int: 0,
                float: 0.0,
                is_float: false,
            },
            Accumulator::Avg(_) => AccumulatorState::Avg { total: 0.0, count: 0 },
            Accumulator::Min(_) => AccumulatorState::Min(None),
            Accumulator::Max(_) => AccumulatorState::Max(None),
            Accumulator::First(_) => AccumulatorState::First(None),
            Accumulator::Count => AccumulatorState::Count(0),
        }
    }

    fn update(&mut self, acc: &Accumulator, doc: &Document) {
        match (self, acc) {
            (AccumulatorState::Sum { int, float, is_float }, Accumulator::Sum(operand)) => {
                // Missing and non-numeric values are ignored
                match evaluate(doc, operand) {
                    Some(v) if !*is_float && v.as_i64().is_some() => {
                        let n = v.as_i64().unwrap_or_default();
                        match int.checked_add(n) {
                            Some(sum) => *int = sum,
                            None => {
                                *float = *int as f64 + n as f64;
                                *int = 0;
                                *is_float = true;
                            }
                        }
                    }
                    Some(v) => {
                        if let Some(f) = v.as_f64() {
                            if !*is_float {
                                *float = *int as f64;
                                *int = 0;
                                *is_float = true;
                            }
                            *float += f;
                        }
                    }
                    None => {}
                }
            }
            (AccumulatorState::Avg { total, count }, Accumulator::Avg(operand)) => {
                if let Some(f) = evaluate(doc, operand).and_then(|v| v.as_f64()) {
                    *total += f;
                    *count += 1;
                }
            }
            (AccumulatorState::Min(current), Accumulator::Min(operand)) => {
                keep_extreme(current, evaluate(doc, operand), CmpOrdering::Less);
            }
            (AccumulatorState::Max(current), Accumulator::Max(operand)) => {
                keep_extreme(current, evaluate(doc, operand), CmpOrdering::Greater);
            }
            (AccumulatorState::First(current), Accumulator::First(operand)) => {
                if current.is_none() {
                    *current = Some(evaluate(doc, operand).unwrap_or(Value::Null));
                }
            }
            (AccumulatorState::Count(n), Accumulator::Count) => *n += 1,
            // States are built from the same accumulator list they are updated with
            _ => {}
        }
    }

    fn finish(self) -> Value {
        match self {
            AccumulatorState::Sum { int, float, is_float } => {
                if is_float {
                    Value::Float64(float)
                } else {
                    integral(int)
                }
            }
            AccumulatorState::Avg { total, count } => {
                if count == 0 {
                    Value::Null
                } else {
                    Value::Float64(total / count as f64)
                }
            }
            AccumulatorState::Min(v) | AccumulatorState::Max(v) | AccumulatorState::First(v) => {
                v.unwrap_or(Value::Null)
            }
            AccumulatorState::Count(n) => integral(n),
        }
    }
}

/// $min/$max ignore null and missing values
fn keep_extreme(current: &mut Option<Value>, candidate: Option<Value>, wanted: CmpOrdering) {
    let Some(candidate) = candidate.filter(|v| !v.is_null()) else {
        return;
    };
    let replace = match current {
        Some(existing) => compare_values(&candidate, existing) == wanted,
        None => true,
    };
    if replace {
        *current = Some(candidate);
    }
}
