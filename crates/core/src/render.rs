//! Function Call Rendering
//!
//! Turns one function-call record into the view shown in the tool panel. The
//! arguments are parsed best-effort: recognised shapes get their own block and
//! the raw record is always attached. A parse failure yields an error block and
//! nothing else.

use crate::protocol::FunctionCall;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;

/// Career advice extracted from `provide_career_advice` arguments.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CareerAdvice {
    pub topic: String,
    pub advice: String,
}

/// A job post extracted from `create_job_post` arguments.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct JobPost {
    pub title: String,
    pub description: String,
    pub requirements: String,
}

/// The rendered form of a function call.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendered {
    Parsed {
        career_advice: Option<CareerAdvice>,
        job_post: Option<JobPost>,
        /// Pretty-printed function-call record.
        raw: String,
    },
    Error { message: String },
}

/// Renders a function call. Never fails; bad arguments become [`Rendered::Error`].
pub fn render_function_call(call: &FunctionCall) -> Rendered {
    let fields = match serde_json::from_str::<Value>(&call.arguments) {
        Ok(Value::Object(fields)) => fields,
        Ok(Value::Null) => {
            return Rendered::Error {
                message: "Cannot read function arguments: value is null".to_string(),
            };
        }
        // Scalars and arrays carry none of the known fields.
        Ok(_) => Map::new(),
        Err(e) => {
            return Rendered::Error {
                message: e.to_string(),
            };
        }
    };

    let career_advice = match (text_field(&fields, "topic"), text_field(&fields, "advice")) {
        (Some(topic), Some(advice)) => Some(CareerAdvice { topic, advice }),
        _ => None,
    };
    let job_post = match (
        text_field(&fields, "title"),
        text_field(&fields, "description"),
        text_field(&fields, "requirements"),
    ) {
        (Some(title), Some(description), Some(requirements)) => Some(JobPost {
            title,
            description,
            requirements,
        }),
        _ => None,
    };

    let raw = serde_json::to_string_pretty(&call.to_record()).unwrap_or_default();

    Rendered::Parsed {
        career_advice,
        job_post,
        raw,
    }
}

/// Returns the displayable text of a field if it is present and non-empty.
///
/// `null`, `false`, `0` and `""` count as absent.
fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendered::Parsed {
                career_advice,
                job_post,
                raw,
            } => {
                if let Some(advice) = career_advice {
                    writeln!(f, "Career Advice:")?;
                    writeln!(f, "Topic: {}", advice.topic)?;
                    writeln!(f, "Advice: {}", advice.advice)?;
                }
                if let Some(post) = job_post {
                    writeln!(f, "Job Post:")?;
                    writeln!(f, "Title: {}", post.title)?;
                    writeln!(f, "Description: {}", post.description)?;
                    writeln!(f, "Requirements: {}", post.requirements)?;
                }
                write!(f, "{}", raw)
            }
            Rendered::Error { message } => {
                let body = json!({ "error": message });
                let text = serde_json::to_string_pretty(&body).map_err(|_| fmt::Error)?;
                write!(f, "{}", text)
            }
        }
    }
}
