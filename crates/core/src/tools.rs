//! Function Tools Registered With the Realtime Session
//!
//! This module defines the two assistant-invocable tools exposed by the panel
//! and the `session.update` event that registers them.

use crate::protocol::{ClientEvent, SessionUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tool choice sent alongside the schemas; the assistant decides when to call.
pub const TOOL_CHOICE_AUTO: &str = "auto";

const CAREER_ADVICE_DESCRIPTION: &str = "
Call this function when a user asks for career advice. The function should return a structured JSON object containing the topic and the advice.
Make sure the advice is practical, actionable, and relevant to the specified topic. For example, if the topic is 'networking', provide tips on how to effectively network in a professional setting.

The advice should be broken down into clear, concise steps or tips that the user can follow. Each piece of advice should be supported by examples or best practices.
Consider including the following elements:
- An introduction to the topic and its importance in career development.
- Specific strategies or actions the user can take.
- Common pitfalls to avoid and how to overcome them.
- Additional resources or tools that can help the user further explore the topic.

Ensure that the advice is tailored to the user's level of experience and industry, if specified.
";

const JOB_POST_DESCRIPTION: &str = "
Call this function when a user asks for job-post creation. The function should return a structured JSON object containing the job title, description, and requirements.

The job post should be detailed and professional, aimed at attracting qualified candidates. Consider including the following elements:
- A compelling job title that accurately reflects the role.
- A comprehensive job description that outlines the key responsibilities and expectations.
- A list of required and preferred qualifications, including skills, experience, and education.
- Information about the company culture, values, and mission to attract candidates who align with the organization's goals.
- Details about the application process and any deadlines.

Ensure that the job post is clear, concise, and free of jargon. It should be written in a way that is inclusive and encourages a diverse range of candidates to apply.
";

/// The kind of a tool definition. The realtime API only knows functions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Function,
}

/// A single property in a tool's parameter schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

impl PropertySchema {
    fn string(description: &str) -> Self {
        Self {
            kind: "string".to_string(),
            description: description.to_string(),
        }
    }
}

/// The JSON-schema object describing a tool's arguments.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub kind: String,
    pub strict: bool,
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

/// Static descriptor of a function the assistant may invoke.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

impl ToolSchema {
    /// Builds a function schema whose properties are all required strings.
    fn function(name: &str, description: &str, properties: &[(&str, &str)]) -> Self {
        Self {
            kind: ToolKind::Function,
            name: name.to_string(),
            description: description.to_string(),
            parameters: ToolParameters {
                kind: "object".to_string(),
                strict: true,
                properties: properties
                    .iter()
                    .map(|(key, desc)| (key.to_string(), PropertySchema::string(desc)))
                    .collect(),
                required: properties.iter().map(|(key, _)| key.to_string()).collect(),
            },
        }
    }
}

/// The tools this panel registers and knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisteredTool {
    ProvideCareerAdvice,
    CreateJobPost,
}

impl RegisteredTool {
    pub const ALL: [RegisteredTool; 2] = [
        RegisteredTool::ProvideCareerAdvice,
        RegisteredTool::CreateJobPost,
    ];

    /// The function name as seen by the assistant.
    pub fn name(self) -> &'static str {
        match self {
            RegisteredTool::ProvideCareerAdvice => "provide_career_advice",
            RegisteredTool::CreateJobPost => "create_job_post",
        }
    }

    /// Looks up a registered tool by its function name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// How the tool's result is referred to when asking for feedback.
    pub fn feedback_subject(self) -> &'static str {
        match self {
            RegisteredTool::ProvideCareerAdvice => "career advice",
            RegisteredTool::CreateJobPost => "job post",
        }
    }

    /// The instructions sent to the assistant after this tool fired.
    pub fn feedback_instructions(self) -> String {
        format!(
            "Ask for feedback about the {} provided.",
            self.feedback_subject()
        )
    }

    pub fn schema(self) -> ToolSchema {
        match self {
            RegisteredTool::ProvideCareerAdvice => career_advice_tool(),
            RegisteredTool::CreateJobPost => job_post_tool(),
        }
    }
}

/// Schema for `provide_career_advice`.
pub fn career_advice_tool() -> ToolSchema {
    ToolSchema::function(
        RegisteredTool::ProvideCareerAdvice.name(),
        CAREER_ADVICE_DESCRIPTION,
        &[
            (
                "topic",
                "The specific career topic or area of interest (e.g., 'networking', 'skills').",
            ),
            (
                "advice",
                "A detailed piece of advice related to the specified topic.",
            ),
        ],
    )
}

/// Schema for `create_job_post`.
pub fn job_post_tool() -> ToolSchema {
    ToolSchema::function(
        RegisteredTool::CreateJobPost.name(),
        JOB_POST_DESCRIPTION,
        &[
            ("title", "The job title."),
            ("description", "A detailed job description."),
            ("requirements", "The job requirements."),
        ],
    )
}

/// The `session.update` event registering every tool with `tool_choice = "auto"`.
pub fn session_update() -> ClientEvent {
    ClientEvent::SessionUpdate {
        session: SessionUpdate {
            tools: RegisteredTool::ALL.into_iter().map(RegisteredTool::schema).collect(),
            tool_choice: TOOL_CHOICE_AUTO.to_string(),
        },
    }
}
