//! Prompt formatting: turns a raw log line into the text sent to the
//! agent gateway.

/// Positional placeholder substituted with the log line.
pub const PLACEHOLDER: &str = "{}";

/// Built-in templates an operator can pick by name.
pub const PRESET_TEMPLATES: &[(&str, &str)] = &[
    (
        "classifier",
        "You are a log analyzer. Classify the following log line as an error \
         or as normal operation and respond ONLY with a JSON object of the \
         form {\"verdict\": \"ERROR\"|\"INFO\", \"reason\": \"...\"}. \
         Log line for analysis: '{}'",
    ),
    ("input_text", "Input text: '{}'"),
    ("quoted", "'{}'"),
];

/// Selected prompt mode for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptTemplate {
    /// Send the line unmodified.
    Raw,
    /// Substitute the line into a template (preset or operator-supplied,
    /// both behave identically).
    Templated(String),
}

impl PromptTemplate {
    /// Look up a built-in template by name.
    pub fn preset(name: &str) -> Option<Self> {
        PRESET_TEMPLATES
            .iter()
            .find(|(preset_name, _)| *preset_name == name)
            .map(|(_, template)| PromptTemplate::Templated((*template).to_string()))
    }

    /// Operator-supplied template text.
    pub fn custom(template: impl Into<String>) -> Self {
        PromptTemplate::Templated(template.into())
    }

    /// Render the prompt for one log line.
    ///
    /// Templated mode substitutes the line into the first `{}` occurrence;
    /// a template without a placeholder renders to its literal text.
    pub fn render(&self, line: &str) -> String {
        match self {
            PromptTemplate::Raw => line.to_string(),
            PromptTemplate::Templated(template) => template.replacen(PLACEHOLDER, line, 1),
        }
    }
}
