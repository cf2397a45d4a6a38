//! Prompt templates with `{name}` placeholders
//!
//! `{{` and `}}` produce literal braces. Parsing happens once at startup so a
//! malformed template is caught as a configuration error; rendering fails only
//! when a placeholder has no value.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateError {
    UnclosedPlaceholder { offset: usize },
    UnmatchedBrace { offset: usize },
    EmptyPlaceholder { offset: usize },
    MissingField(String),
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::UnclosedPlaceholder { offset } => {
                write!(f, "Unclosed placeholder starting at byte {}", offset)
            }
            TemplateError::UnmatchedBrace { offset } => {
                write!(f, "Unmatched '}}' at byte {}", offset)
            }
            TemplateError::EmptyPlaceholder { offset } => {
                write!(f, "Empty placeholder at byte {}", offset)
            }
            TemplateError::MissingField(name) => write!(f, "No value for placeholder '{}'", name),
        }
    }
}

impl std::error::Error for TemplateError {}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(TemplateError::UnclosedPlaceholder { offset }),
                            _ => name.push(c),
                        }
                    }
                    if !closed {
                        return Err(TemplateError::UnclosedPlaceholder { offset });
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(TemplateError::EmptyPlaceholder { offset });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name.to_string()));
                }
                '}' => return Err(TemplateError::UnmatchedBrace { offset }),
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Placeholder names in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, fields: &PromptFields) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => {
                    let value = fields
                        .get(name)
                        .ok_or_else(|| TemplateError::MissingField(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Named values substituted into a template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptFields {
    values: BTreeMap<String, String>,
}

impl PromptFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.values.insert(name.into(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}
