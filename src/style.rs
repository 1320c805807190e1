use std::collections::HashMap;

use regex::Regex;

/// Named text styles set by scripts and consumed by the styling collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub background: Option<Color>,
    pub foreground: Color,
}

pub type TextStyleMap = HashMap<String, TextStyle>;

/// A per-buffer stack of named match rules. The core only stores and
/// forwards these; applying them to rendered text belongs to the styling
/// engine outside the core.
#[derive(Debug, Default)]
pub struct StyleStack {
    rules: Vec<StyleRule>,
}

#[derive(Debug)]
pub struct StyleRule {
    pub name: String,
    pub pattern: Regex,
}

impl StyleStack {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn push(&mut self, name: String, pattern: &str) -> Result<(), String> {
        let pattern = Regex::new(&format!("^({})", pattern)).map_err(|err| match err {
            regex::Error::Syntax(reason) => reason,
            regex::Error::CompiledTooBig(limit) => {
                format!("style pattern exceeds compile size limit {}", limit)
            }
            _ => "style pattern failed to compile".to_string(),
        })?;
        self.rules.push(StyleRule { name, pattern });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }
}
