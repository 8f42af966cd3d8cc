//! Bundled in-process assembler: Markdown to HTML.

use std::fs;
use std::path::Path;

use pulldown_cmark::{Options, Parser, html};

use super::{Assembler, ConvertError};

/// Renders an intermediate Markdown document into an HTML file.
#[derive(Debug, Clone)]
pub struct MarkdownAssembler {
    options: Options,
}

impl MarkdownAssembler {
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH,
        }
    }
}

impl Default for MarkdownAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler for MarkdownAssembler {
    fn assemble(&self, intermediate: &Path, output: &Path) -> Result<String, ConvertError> {
        let markdown = fs::read_to_string(intermediate)?;

        let parser = Parser::new_ext(&markdown, self.options);
        let mut body = String::with_capacity(markdown.len() * 2);
        html::push_html(&mut body, parser);

        fs::write(output, body)?;

        // The renderer has no failure channel of its own; diagnostics stay
        // empty unless a future assembler implementation reports them.
        Ok(String::new())
    }
}
