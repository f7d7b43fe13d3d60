//! Construction of the initial structured document from raw content.

use crate::patch::{EMPTY_PARAGRAPH, patch_blank_runs};
use crate::render::{CmarkRenderer, CmarkTokenizer, Renderer, Tokenizer};
use crate::scan::blank_runs;
use crate::tree::{DocTree, DocumentSchema, HtmlSchema, SchemaError};

/// Builds the structured document tree for a piece of content.
///
/// In rich mode the markdown is tokenized and rendered, blank runs are
/// re-injected, and the patched HTML goes through the schema. In plain mode
/// the raw text is wrapped verbatim in a single preformatted block; no
/// blank-line analysis applies because preformatted text keeps all
/// whitespace by construction.
#[derive(Debug)]
pub struct InitialDocumentBuilder<R = CmarkRenderer, T = CmarkTokenizer, S = HtmlSchema> {
    renderer: R,
    tokenizer: T,
    schema: S,
}

impl Default for InitialDocumentBuilder {
    fn default() -> Self {
        Self::new(CmarkRenderer, CmarkTokenizer, HtmlSchema)
    }
}

impl<R: Renderer, T: Tokenizer, S: DocumentSchema> InitialDocumentBuilder<R, T, S> {
    pub fn new(renderer: R, tokenizer: T, schema: S) -> Self {
        Self {
            renderer,
            tokenizer,
            schema,
        }
    }

    /// Schema failures propagate; everything upstream degrades gracefully.
    pub fn build(&self, content: &str, rich_editor: bool) -> Result<DocTree, SchemaError> {
        if !rich_editor {
            let html = format!("<pre>{}</pre>", html_escape::encode_text(content));
            return self.schema.parse_html(&html);
        }

        let tokens = self.tokenizer.tokenize(content);
        let runs = blank_runs(&tokens, content);
        let mut html = self.renderer.render(content);
        // Trailing empty paragraph keeps a blank block boundary at the end
        // of the document.
        html.push_str(EMPTY_PARAGRAPH);
        let patched = patch_blank_runs(&html, &runs);
        self.schema.parse_html(&patched)
    }
}
