//! Filter-graph construction.
//!
//! The graph handed to the encoder is built from a small tagged-node
//! representation and serialized exactly once. Centralizing label
//! assignment and text escaping here keeps call sites from concatenating
//! raw graph syntax, which is where malformed graphs and injection via
//! watermark text would otherwise come from.

use crate::placement::OverlayPosition;

/// Label of the final video stream; the encoder maps this as its output.
pub const OUTPUT_LABEL: &str = "vout";

/// Stream index of the primary video input.
const MAIN_INPUT: &str = "0:v";
/// Stream index of the prepared logo input.
const LOGO_INPUT: &str = "1:v";

#[derive(Debug, Clone)]
enum Node {
    /// A catalog fragment applied to the current video stream.
    Filter { graph: String },
    /// Overlay the logo input onto the current stream.
    Overlay { position: OverlayPosition },
    /// Burn fixed text into the current stream, bottom-right.
    DrawText {
        text: String,
        font_size: u32,
        margin: u32,
    },
}

/// Ordered chain of transform nodes over the primary video stream.
#[derive(Debug, Clone, Default)]
pub struct FilterGraph {
    nodes: Vec<Node>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, graph_fragment: &str) -> Self {
        self.nodes.push(Node::Filter {
            graph: graph_fragment.to_string(),
        });
        self
    }

    pub fn overlay(mut self, position: OverlayPosition) -> Self {
        self.nodes.push(Node::Overlay { position });
        self
    }

    pub fn watermark(mut self, text: &str, font_size: u32, margin: u32) -> Self {
        self.nodes.push(Node::DrawText {
            text: text.to_string(),
            font_size,
            margin,
        });
        self
    }

    /// Serialize the chain into one `-filter_complex` expression. Each
    /// intermediate stream gets a unique label; the last node writes to
    /// [`OUTPUT_LABEL`].
    pub fn serialize(&self) -> String {
        let mut statements = Vec::with_capacity(self.nodes.len());
        let mut current = MAIN_INPUT.to_string();
        let last = self.nodes.len().saturating_sub(1);

        for (index, node) in self.nodes.iter().enumerate() {
            let out = if index == last {
                OUTPUT_LABEL.to_string()
            } else {
                format!("f{index}")
            };
            let statement = match node {
                Node::Filter { graph } => format!("[{current}]{graph}[{out}]"),
                Node::Overlay { position } => format!(
                    "[{current}][{LOGO_INPUT}]overlay={x}:{y}[{out}]",
                    x = position.x,
                    y = position.y
                ),
                Node::DrawText {
                    text,
                    font_size,
                    margin,
                } => format!(
                    "[{current}]drawtext=text='{text}':fontcolor=white:fontsize={font_size}:\
                     borderw=2:bordercolor=black:x=w-tw-{margin}:y=h-th-{margin}[{out}]",
                    text = escape_drawtext(text),
                ),
            };
            statements.push(statement);
            current = out;
        }

        statements.join(";")
    }
}

/// Escape text for use inside a single-quoted drawtext value. Covers the
/// characters the filter-graph parser treats as syntax.
fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '\'' | ':' | ',' | ';' | '[' | ']' | '%' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}
