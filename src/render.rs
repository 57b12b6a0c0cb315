//! Purpose: Render fetched JSON for stdout: compact, pretty, or pretty with ANSI color.
//! Exports: `Layout`, `render_json`.
//! Role: Pure formatter used by the CLI output path.
//! Invariants: Uncolored pretty output equals `serde_json::to_string_pretty`.
//! Invariants: ANSI escapes appear only when color is explicitly enabled.
use serde_json::{Map, Value};

const INDENT: &str = "  ";

// 8/16-color codes only; bright variants wash out on light themes.
const COLOR_KEY: &str = "36";
const COLOR_STRING: &str = "32";
const COLOR_NUMBER: &str = "33";
const COLOR_LITERAL: &str = "35";
const COLOR_PUNCT: &str = "39";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Layout {
    Compact,
    Pretty { color: bool },
}

pub fn render_json(value: &Value, layout: Layout) -> String {
    match layout {
        Layout::Compact => value.to_string(),
        Layout::Pretty { color } => {
            let mut painter = Painter {
                color,
                out: String::new(),
            };
            painter.value(value, 0);
            painter.out
        }
    }
}

struct Painter {
    color: bool,
    out: String,
}

impl Painter {
    fn value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null => self.token("null", COLOR_LITERAL),
            Value::Bool(flag) => self.token(if *flag { "true" } else { "false" }, COLOR_LITERAL),
            Value::Number(num) => self.token(&num.to_string(), COLOR_NUMBER),
            Value::String(text) => self.token(&quote(text), COLOR_STRING),
            Value::Array(items) => self.array(items, depth),
            Value::Object(map) => self.object(map, depth),
        }
    }

    fn array(&mut self, items: &[Value], depth: usize) {
        if items.is_empty() {
            self.token("[]", COLOR_PUNCT);
            return;
        }
        self.token("[", COLOR_PUNCT);
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.token(",", COLOR_PUNCT);
            }
            self.newline(depth + 1);
            self.value(item, depth + 1);
        }
        self.newline(depth);
        self.token("]", COLOR_PUNCT);
    }

    fn object(&mut self, map: &Map<String, Value>, depth: usize) {
        if map.is_empty() {
            self.token("{}", COLOR_PUNCT);
            return;
        }
        self.token("{", COLOR_PUNCT);
        for (idx, (key, value)) in map.iter().enumerate() {
            if idx > 0 {
                self.token(",", COLOR_PUNCT);
            }
            self.newline(depth + 1);
            self.token(&quote(key), COLOR_KEY);
            self.token(":", COLOR_PUNCT);
            self.out.push(' ');
            self.value(value, depth + 1);
        }
        self.newline(depth);
        self.token("}", COLOR_PUNCT);
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
    }

    fn token(&mut self, text: &str, color: &str) {
        if self.color {
            self.out.push_str("\u{1b}[");
            self.out.push_str(color);
            self.out.push('m');
            self.out.push_str(text);
            self.out.push_str("\u{1b}[0m");
        } else {
            self.out.push_str(text);
        }
    }
}

fn quote(text: &str) -> String {
    Value::String(text.to_owned()).to_string()
}
