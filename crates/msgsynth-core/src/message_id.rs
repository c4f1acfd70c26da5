use serde::{Deserialize, Serialize};

/// Renders a message id and project code into the literal prefix placed before the
/// message text. The synthesizer treats the result as an opaque string.
pub trait MessageIdFormatter {
    fn format_id(&self, project_code: &str, id: u32) -> String;
}

impl<F> MessageIdFormatter for F
where
    F: Fn(&str, u32) -> String,
{
    fn format_id(&self, project_code: &str, id: u32) -> String {
        self(project_code, id)
    }
}

/// Widest zero-padded id a config may ask for.
pub const MAX_ID_WIDTH: usize = 32;

/// Configurable prefix policy: `<code><separator><id padded to width><suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdFormat {
    pub width: usize,
    pub pad: char,
    pub separator: String,
    pub suffix: String,
}

impl Default for IdFormat {
    fn default() -> Self {
        IdFormat {
            width: 6,
            pad: '0',
            separator: String::new(),
            suffix: ": ".to_string(),
        }
    }
}

impl MessageIdFormatter for IdFormat {
    fn format_id(&self, project_code: &str, id: u32) -> String {
        let digits = id.to_string();
        let width = self.width.min(MAX_ID_WIDTH);
        let mut out = String::new();
        out.push_str(project_code);
        out.push_str(&self.separator);
        for _ in digits.len()..width {
            out.push(self.pad);
        }
        out.push_str(&digits);
        out.push_str(&self.suffix);
        out
    }
}
