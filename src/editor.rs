#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPolicy {
    Start,
    End,
}

pub trait Editor {
    fn text(&self) -> String;
    fn set_text(&mut self, text: &str, cursor: CursorPolicy);
}

/// Text buffer behind the code editor panel.
///
/// The gui edits `text` in place; a replaced buffer leaves a pending cursor
/// move that the gui applies on the next frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeEditor {
    pub text: String,
    pending_cursor: Option<CursorPolicy>,
}

impl CodeEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_pending_cursor(&mut self) -> Option<usize> {
        self.pending_cursor.take().map(|policy| match policy {
            CursorPolicy::Start => 0,
            CursorPolicy::End => self.text.chars().count(),
        })
    }
}

impl Editor for CodeEditor {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str, cursor: CursorPolicy) {
        self.text = text.to_string();
        self.pending_cursor = Some(cursor);
    }
}
