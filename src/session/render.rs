use crate::session::history::MessageRecord;

/// Display surface the chat renders into.
pub trait Renderer {
    fn render(&mut self, record: &MessageRecord);

    /// Transient "typing" placeholder while a reply is pending.
    fn show_typing(&mut self) {}

    fn hide_typing(&mut self) {}
}

/// Collects rendered turns in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    pub rendered: Vec<MessageRecord>,
    pub typing_shown: usize,
    pub typing_visible: bool,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, record: &MessageRecord) {
        self.rendered.push(record.clone());
    }

    fn show_typing(&mut self) {
        self.typing_shown += 1;
        self.typing_visible = true;
    }

    fn hide_typing(&mut self) {
        self.typing_visible = false;
    }
}
