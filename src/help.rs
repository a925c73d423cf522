use tracing::debug;

const DEFAULT_TITLE: &str = "Help";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpEvent {
    CloseButton,
    /// Click on the dimmed area around the dialog.
    Backdrop,
    /// Click inside the dialog body.
    Dialog,
}

/// Modal dialog showing a title and body of help text.
#[derive(Debug, Default, Clone)]
pub struct HelpModal {
    title: String,
    body: String,
    visible: bool,
}

impl HelpModal {
    pub fn new() -> Self {
        HelpModal::default()
    }

    pub fn show(&mut self, title: Option<&str>, text: Option<&str>) {
        self.title = title
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();
        self.body = text.unwrap_or_default().to_string();
        self.visible = true;
        debug!(title = %self.title, "help shown");
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn handle(&mut self, event: HelpEvent) {
        match event {
            HelpEvent::CloseButton | HelpEvent::Backdrop => self.hide(),
            HelpEvent::Dialog => {}
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Help trigger carrying its title and text as attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldHelp {
    pub title: Option<String>,
    pub text: Option<String>,
}

impl FieldHelp {
    pub fn new(title: Option<String>, text: Option<String>) -> Self {
        FieldHelp { title, text }
    }

    pub fn activate(&self, modal: &mut HelpModal) {
        modal.show(self.title.as_deref(), self.text.as_deref());
    }
}
