use std::fmt;

/// Player control bar button. Behaviour is injected as a callback.
pub struct ControlButton {
    label: String,
    icon: String,
    on_press: Box<dyn FnMut() + Send>,
}

impl ControlButton {
    pub fn new<F>(label: impl Into<String>, icon: impl Into<String>, on_press: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self {
            label: label.into(),
            icon: icon.into(),
            on_press: Box::new(on_press),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn press(&mut self) {
        (self.on_press)()
    }
}

impl fmt::Debug for ControlButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlButton")
            .field("label", &self.label)
            .field("icon", &self.icon)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ControlBar {
    buttons: Vec<ControlButton>,
}

impl ControlBar {
    pub fn add(&mut self, button: ControlButton) {
        self.buttons.push(button);
    }

    /// Presses the button with the given label. Returns `false` if there is none.
    pub fn press(&mut self, label: &str) -> bool {
        match self.buttons.iter_mut().find(|b| b.label == label) {
            Some(button) => {
                button.press();
                true
            }
            None => false,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.buttons.iter().map(|b| b.label())
    }
}
