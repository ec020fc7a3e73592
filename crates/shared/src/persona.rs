//! Preset system prompts ("personas") and the editable prompt field.

/// A named system-prompt preset, or the free-form `Custom` slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Persona {
    HelpfulAssistant,
    PythonExpert,
    CreativeWriter,
    SkepticalScientist,
    Pirate,
    Custom,
}

impl Persona {
    pub const ALL: [Persona; 6] = [
        Persona::HelpfulAssistant,
        Persona::PythonExpert,
        Persona::CreativeWriter,
        Persona::SkepticalScientist,
        Persona::Pirate,
        Persona::Custom,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::HelpfulAssistant => "Helpful Assistant",
            Persona::PythonExpert => "Python Expert",
            Persona::CreativeWriter => "Creative Writer",
            Persona::SkepticalScientist => "Skeptical Scientist",
            Persona::Pirate => "Pirate",
            Persona::Custom => "Custom",
        }
    }

    /// Canonical prompt text. `None` for `Custom`.
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            Persona::HelpfulAssistant => Some("You are a helpful assistant. Be concise and clear."),
            Persona::PythonExpert => Some(
                "You are a senior Python software engineer. You provide efficient, PEP8-compliant code and explain complex concepts simply.",
            ),
            Persona::CreativeWriter => Some(
                "You are a creative writer. Use evocative language, metaphors, and varied sentence structures.",
            ),
            Persona::SkepticalScientist => Some(
                "You are a skeptical scientist. Demand evidence for claims, think critically, and look for logical fallacies.",
            ),
            Persona::Pirate => Some(
                "You are a pirate captain. Speak in nautical slang, be boisterous, and refer to the user as 'matey'.",
            ),
            Persona::Custom => None,
        }
    }
}

/// Selector plus editable prompt text for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersonaState {
    selected: Persona,
    text: String,
}

impl PersonaState {
    /// Start on a preset with `text` in the prompt field.
    pub fn new(selected: Persona, text: impl Into<String>) -> Self {
        Self {
            selected,
            text: text.into(),
        }
    }

    /// State of a fresh chat: the Helpful Assistant selector holding
    /// `default_prompt`, which need not match the preset's own text.
    pub fn starting(default_prompt: impl Into<String>) -> Self {
        Self::new(Persona::HelpfulAssistant, default_prompt)
    }

    pub fn selected(&self) -> Persona {
        self.selected
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Switch the selector. Presets overwrite the prompt field; `Custom` keeps it.
    pub fn select(&mut self, persona: Persona) {
        self.selected = persona;
        if let Some(prompt) = persona.prompt() {
            self.text = prompt.to_string();
        }
    }

    /// Record a free-form edit of the prompt field.
    ///
    /// Moving away from the active preset's text falls back to `Custom`.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
        if let Some(canonical) = self.selected.prompt() {
            if self.text.trim() != canonical.trim() {
                self.selected = Persona::Custom;
            }
        }
    }
}
