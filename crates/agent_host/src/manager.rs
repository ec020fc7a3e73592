//! Registry of open chat sessions.

use crate::session::SessionController;
use crate::surface::ChatSurface;
use crate::turn::TurnDeps;
use shared::ModelChoice;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerStatus {
    /// Sessions still open.
    Active(usize),
    /// The last session was closed; the app should exit.
    Empty,
}

pub struct SessionManager<S: ChatSurface> {
    deps: TurnDeps,
    sessions: HashMap<String, SessionController<S>>,
    /// Creation order, for tab layout.
    order: Vec<String>,
    counter: usize,
    model: ModelChoice,
    use_gpu: bool,
}

impl<S: ChatSurface> SessionManager<S> {
    /// Starts with the configured default model and GPU preference selected.
    pub fn new(deps: TurnDeps) -> Self {
        let model = deps.config.default_model.clone();
        let use_gpu = deps.config.default_use_gpu;
        Self {
            deps,
            sessions: HashMap::new(),
            order: Vec::new(),
            counter: 0,
            model,
            use_gpu,
        }
    }

    /// Model and GPU preference for sessions created from now on.
    pub fn set_selection(&mut self, model: ModelChoice, use_gpu: bool) {
        self.model = model;
        self.use_gpu = use_gpu;
    }

    /// Open a session with the current selection and return its id.
    pub fn create_session(&mut self, surface: S) -> String {
        self.counter += 1;
        let id = format!("chat_{}", self.counter);
        let session = SessionController::new(
            id.clone(),
            self.counter,
            surface,
            self.deps.clone(),
            self.model.clone(),
            self.use_gpu,
        );
        self.sessions.insert(id.clone(), session);
        self.order.push(id.clone());
        id
    }

    /// Drop a session. Closing an unknown id is a no-op.
    pub fn close_session(&mut self, id: &str) -> ManagerStatus {
        if self.sessions.remove(id).is_some() {
            self.order.retain(|o| o != id);
            tracing::info!(id, remaining = self.sessions.len(), "chat session closed");
        }
        if self.sessions.is_empty() {
            ManagerStatus::Empty
        } else {
            ManagerStatus::Active(self.sessions.len())
        }
    }

    /// Drain the event queues of every session.
    pub fn poll_all(&mut self) -> usize {
        self.sessions.values_mut().map(|s| s.poll()).sum()
    }

    pub fn get(&self, id: &str) -> Option<&SessionController<S>> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SessionController<S>> {
        self.sessions.get_mut(id)
    }

    /// Session ids in creation order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }
}
