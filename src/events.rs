use std::collections::{HashMap, VecDeque};
use strum_macros::{Display, EnumDiscriminants};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(EventKind), derive(Hash, Display))]
pub enum AppEvent {
    /// A plugin's options for `step` were mutated.
    StepOptionsChanged { plugin: String, step: usize },
    /// The current step changed or was re-run.
    StepRun,
    DeviceChanged { name: Option<String> },
    ExperimentLogChanged { experiment_id: u32 },
    ExperimentLogSelectionChanged { times: Vec<f64> },
    /// Secondary click; the shell should open its context menu.
    MenuRequested { electrode: Option<usize> },
    /// Something the user should see: bad input or an unsupported state.
    ValidationError { message: String },
}

pub type Handler = Box<dyn FnMut(&AppEvent)>;

/// Per-kind observer lists plus a queue of emitted events.
///
/// `emit` is called after the mutation it describes. Subscribers run
/// immediately in registration order; the event is also queued so the owning
/// context can run its own reactions via [`EventBus::drain`].
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<EventKind, Vec<Handler>>,
    pending: VecDeque<AppEvent>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field(
                "subscribers",
                &self
                    .subscribers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.len()))
                    .collect::<Vec<_>>(),
            )
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&AppEvent) + 'static,
    {
        self.subscribers
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    pub fn emit(&mut self, event: AppEvent) {
        let kind = EventKind::from(&event);
        debug!("emit {}: {:?}", kind, event);
        if let Some(handlers) = self.subscribers.get_mut(&kind) {
            for h in handlers.iter_mut() {
                h(&event);
            }
        }
        self.pending.push_back(event);
    }

    pub fn report(&mut self, message: impl Into<String>) {
        self.emit(AppEvent::ValidationError {
            message: message.into(),
        });
    }

    pub fn pop(&mut self) -> Option<AppEvent> {
        self.pending.pop_front()
    }

    pub fn drain(&mut self) -> Vec<AppEvent> {
        self.pending.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
