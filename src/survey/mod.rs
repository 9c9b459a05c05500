//! Survey flow: three fixed steps, accumulated answers, one completion call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::backend::Backend;
use crate::store::{SessionStore, SurveyRecord};

/// Number of steps; reaching this index triggers completion.
pub const SURVEY_STEP_COUNT: u32 = 3;

/// Invoked once per successful survey completion.
pub type CompletionCallback = Box<dyn Fn() + Send + Sync>;

/// The survey steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyStep {
    HealthProfile,
    LifestyleHabits,
    EnvironmentalSensitivities,
}

impl SurveyStep {
    pub const ALL: [SurveyStep; 3] = [
        Self::HealthProfile,
        Self::LifestyleHabits,
        Self::EnvironmentalSensitivities,
    ];

    /// The step rendered at `index`, if any.
    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(&self) -> u32 {
        match self {
            Self::HealthProfile => 0,
            Self::LifestyleHabits => 1,
            Self::EnvironmentalSensitivities => 2,
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            Self::HealthProfile => "Health Profile",
            Self::LifestyleHabits => "Lifestyle Habits",
            Self::EnvironmentalSensitivities => "Environmental Sensitivities",
        }
    }

    /// Key under which this step's answers are stored.
    pub fn data_key(&self) -> &'static str {
        match self {
            Self::HealthProfile => "healthProfile",
            Self::LifestyleHabits => "lifestyleHabits",
            Self::EnvironmentalSensitivities => "environmentalSensitivities",
        }
    }

    /// Label of the step's single advance action.
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::EnvironmentalSensitivities => "Complete Survey",
            _ => "Next",
        }
    }
}

impl std::fmt::Display for SurveyStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.heading())
    }
}

/// What the survey renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyView {
    Step(SurveyStep),
    /// Past the last step; nothing to render.
    Finished,
}

/// Result of advancing the survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Moved to `step`, no request made.
    Advanced { step: u32 },
    /// Completion acknowledged, record cleared, callback invoked.
    Completed,
    /// Completion request failed; logged, nothing else changes.
    CompletionFailed,
    /// No step is showing, so there is no action to take.
    Idle,
}

#[derive(Debug, Default)]
struct SurveyState {
    current_step: u32,
    data: Map<String, Value>,
}

/// Owns survey progress and is its only writer to the store.
pub struct SurveyFlow {
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn Backend>,
    on_complete: CompletionCallback,
    state: RwLock<SurveyState>,
    completing: AtomicBool,
}

/// Clears the completing flag however the request ends.
struct CompletingGuard<'a>(&'a AtomicBool);

impl Drop for CompletingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SurveyFlow {
    /// Create the flow, resuming from a survey record already in the session.
    ///
    /// A record marked completed hydrates past the last step.
    pub async fn hydrate(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn Backend>,
        on_complete: CompletionCallback,
    ) -> Self {
        let state = match store.get_survey().await {
            Some(record) if record.is_completed() => SurveyState {
                current_step: SURVEY_STEP_COUNT,
                data: record.data.unwrap_or_default(),
            },
            Some(record) => SurveyState {
                current_step: record.last_step.unwrap_or(0),
                data: record.data.unwrap_or_default(),
            },
            None => SurveyState::default(),
        };
        debug!(step = state.current_step, keys = state.data.len(), "Survey hydrated");

        Self {
            store,
            backend,
            on_complete,
            state: RwLock::new(state),
            completing: AtomicBool::new(false),
        }
    }

    pub async fn current_step(&self) -> u32 {
        self.state.read().await.current_step
    }

    pub async fn survey_data(&self) -> Map<String, Value> {
        self.state.read().await.data.clone()
    }

    /// Whether the completion request is in flight.
    pub fn is_completing(&self) -> bool {
        self.completing.load(Ordering::SeqCst)
    }

    pub async fn view(&self) -> SurveyView {
        match SurveyStep::from_index(self.current_step().await) {
            Some(step) => SurveyView::Step(step),
            None => SurveyView::Finished,
        }
    }

    /// Shallow-merge `partial` into the answers and persist them.
    ///
    /// The persisted `lastStep` is `current_step + 1`: it is written ahead of
    /// the transition that `handle_next_step` performs.
    pub async fn update_survey_data(&self, partial: Map<String, Value>) {
        let record = {
            let mut state = self.state.write().await;
            state.data.extend(partial);
            SurveyRecord {
                last_step: Some(state.current_step.saturating_add(1)),
                data: Some(state.data.clone()),
                completed: None,
            }
        };
        self.store.save_survey(&record).await;
    }

    /// Move to the next step; on reaching the end, report completion.
    pub async fn handle_next_step(&self) -> AdvanceOutcome {
        let next = {
            let mut state = self.state.write().await;
            state.current_step = state.current_step.saturating_add(1);
            state.current_step
        };

        if next != SURVEY_STEP_COUNT {
            debug!(step = next, "Survey advanced");
            return AdvanceOutcome::Advanced { step: next };
        }

        self.completing.store(true, Ordering::SeqCst);
        let result = {
            let _guard = CompletingGuard(&self.completing);
            self.backend.complete_survey().await
        };

        match result {
            Ok(()) => {
                self.store.clear_survey().await;
                info!("Survey completed");
                (self.on_complete)();
                AdvanceOutcome::Completed
            }
            Err(e) => {
                error!(error = %e, status = ?e.status(), "Error completing survey");
                AdvanceOutcome::CompletionFailed
            }
        }
    }

    /// The current step's action: record its placeholder answer, then advance.
    pub async fn advance(&self) -> AdvanceOutcome {
        let step = match self.view().await {
            SurveyView::Step(step) => step,
            SurveyView::Finished => return AdvanceOutcome::Idle,
        };

        let mut partial = Map::new();
        partial.insert(step.data_key().to_string(), Value::Object(Map::new()));
        self.update_survey_data(partial).await;
        self.handle_next_step().await
    }
}
