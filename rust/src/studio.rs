use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::error::{LogoError, Result};
use crate::generation::GenerationClient;
use crate::key_gate::KeyGate;
use crate::logo::{GeneratedLogo, GenerationPhase, LogoRequest};

pub const KEY_REJECTED_MESSAGE: &str =
    "API Key verification failed. Please try selecting the key again.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong while generating the logo.";
pub const CANCELLED_MESSAGE: &str = "Generation cancelled.";

/// What the page needs to render the current phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioSnapshot {
    pub phase: GenerationPhase,
    pub logo: Option<GeneratedLogo>,
    pub error: Option<String>,
}

struct StudioState {
    phase: GenerationPhase,
    logo: Option<GeneratedLogo>,
    error: Option<String>,
    in_flight: Option<InFlight>,
    next_generation: u64,
}

struct InFlight {
    id: u64,
    cancel: Arc<Notify>,
}

/// Orchestrates gate, idle, generating, and result phases. At most one
/// generation is in flight; entry to `Generating` is a check-and-set.
pub struct LogoStudio {
    gate: KeyGate,
    client: GenerationClient,
    state: Mutex<StudioState>,
}

impl LogoStudio {
    pub fn new(gate: KeyGate, client: GenerationClient) -> Self {
        Self {
            gate,
            client,
            state: Mutex::new(StudioState {
                phase: GenerationPhase::AwaitingKey,
                logo: None,
                error: None,
                in_flight: None,
                next_generation: 1,
            }),
        }
    }

    pub fn gate(&self) -> &KeyGate {
        &self.gate
    }

    pub fn snapshot(&self) -> StudioSnapshot {
        let state = self.lock();
        StudioSnapshot {
            phase: state.phase,
            logo: state.logo.clone(),
            error: state.error.clone(),
        }
    }

    /// Re-checks the key while the gate is closed. Outside the gate this only
    /// reports the current state.
    pub async fn verify_key(&self) -> StudioSnapshot {
        if !self.enter_key_check() {
            return self.snapshot();
        }
        let present = self.gate.check_key().await;
        self.finish_key_check(present)
    }

    /// Runs the host selection flow, then re-checks.
    pub async fn select_key(&self) -> StudioSnapshot {
        if !self.enter_key_check() {
            return self.snapshot();
        }
        let present = self.gate.select_and_verify().await;
        self.finish_key_check(present)
    }

    /// Only the first check after startup runs implicitly.
    pub async fn ensure_key_checked(&self) -> StudioSnapshot {
        let awaiting = self.lock().phase == GenerationPhase::AwaitingKey;
        if awaiting {
            return self.verify_key().await;
        }
        self.snapshot()
    }

    pub async fn submit(&self, request: LogoRequest) -> Result<StudioSnapshot> {
        request.validate()?;

        let (id, cancel) = {
            let mut state = self.lock();
            if state.phase.is_gated() || !self.gate.is_open() {
                return Err(LogoError::KeyUnavailable);
            }
            if state.phase == GenerationPhase::Generating {
                return Err(LogoError::Busy);
            }

            let id = state.next_generation;
            state.next_generation += 1;
            let cancel = Arc::new(Notify::new());
            state.phase = GenerationPhase::Generating;
            state.logo = None;
            state.error = None;
            state.in_flight = Some(InFlight {
                id,
                cancel: cancel.clone(),
            });
            (id, cancel)
        };

        tracing::info!(brand = %request.brand_name.trim(), style = %request.style, "generating logo");
        let mut guard = InFlightGuard {
            studio: self,
            id,
            armed: true,
        };

        let outcome = tokio::select! {
            result = self.client.generate(&request) => result,
            _ = cancel.notified() => Err(LogoError::Cancelled),
        };

        guard.armed = false;
        self.apply_outcome(id, outcome);
        Ok(self.snapshot())
    }

    /// Aborts the in-flight generation. Returns `false` if none was running.
    pub fn cancel(&self) -> bool {
        let mut state = self.lock();
        let Some(in_flight) = state.in_flight.take() else {
            return false;
        };
        in_flight.cancel.notify_one();
        state.phase = GenerationPhase::Idle;
        state.error = Some(CANCELLED_MESSAGE.to_string());
        tracing::info!(generation = in_flight.id, "generation cancelled");
        true
    }

    /// Discards the result or error and returns to the empty form.
    pub fn new_design(&self) -> StudioSnapshot {
        {
            let mut state = self.lock();
            if matches!(
                state.phase,
                GenerationPhase::Ready | GenerationPhase::Failed | GenerationPhase::Idle
            ) {
                state.phase = GenerationPhase::Idle;
                state.logo = None;
                state.error = None;
            }
        }
        self.snapshot()
    }

    fn enter_key_check(&self) -> bool {
        let mut state = self.lock();
        if !state.phase.is_gated() {
            return false;
        }
        state.phase = GenerationPhase::AwaitingKey;
        true
    }

    fn finish_key_check(&self, present: bool) -> StudioSnapshot {
        {
            let mut state = self.lock();
            if state.phase == GenerationPhase::AwaitingKey {
                if present {
                    state.phase = GenerationPhase::Idle;
                } else {
                    state.phase = GenerationPhase::KeyRequired;
                }
            }
        }
        if !present {
            tracing::info!("API key required");
        }
        self.snapshot()
    }

    fn apply_outcome(&self, id: u64, outcome: Result<GeneratedLogo>) {
        let mut state = self.lock();
        if state.in_flight.as_ref().map(|f| f.id) != Some(id) {
            // Cancelled while the provider was answering.
            return;
        }
        state.in_flight = None;

        match outcome {
            Ok(logo) => {
                state.phase = GenerationPhase::Ready;
                state.logo = Some(logo);
                state.error = None;
            }
            Err(LogoError::Cancelled) => {
                state.phase = GenerationPhase::Idle;
                state.error = Some(CANCELLED_MESSAGE.to_string());
            }
            Err(err) if err.is_credential_rejection() => {
                tracing::warn!("provider rejected the selected key: {err}");
                self.gate.invalidate();
                state.phase = GenerationPhase::KeyRequired;
                state.error = Some(KEY_REJECTED_MESSAGE.to_string());
            }
            Err(LogoError::KeyUnavailable) => {
                self.gate.invalidate();
                state.phase = GenerationPhase::KeyRequired;
                state.error = None;
            }
            Err(err) => {
                tracing::warn!("logo generation failed: {err}");
                let message = err.to_string();
                state.phase = GenerationPhase::Failed;
                state.error = Some(if message.trim().is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    message
                });
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, StudioState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the studio to `Idle` if a submit future is dropped mid-request.
struct InFlightGuard<'a> {
    studio: &'a LogoStudio,
    id: u64,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.studio.lock();
        if state.in_flight.as_ref().map(|f| f.id) == Some(self.id) {
            state.in_flight = None;
            state.phase = GenerationPhase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ENTITY_NOT_FOUND;
    use crate::gemini::{
        classify_error, GenerateContentRequest, GenerateContentResponse, ImageProvider,
        ProviderFactory,
    };
    use crate::generation::tests::{image_response, ScriptedFactory, PNG_BASE64};
    use crate::key_gate::tests::FakeHost;
    use crate::logo::LogoStyle;
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn studio_with(
        host: Arc<FakeHost>,
        factory: Arc<dyn ProviderFactory>,
    ) -> Arc<LogoStudio> {
        let gate = KeyGate::new(Some(host.clone()));
        let client = GenerationClient::new(Some(host), factory, "1K");
        Arc::new(LogoStudio::new(gate, client))
    }

    async fn open_studio(factory: Arc<dyn ProviderFactory>) -> Arc<LogoStudio> {
        let studio = studio_with(FakeHost::new(true, false), factory);
        assert_eq!(studio.verify_key().await.phase, GenerationPhase::Idle);
        studio
    }

    fn nexus() -> LogoRequest {
        LogoRequest::new("Nexus", LogoStyle::Modern)
    }

    /// Never answers; stands in for a hung provider.
    struct StalledFactory;

    struct StalledProvider;

    #[async_trait]
    impl ImageProvider for StalledProvider {
        async fn generate_content(
            &self,
            _request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            std::future::pending().await
        }
    }

    impl ProviderFactory for StalledFactory {
        fn connect(&self, _api_key: String) -> Box<dyn ImageProvider> {
            Box::new(StalledProvider)
        }
    }

    async fn wait_for_phase(studio: &LogoStudio, phase: GenerationPhase) {
        for _ in 0..100 {
            if studio.snapshot().phase == phase {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("studio never reached {phase:?}");
    }

    #[tokio::test]
    async fn starts_awaiting_key_and_gates_on_absent_key() {
        let host = FakeHost::new(false, false);
        let studio = studio_with(host.clone(), ScriptedFactory::with(vec![]));
        assert_eq!(studio.snapshot().phase, GenerationPhase::AwaitingKey);

        let snapshot = studio.ensure_key_checked().await;
        assert_eq!(snapshot.phase, GenerationPhase::KeyRequired);
        assert_eq!(host.selections.load(Ordering::SeqCst), 0);

        let err = studio.submit(nexus()).await.expect_err("gated");
        assert!(matches!(err, LogoError::KeyUnavailable));
    }

    #[tokio::test]
    async fn select_key_opens_gate() {
        let host = FakeHost::new(false, true);
        let studio = studio_with(host.clone(), ScriptedFactory::with(vec![]));
        studio.verify_key().await;

        let snapshot = studio.select_key().await;
        assert_eq!(snapshot.phase, GenerationPhase::Idle);
        assert_eq!(host.selections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nexus_scenario_reaches_ready() {
        let factory = ScriptedFactory::with(vec![Ok(image_response(PNG_BASE64))]);
        let studio = open_studio(factory.clone()).await;

        let request = nexus().with_colors("").with_slogan("").with_icon_symbol("");
        let snapshot = studio.submit(request).await.expect("submit");

        assert_eq!(snapshot.phase, GenerationPhase::Ready);
        assert_eq!(snapshot.error, None);
        let logo = snapshot.logo.expect("logo");
        assert!(logo.prompt_text().contains("Nexus"));
        assert!(logo.prompt_text().contains("Modern & Tech"));
        assert!(logo.prompt_text().contains("Brand appropriate colors"));
        assert!(logo.image_data().ends_with(PNG_BASE64));
    }

    #[tokio::test]
    async fn empty_brand_name_is_rejected_without_request() {
        let factory = ScriptedFactory::with(vec![Ok(image_response(PNG_BASE64))]);
        let studio = open_studio(factory.clone()).await;

        let err = studio
            .submit(LogoRequest::new("", LogoStyle::Modern))
            .await
            .expect_err("empty brand");
        assert!(matches!(err, LogoError::InvalidRequest(_)));
        assert_eq!(studio.snapshot().phase, GenerationPhase::Idle);
        assert!(factory.keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_submission_while_generating_is_busy() {
        let studio = open_studio(Arc::new(StalledFactory)).await;

        let first = {
            let studio = studio.clone();
            tokio::spawn(async move { studio.submit(nexus()).await })
        };
        wait_for_phase(&studio, GenerationPhase::Generating).await;

        let err = studio.submit(nexus()).await.expect_err("busy");
        assert!(matches!(err, LogoError::Busy));
        assert_eq!(studio.snapshot().phase, GenerationPhase::Generating);

        assert!(studio.cancel());
        let snapshot = first.await.expect("join").expect("submit");
        assert_eq!(snapshot.phase, GenerationPhase::Idle);
        assert_eq!(snapshot.error.as_deref(), Some(CANCELLED_MESSAGE));
    }

    #[tokio::test]
    async fn cancel_without_generation_is_noop() {
        let studio = open_studio(ScriptedFactory::with(vec![])).await;
        assert!(!studio.cancel());
        assert_eq!(studio.snapshot().phase, GenerationPhase::Idle);
    }

    #[tokio::test]
    async fn dropped_submission_releases_generating() {
        let studio = open_studio(Arc::new(StalledFactory)).await;
        let pending = tokio::time::timeout(Duration::from_millis(20), studio.submit(nexus())).await;
        assert!(pending.is_err());
        assert_eq!(studio.snapshot().phase, GenerationPhase::Idle);
    }

    #[tokio::test]
    async fn entity_not_found_resets_key_gate() {
        let factory = ScriptedFactory::with(vec![Err(LogoError::Api {
            status: 500,
            message: format!("{ENTITY_NOT_FOUND}."),
        })]);
        let studio = open_studio(factory).await;

        let snapshot = studio.submit(nexus()).await.expect("submit");
        assert_eq!(snapshot.phase, GenerationPhase::KeyRequired);
        assert_eq!(snapshot.error.as_deref(), Some(KEY_REJECTED_MESSAGE));
        assert!(!studio.gate().is_open());

        let err = studio.submit(nexus()).await.expect_err("gated again");
        assert!(matches!(err, LogoError::KeyUnavailable));
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced_verbatim_and_resubmittable() {
        let factory = ScriptedFactory::with(vec![
            Err(LogoError::Api {
                status: 503,
                message: "The model is overloaded.".into(),
            }),
            Ok(image_response(PNG_BASE64)),
        ]);
        let studio = open_studio(factory).await;

        let failed = studio.submit(nexus()).await.expect("submit");
        assert_eq!(failed.phase, GenerationPhase::Failed);
        assert_eq!(failed.error.as_deref(), Some("The model is overloaded."));

        let ready = studio.submit(nexus()).await.expect("resubmit");
        assert_eq!(ready.phase, GenerationPhase::Ready);
        assert_eq!(ready.error, None);
    }

    #[tokio::test]
    async fn permission_denied_keeps_gate_open_and_shows_message() {
        let body = r#"{"error":{"code":403,"message":"Generative Language API has not been used in project 1234 before or it is disabled.","status":"PERMISSION_DENIED","details":[{"reason":"SERVICE_DISABLED"}]}}"#;
        let factory = ScriptedFactory::with(vec![Err(classify_error(403, body))]);
        let studio = open_studio(factory).await;

        let snapshot = studio.submit(nexus()).await.expect("submit");
        assert_eq!(snapshot.phase, GenerationPhase::Failed);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Generative Language API has not been used in project 1234 before or it is disabled.")
        );
        assert!(studio.gate().is_open());
    }

    #[tokio::test]
    async fn no_image_data_fails_attempt() {
        let factory = ScriptedFactory::with(vec![Ok(GenerateContentResponse::default())]);
        let studio = open_studio(factory).await;
        let snapshot = studio.submit(nexus()).await.expect("submit");
        assert_eq!(snapshot.phase, GenerationPhase::Failed);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("No image data found in response.")
        );
    }

    #[tokio::test]
    async fn new_design_clears_result() {
        let factory = ScriptedFactory::with(vec![Ok(image_response(PNG_BASE64))]);
        let studio = open_studio(factory).await;
        studio.submit(nexus()).await.expect("submit");

        let snapshot = studio.new_design();
        assert_eq!(snapshot.phase, GenerationPhase::Idle);
        assert!(snapshot.logo.is_none());
        assert!(snapshot.error.is_none());
    }
}
