//! Dispatch engine: send one prompt to one or many targets.
//!
//! Each target runs in its own task on the multi-threaded runtime, so total
//! wall time is roughly the slowest target, not the sum. A failing or
//! panicking target becomes a failed `DispatchResult`; its siblings are
//! unaffected. Results always come back in request order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{AiError, ErrorKind, Result};
use crate::providers::{InvokeOptions, ProviderName, ProviderRegistry};
use crate::resolve::DispatchTarget;

#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    pub invoke: InvokeOptions,
    /// Per-target deadline; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchFailure {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

impl From<&AiError> for DispatchFailure {
    fn from(e: &AiError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
            hint: e.hint(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub alias: String,
    pub provider: ProviderName,
    pub model: String,
    pub output: String,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DispatchFailure>,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl DispatchResult {
    fn new(target: &DispatchTarget, outcome: Result<String>, elapsed: Duration) -> Self {
        let (output, error) = match outcome {
            Ok(text) => (text, None),
            Err(e) => {
                tracing::warn!(alias = %target.alias, error = %e, "target failed");
                (String::new(), Some(DispatchFailure::from(&e)))
            }
        };
        Self {
            alias: target.alias.clone(),
            provider: target.provider,
            model: target.model.clone(),
            output,
            elapsed,
            error,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Elapsed seconds with one decimal, as shown in headers.
    pub fn elapsed_label(&self) -> String {
        format!("{:.1}s", self.elapsed.as_secs_f64())
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
}

impl Dispatcher {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Invoke a single target, surfacing the error itself.
    pub async fn invoke(
        &self,
        target: &DispatchTarget,
        prompt: &str,
        options: DispatchOptions,
    ) -> Result<String> {
        let provider = self.registry.get(target.provider)?;
        tracing::debug!(alias = %target.alias, provider = %target.provider, model = %target.model, "dispatching");
        let call = provider.invoke(&target.model, prompt, options.invoke);
        match options.timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| AiError::Timeout {
                    provider: target.provider.to_string(),
                    after,
                })?,
            None => call.await,
        }
    }

    pub async fn dispatch_one(
        &self,
        target: &DispatchTarget,
        prompt: &str,
        options: DispatchOptions,
    ) -> DispatchResult {
        let started = Instant::now();
        let outcome = self.invoke(target, prompt, options).await;
        let elapsed = started.elapsed();
        tracing::debug!(alias = %target.alias, elapsed_ms = elapsed.as_millis() as u64, ok = outcome.is_ok(), "target finished");
        DispatchResult::new(target, outcome, elapsed)
    }

    pub async fn dispatch_many(
        &self,
        targets: &[DispatchTarget],
        prompt: &str,
        options: DispatchOptions,
    ) -> Vec<DispatchResult> {
        let prompt: Arc<str> = Arc::from(prompt);
        let started = Instant::now();

        let handles: Vec<_> = targets
            .iter()
            .map(|target| {
                let engine = self.clone();
                let prompt = prompt.clone();
                let task_target = target.clone();
                let handle = tokio::spawn(async move {
                    engine.dispatch_one(&task_target, &prompt, options).await
                });
                (target, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (target, handle) in handles {
            let result = match handle.await {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(alias = %target.alias, error = %e, "dispatch task aborted");
                    let err = AiError::provider(target.provider, format!("task aborted: {e}"));
                    DispatchResult::new(target, Err(err), started.elapsed())
                }
            };
            results.push(result);
        }
        tracing::info!(
            targets = results.len(),
            failed = results.iter().filter(|r| !r.is_ok()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dispatch finished"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::{FakeProvider, Script};

    fn target(alias: &str, provider: ProviderName, model: &str) -> DispatchTarget {
        DispatchTarget {
            alias: alias.into(),
            provider,
            model: model.into(),
        }
    }

    fn engine() -> Dispatcher {
        let claude = FakeProvider::new(ProviderName::Claude)
            .script("a", Script::Reply("from a".into()))
            .script("b", Script::Fail("boom".into()))
            .script("c", Script::Reply("from c".into()));
        let gemini = FakeProvider::new(ProviderName::Gemini)
            .script("slow1", Script::Sleep(Duration::from_millis(100)))
            .script("slow2", Script::Sleep(Duration::from_millis(200)))
            .script("slow3", Script::Sleep(Duration::from_millis(300)));
        Dispatcher::new(
            ProviderRegistry::empty()
                .with(Arc::new(claude))
                .with(Arc::new(gemini)),
        )
    }

    #[tokio::test]
    async fn failure_is_isolated_and_order_kept() {
        let targets = vec![
            target("A", ProviderName::Claude, "a"),
            target("B", ProviderName::Claude, "b"),
            target("C", ProviderName::Claude, "c"),
        ];
        let results = engine()
            .dispatch_many(&targets, "hi", DispatchOptions::default())
            .await;
        let names: Vec<_> = results.iter().map(|r| r.alias.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(results[0].output, "from a");
        assert!(results[0].is_ok());
        let failure = results[1].error.as_ref().unwrap();
        assert_eq!(failure.kind, ErrorKind::Provider);
        assert!(failure.message.contains("boom"));
        assert_eq!(results[2].output, "from c");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn targets_run_concurrently() {
        let targets = vec![
            target("s1", ProviderName::Gemini, "slow1"),
            target("s2", ProviderName::Gemini, "slow2"),
            target("s3", ProviderName::Gemini, "slow3"),
        ];
        let started = Instant::now();
        let results = engine()
            .dispatch_many(&targets, "p", DispatchOptions::default())
            .await;
        let total = started.elapsed();
        assert!(results.iter().all(DispatchResult::is_ok));
        assert!(total < Duration::from_millis(550), "took {total:?}");
        assert!(results[2].elapsed >= Duration::from_millis(300));
        assert!(results[0].elapsed < results[2].elapsed);
    }

    #[tokio::test]
    async fn timeout_becomes_failed_result() {
        let options = DispatchOptions {
            timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let r = engine()
            .dispatch_one(&target("s3", ProviderName::Gemini, "slow3"), "p", options)
            .await;
        assert_eq!(r.error.unwrap().kind, ErrorKind::Timeout);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn timed_out_target_does_not_hold_back_siblings() {
        let targets = vec![
            target("A", ProviderName::Claude, "a"),
            target("s3", ProviderName::Gemini, "slow3"),
            target("C", ProviderName::Claude, "c"),
        ];
        let options = DispatchOptions {
            timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        };
        let started = Instant::now();
        let results = engine().dispatch_many(&targets, "p", options).await;
        let total = started.elapsed();

        let kinds: Vec<_> = results
            .iter()
            .map(|r| r.error.as_ref().map(|e| e.kind))
            .collect();
        assert_eq!(kinds, vec![None, Some(ErrorKind::Timeout), None]);
        assert_eq!(results[0].output, "from a");
        assert_eq!(results[2].output, "from c");
        assert!(total < Duration::from_millis(250), "took {total:?}");
    }

    #[tokio::test]
    async fn unregistered_provider_is_provider_error() {
        let r = engine()
            .dispatch_one(
                &target("glm", ProviderName::Glm, "glm-5"),
                "p",
                DispatchOptions::default(),
            )
            .await;
        assert_eq!(r.error.unwrap().kind, ErrorKind::Provider);
    }

    #[tokio::test]
    async fn options_pass_through() {
        let fake = Arc::new(FakeProvider::new(ProviderName::Codex));
        let engine = Dispatcher::new(ProviderRegistry::empty().with(fake.clone()));
        let options = DispatchOptions {
            invoke: InvokeOptions {
                json_mode: true,
                auto_approve: true,
            },
            timeout: None,
        };
        let out = engine
            .invoke(&target("gpt", ProviderName::Codex, "gpt-5.2"), "q", options)
            .await
            .unwrap();
        assert_eq!(out, "gpt-5.2:q");
        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls[0].2, options.invoke);
    }

    #[test]
    fn result_serializes_elapsed_in_ms() {
        let r = DispatchResult::new(
            &target("x", ProviderName::Claude, "m"),
            Ok("out".into()),
            Duration::from_millis(1234),
        );
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["elapsed_ms"], 1234);
        assert!(v.get("error").is_none());
        assert_eq!(r.elapsed_label(), "1.2s");
    }
}
