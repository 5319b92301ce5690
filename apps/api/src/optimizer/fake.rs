//! In-process `CvGateway` for tests: canned results, optional failures, call counters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::GatewayError;
use crate::optimizer::gateway::CvGateway;
use crate::optimizer::models::tests::{sample_analysis, sample_optimization, sample_tailored};
use crate::optimizer::models::{AtsAnalysis, OptimizationResult, TailoredResult};

#[derive(Default)]
pub struct FakeGateway {
    fail_analyze: bool,
    fail_optimize: bool,
    fail_tailor: bool,
    delay: Option<Duration>,
    analyze_calls: AtomicUsize,
    optimize_calls: AtomicUsize,
    tailor_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn failing_analyze(mut self) -> Self {
        self.fail_analyze = true;
        self
    }

    pub fn failing_optimize(mut self) -> Self {
        self.fail_optimize = true;
        self
    }

    pub fn failing_tailor(mut self) -> Self {
        self.fail_tailor = true;
        self
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn optimize_calls(&self) -> usize {
        self.optimize_calls.load(Ordering::SeqCst)
    }

    pub fn tailor_calls(&self) -> usize {
        self.tailor_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CvGateway for FakeGateway {
    async fn analyze(&self, _cv_text: &str) -> Result<AtsAnalysis, GatewayError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.fail_analyze {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(sample_analysis())
    }

    async fn optimize(
        &self,
        _cv_text: &str,
        _analysis: &AtsAnalysis,
    ) -> Result<OptimizationResult, GatewayError> {
        self.optimize_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.fail_optimize {
            return Err(GatewayError::SchemaMismatch("missing field `rationale`".into()));
        }
        Ok(sample_optimization())
    }

    async fn tailor(
        &self,
        _cv_markdown: &str,
        _job_description: &str,
    ) -> Result<TailoredResult, GatewayError> {
        self.tailor_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.fail_tailor {
            return Err(GatewayError::Api {
                status: 503,
                message: "overloaded".into(),
            });
        }
        Ok(sample_tailored())
    }
}
