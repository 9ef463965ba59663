use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use once_cell::sync::OnceCell;

use super::pattern::PatternIndex;
use super::types::{
    BuildInfo, EndpointSample, MatchPolicy, RequestFacts, BUILD_INFO_GAUGE, ENDPOINT_USAGE_COUNTER,
};
use crate::error::MetricsError;

/// Endpoint usage instrumentation shared by every metered route.
///
/// Owns its own Prometheus recorder instead of installing a process-wide
/// one, so the application (and each test) passes it around explicitly.
///
/// The pattern index is written exactly once by [`Instrumentation::init_index`]
/// after all routes are registered. Until then requests are served but not
/// measured.
pub struct Instrumentation {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    index: OnceCell<PatternIndex>,
    policy: MatchPolicy,
}

impl Instrumentation {
    pub fn new(policy: MatchPolicy) -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_counter!(ENDPOINT_USAGE_COUNTER, "Total number of requests per endpoint");
            describe_gauge!(BUILD_INFO_GAUGE, "General build information");
        });

        Self {
            recorder,
            handle,
            index: OnceCell::new(),
            policy,
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Builds the pattern index from every registered route pattern.
    pub fn init_index<I, P>(&self, patterns: I) -> Result<&PatternIndex, MetricsError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        if self.index.get().is_some() {
            return Err(MetricsError::IndexAlreadyBuilt);
        }

        let index = PatternIndex::build(patterns)?;
        self.index
            .set(index)
            .map_err(|_| MetricsError::IndexAlreadyBuilt)?;

        self.index.get().ok_or(MetricsError::IndexAlreadyBuilt)
    }

    pub fn index(&self) -> Option<&PatternIndex> {
        self.index.get()
    }

    pub fn is_ready(&self) -> bool {
        self.index.get().is_some()
    }

    /// Counts one completed request against every matching pattern.
    ///
    /// Returns how many increments were emitted. Never fails: an unmatched
    /// path or a missing index only means nothing is counted.
    pub fn record(&self, facts: &RequestFacts) -> usize {
        let Some(index) = self.index.get() else {
            tracing::debug!(path = %facts.path, "Pattern index not built, request not measured");
            return 0;
        };

        let mut emitted = 0;
        for pattern in index.matching(&facts.path) {
            let sample = EndpointSample::new(facts, pattern);
            let labels = sample.labels();

            metrics::with_local_recorder(&self.recorder, || {
                counter!(ENDPOINT_USAGE_COUNTER, labels.as_slice()).increment(1);
            });
            emitted += 1;

            if self.policy == MatchPolicy::FirstMatch {
                break;
            }
        }

        if emitted == 0 {
            tracing::debug!(path = %facts.path, "No route pattern matched, request not measured");
        }

        emitted
    }

    /// Publishes the constant `build_info` gauge.
    pub fn set_build_info(&self, info: &BuildInfo) {
        let labels = info.labels();

        metrics::with_local_recorder(&self.recorder, || {
            gauge!(BUILD_INFO_GAUGE, labels.as_slice()).increment(1.0);
        });
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for Instrumentation {
    fn default() -> Self {
        Self::new(MatchPolicy::default())
    }
}
