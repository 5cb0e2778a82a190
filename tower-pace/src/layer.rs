use std::sync::Arc;
use std::time::Duration;

use pace_limit::Registry;
use tower::Layer;

use crate::service::AdmissionService;

/// Applies per-tenant admission control to requests.
///
/// Every service produced by this layer, and every clone of those services,
/// shares the same [`Registry`]: a tenant has one budget no matter which
/// service instance its requests go through.
#[derive(Debug)]
pub struct AdmissionLayer<R> {
    registry: Arc<Registry>,
    resolver: Arc<R>,
    timeout: Option<Duration>,
}

impl<R> Clone for AdmissionLayer<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            resolver: Arc::clone(&self.resolver),
            timeout: self.timeout,
        }
    }
}

impl<R> AdmissionLayer<R> {
    /// Create an AdmissionLayer
    pub fn new(registry: Arc<Registry>, resolver: R) -> Self {
        Self {
            registry,
            resolver: Arc::new(resolver),
            timeout: None,
        }
    }

    /// Set a unified timeout for both waiting for admission and request execution.
    ///
    /// If the total time exceeds this duration, the service
    /// will return `PaceError::Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<R, S> Layer<S> for AdmissionLayer<R> {
    type Service = AdmissionService<S, R>;

    fn layer(&self, service: S) -> Self::Service {
        let svc = AdmissionService::new(
            service,
            Arc::clone(&self.registry),
            Arc::clone(&self.resolver),
        );
        match self.timeout {
            Some(timeout) => svc.with_timeout(timeout),
            None => svc,
        }
    }
}
