use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;
use std::time::SystemTime;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use opentelemetry::metrics::Histogram;
use pace_limit::Registry;
use tower::BoxError;
use tower::Service;
use tracing::debug;
use tracing::trace;

use crate::error::PaceError;
use crate::tenant::Admission;
use crate::tenant::DEFAULT_TENANT;
use crate::tenant::TenantResolver;

#[derive(Clone, Debug)]
struct AdmissionMetrics {
    admitted: Counter<u64>,
    refused: Counter<u64>,
    wait: Histogram<f64>,
}

impl AdmissionMetrics {
    fn new() -> Self {
        let meter = global::meter("admission_service");
        Self {
            admitted: meter.u64_counter("admitted").build(),
            refused: meter.u64_counter("refused").build(),
            wait: meter
                .f64_histogram("admission_wait")
                .with_unit("s")
                .build(),
        }
    }
}

/// Paces requests through their tenant's limiter before calling `inner`.
///
/// Without a timeout admission never fails: the returned future waits for
/// the tenant's next slot and then runs the inner service. With a timeout a
/// request whose slot is further away than the timeout is refused straight
/// away with [`PaceError::Timeout`] and claims nothing, so overload cannot
/// push the tenant's schedule out of reach. Dropping an admitted future
/// abandons the wait, but the slot it claimed stays consumed.
pub struct AdmissionService<S, R> {
    inner: S,
    registry: Arc<Registry>,
    resolver: Arc<R>,
    timeout: Option<Duration>,
    instruments: AdmissionMetrics,
}

impl<S, R> Clone for AdmissionService<S, R>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            registry: Arc::clone(&self.registry),
            resolver: Arc::clone(&self.resolver),
            timeout: self.timeout,
            instruments: self.instruments.clone(),
        }
    }
}

impl<S, R> std::fmt::Debug for AdmissionService<S, R>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionService")
            .field("inner", &self.inner)
            .field("tenants", &self.registry.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<S, R> AdmissionService<S, R> {
    pub fn new(inner: S, registry: Arc<Registry>, resolver: Arc<R>) -> Self {
        Self {
            inner,
            registry,
            resolver,
            timeout: None,
            instruments: AdmissionMetrics::new(),
        }
    }

    /// Bound the admission wait and the inner call together.
    ///
    /// A request that cannot finish within `timeout` fails with
    /// [`PaceError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl<S, R, Req> Service<Req> for AdmissionService<S, R>
where
    S: Service<Req, Error = BoxError> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    R: TenantResolver<Req> + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Req) -> Self::Future {
        let tenant = self
            .resolver
            .resolve(&req)
            .unwrap_or_else(|| DEFAULT_TENANT.to_owned());
        let limiter = self.registry.get_or_create(&tenant);
        let attributes = [KeyValue::new("tenant", tenant.clone())];

        let reservation = match self.timeout {
            Some(timeout) => match limiter.try_reserve(timeout) {
                Some(reservation) => reservation,
                None => {
                    debug!(
                        tenant = %tenant,
                        ?timeout,
                        "next slot is beyond the timeout, refusing"
                    );
                    self.instruments.refused.add(1, &attributes);
                    let refused: Result<S::Response, BoxError> =
                        Err(PaceError::Timeout.into());
                    return Box::pin(std::future::ready(refused));
                }
            },
            None => limiter.reserve(),
        };
        let waited = reservation.wait();

        self.instruments.admitted.add(1, &attributes);
        self.instruments
            .wait
            .record(waited.as_secs_f64(), &attributes);

        let admission = Admission {
            tenant,
            granted_at: SystemTime::now() + waited,
            waited,
        };
        self.resolver.admitted(&mut req, &admission);

        // Take the service that was driven to readiness, leave a clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let paced = async move {
            if !waited.is_zero() {
                trace!(tenant = %admission.tenant, ?waited, "holding request");
                tokio::time::sleep(waited).await;
            }
            inner.call(req).await
        };

        match self.timeout {
            Some(timeout) => Box::pin(async move {
                tokio::time::timeout(timeout, paced)
                    .await
                    .map_err(|_| BoxError::from(PaceError::Timeout))?
            }),
            None => Box::pin(paced),
        }
    }
}
