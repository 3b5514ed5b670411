//! Contains the request interceptor and the Tower middleware applying it.

use crate::http::{HttpMetrics, RequestLabels};
use crate::ServiceName;
use axum::extract::MatchedPath;
use axum::http::{Method, Request, Response, StatusCode};
use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::debug;

/// Per-request scratch state, created by [`RequestInterceptor::before`]
/// and consumed by [`RequestInterceptor::after`].
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    start: Option<Instant>,
}

impl RequestContext {
    /// A context for a request whose start time was never captured.
    pub fn unstarted() -> Self {
        Self { start: None }
    }

    /// The time passed since the request started, if the start is known.
    pub fn elapsed(&self) -> Option<Duration> {
        self.start.map(|start| start.elapsed())
    }
}

/// What the interceptor needs to know about a request in order to label it.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    method: Method,
    path: String,
    route: Option<String>,
}

impl RequestInfo {
    /// ## Arguments
    /// * `method` - The HTTP method.
    /// * `path` - The literal request path.
    /// * `route` - The registered route pattern, if the router resolved one.
    pub fn new<P: Into<String>>(method: Method, path: P, route: Option<String>) -> Self {
        Self {
            method,
            path: path.into(),
            route,
        }
    }

    /// Captures method, path and the [`MatchedPath`] of a routed request.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_string());
        Self::new(request.method().clone(), request.uri().path(), route)
    }

    /// The `uri` label: the route pattern, or the literal path if no route matched.
    pub fn uri(&self) -> &str {
        self.route.as_deref().unwrap_or(&self.path)
    }
}

/// Attributes latency and count metrics to completed HTTP requests.
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    service: ServiceName,
    metrics: HttpMetrics,
}

impl RequestInterceptor {
    /// Creates a new [`RequestInterceptor`] labeling every request with `service`.
    pub fn new(service: ServiceName, metrics: HttpMetrics) -> Self {
        Self { service, metrics }
    }

    /// Captures the start of a request. Must run before the handler.
    pub fn before(&self) -> RequestContext {
        RequestContext {
            start: Some(Instant::now()),
        }
    }

    /// Records latency and count for a completed request.
    ///
    /// If `context` carries no start time, only the count is recorded.
    pub fn after(&self, context: &RequestContext, request: &RequestInfo, status: StatusCode) {
        if request.route.is_none() {
            // Every distinct unmatched path becomes its own label value.
            debug!(
                "No route matched {path}; labeling the request with its raw path",
                path = request.path
            );
        }

        let elapsed = context.elapsed();
        if elapsed.is_none() {
            debug!(
                "No start time for {method} {path}; skipping latency",
                method = request.method,
                path = request.path
            );
        }

        let labels = RequestLabels {
            service: self.service.clone(),
            method: (&request.method).into(),
            uri: request.uri().to_string(),
            status: status.as_u16(),
        };

        self.metrics.track(&labels, elapsed);
    }
}

/// A middleware for call metrics. Uses [`RequestInterceptor`].
#[derive(Clone)]
pub struct HttpCallMetrics<S> {
    inner: S,
    interceptor: RequestInterceptor,
}

/// A layer for call metrics. Uses [`HttpCallMetrics`].
///
/// Add it with [`Router::layer`](axum::Router::layer) so that it runs after routing
/// and sees the matched route.
#[derive(Clone)]
pub struct HttpCallMetricsLayer {
    interceptor: RequestInterceptor,
}

impl HttpCallMetricsLayer {
    /// Creates a new [`HttpCallMetricsLayer`].
    pub fn new(interceptor: RequestInterceptor) -> Self {
        Self { interceptor }
    }
}

impl<S> HttpCallMetrics<S> {
    /// Creates a new [`HttpCallMetrics`]
    pub fn new(inner: S, interceptor: RequestInterceptor) -> Self {
        Self { inner, interceptor }
    }
}

impl<S> Layer<S> for HttpCallMetricsLayer {
    type Service = HttpCallMetrics<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpCallMetrics::new(inner, self.interceptor.clone())
    }
}

impl<S, B, ResBody> Service<Request<B>> for HttpCallMetrics<S>
where
    S: Service<Request<B>, Response = Response<ResBody>>,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = HttpCallMetricsFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let tracker = HttpCallMetricTracker::start(self.interceptor.clone(), &request);

        // We start tracking request time before the first call to the future.
        HttpCallMetricsFuture::new(self.inner.call(request), tracker)
    }
}

/// A future returned from the [`HttpCallMetrics`].
///
/// ## Type arguments
/// * `F` - A wrapped future returning `Result<Response<B>, E>`.
#[pin_project]
pub struct HttpCallMetricsFuture<F>
where
    F: Future,
{
    #[pin]
    future: F,
    tracker: HttpCallMetricTracker,
}

impl<F> HttpCallMetricsFuture<F>
where
    F: Future,
{
    fn new(future: F, tracker: HttpCallMetricTracker) -> Self {
        Self { future, tracker }
    }
}

impl<F, B, E> Future for HttpCallMetricsFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = ready!(this.future.poll(cx));

        match &result {
            Ok(response) => this.tracker.finish(response.status()),
            Err(_) => this.tracker.finish(StatusCode::INTERNAL_SERVER_ERROR),
        }

        Poll::Ready(result)
    }
}

/// Holds the request context for the lifetime of one call.
struct HttpCallMetricTracker {
    interceptor: RequestInterceptor,
    request: RequestInfo,
    context: RequestContext,
    finished: bool,
}

impl HttpCallMetricTracker {
    fn start<B>(interceptor: RequestInterceptor, request: &Request<B>) -> Self {
        let request = RequestInfo::from_request(request);
        debug!(
            "Start processing {method} {path}",
            method = request.method,
            path = request.path
        );

        let context = interceptor.before();
        Self {
            interceptor,
            request,
            context,
            finished: false,
        }
    }

    fn finish(&mut self, status: StatusCode) {
        if self.finished {
            return;
        }

        self.finished = true;
        debug!(
            "Done processing {method} {path}: {status} - {duration:?}",
            method = self.request.method,
            path = self.request.path,
            status = status,
            duration = self.context.elapsed()
        );
        self.interceptor.after(&self.context, &self.request, status);
    }
}

impl Drop for HttpCallMetricTracker {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                "Dropped {method} {path} before a response was produced",
                method = self.request.method,
                path = self.request.path
            );
        }
    }
}
