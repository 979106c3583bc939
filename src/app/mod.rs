use std::{
    net::SocketAddr,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use http::{header, HeaderValue, Response, StatusCode};
use hyper::body::Bytes;

use crate::{
    config::Settings,
    context::Context,
    error::Error,
    request::Request,
    router::Router,
    server::Server,
    session::{DummyStore, SessionStore},
    status::status_line,
    view::{View, ViewError},
};

/// A routing table plus everything its handlers share: the session store,
/// the template view and the settings.
///
/// An application is a function from request to response, see
/// [`WebApplication::dispatch`]. It can host itself with
/// [`WebApplication::run`].
///
/// ```
/// use mortimer::{Context, HandlerResult, RequestHandler, WebApplication};
///
/// struct HelloWorld;
///
/// impl RequestHandler for HelloWorld {
///     fn get(&self, _: &mut Context) -> HandlerResult {
///         Ok("Hello, World".into())
///     }
/// }
///
/// let mut app = WebApplication::new();
/// app.router_mut().add_route(r"/$", HelloWorld).unwrap();
///
/// let request = http::Request::get("/").body(Default::default()).unwrap();
/// let response = app.dispatch(request);
/// assert_eq!(response.status(), 200);
/// assert_eq!(response.body().as_ref(), b"Hello, World");
/// ```
pub struct WebApplication {
    router: Router,
    store: Arc<dyn SessionStore>,
    view: Option<Arc<View>>,
    settings: Settings,
}

impl Default for WebApplication {
    fn default() -> Self {
        Self::new()
    }
}

impl WebApplication {
    /// An application with default settings that keeps no sessions.
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            store: Arc::new(DummyStore),
            view: None,
            settings: Settings::default(),
        }
    }

    /// An application whose session store and view follow `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self, ViewError> {
        let view = match &settings.templates.path {
            Some(path) => Some(Arc::new(View::new(path.clone())?)),
            None => None,
        };
        Ok(Self {
            router: Router::new(),
            store: settings.session_store(),
            view,
            settings,
        })
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_view(mut self, view: View) -> Self {
        self.view = Some(Arc::new(view));
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn view(&self) -> Option<&Arc<View>> {
        self.view.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Serve one request.
    ///
    /// Failures never escape: a missing route, an unimplemented method, a
    /// handler error or a handler panic are all turned into a plain text error
    /// page and logged.
    #[tracing::instrument(
        name = "dispatch",
        skip_all,
        fields(method = %request.method(), path = %request.uri().path())
    )]
    pub fn dispatch(&self, request: http::Request<Bytes>) -> Response<Bytes> {
        let Some((handler, args)) = self.router.find_route(request.uri().path()) else {
            tracing::debug!("no route matched");
            return error_page(StatusCode::NOT_FOUND);
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut cx = Context::new(Request::new(request, args), self);
            let body = handler.handle_request(&mut cx)?;
            cx.finish(body)
        }));

        match outcome {
            Ok(Ok(response)) => {
                tracing::debug!(status = %response.status(), "request handled");
                response
            }
            Ok(Err(err)) => {
                let status = err.status();
                match &err {
                    Error::Http(_) | Error::MethodNotImplemented(_) => {
                        tracing::debug!(%status, error = %err, "request aborted")
                    }
                    _ => tracing::error!(%status, error = %err, "request failed"),
                }
                error_page(status)
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("<non-string panic payload>");
                tracing::error!(panic = message, "request handler panicked");
                error_page(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Serve the application on `addr` until the listener fails.
    pub async fn serve<A: Into<SocketAddr>>(self, addr: A) -> std::io::Result<()> {
        Server::new(addr.into(), self).bind().await
    }

    /// Serve the application on `addr`, blocking on a new Tokio runtime.
    pub fn run<A: Into<SocketAddr>>(self, addr: A) -> std::io::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.serve(addr))
    }
}

/// A `text/plain` page whose body is the status line.
pub(crate) fn error_page(status: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(status_line(status)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{router::routes::HandlerResult, RequestHandler};
    use http::Method;
    use pretty_assertions::assert_eq;

    struct HelloWorld;

    impl RequestHandler for HelloWorld {
        fn get(&self, _: &mut Context) -> HandlerResult {
            Ok("Hello, World".into())
        }
    }

    struct Faulty;

    impl RequestHandler for Faulty {
        fn get(&self, _: &mut Context) -> HandlerResult {
            Err(Error::http(StatusCode::FORBIDDEN))
        }

        fn post(&self, _: &mut Context) -> HandlerResult {
            Err(Error::other("database unavailable"))
        }

        fn put(&self, _: &mut Context) -> HandlerResult {
            panic!("handler bug")
        }
    }

    fn app() -> WebApplication {
        let mut app = WebApplication::new();
        app.router_mut()
            .add_route("/$", HelloWorld)
            .unwrap()
            .add_route("/faulty$", Faulty)
            .unwrap();
        app
    }

    fn request(method: Method, uri: &str) -> http::Request<Bytes> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
    }

    fn assert_error_page(response: &Response<Bytes>, status: StatusCode) {
        assert_eq!(response.status(), status);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(response.body(), &Bytes::from(status_line(status)));
    }

    #[test]
    fn index() {
        let response = app().dispatch(request(Method::GET, "/"));
        assert_eq!(status_line(response.status()), "200 OK");
        assert_eq!(response.body(), &Bytes::from_static(b"Hello, World"));
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=UTF-8"
        );
    }

    #[test]
    fn unknown_route() {
        let response = app().dispatch(request(Method::GET, "/missing"));
        assert_error_page(&response, StatusCode::NOT_FOUND);
        assert_eq!(response.body(), &Bytes::from_static(b"404 Not Found"));
    }

    #[test]
    fn unimplemented_method() {
        let response = app().dispatch(request(Method::DELETE, "/"));
        assert_error_page(&response, StatusCode::NOT_FOUND);

        let custom = Method::from_bytes(b"PURGE").unwrap();
        let response = app().dispatch(request(custom, "/"));
        assert_error_page(&response, StatusCode::NOT_FOUND);
    }

    #[test]
    fn http_error() {
        let response = app().dispatch(request(Method::GET, "/faulty"));
        assert_error_page(&response, StatusCode::FORBIDDEN);
    }

    #[test]
    fn handler_error() {
        let response = app().dispatch(request(Method::POST, "/faulty"));
        assert_error_page(&response, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn handler_panic() {
        let response = app().dispatch(request(Method::PUT, "/faulty"));
        assert_error_page(&response, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn from_settings_without_templates() {
        let app = WebApplication::from_settings(Settings::default()).unwrap();
        assert!(app.view().is_none());
        assert!(app.router().is_empty());
    }
}
