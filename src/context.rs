use std::sync::Arc;

use http::{
    header::{self, HeaderName, HeaderValue},
    HeaderMap, Response, StatusCode,
};
use hyper::body::Bytes;
use serde::Serialize;

use crate::{
    app::WebApplication,
    cookie::SetCookie,
    error::{BoxError, Error},
    request::Request,
    router::routes::HandlerResult,
    session::{Session, SessionStore},
    view::{View, ViewError},
};

/// Per-request state handed to a [`RequestHandler`].
///
/// Derefs to the incoming [`Request`]; the response status, headers and the
/// client's session are managed here.
///
/// [`RequestHandler`]: crate::RequestHandler
pub struct Context {
    request: Request,
    status: StatusCode,
    headers: HeaderMap,
    session: Option<Session>,
    store: Arc<dyn SessionStore>,
    session_cookie: String,
    view: Option<Arc<View>>,
}

impl Context {
    pub fn new(request: Request, app: &WebApplication) -> Self {
        let settings = app.settings();
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(&settings.http.default_content_type) {
            Ok(content_type) => {
                headers.insert(header::CONTENT_TYPE, content_type);
            }
            Err(_) => tracing::warn!(
                content_type = %settings.http.default_content_type,
                "default content type is not a valid header value"
            ),
        }

        Self {
            request,
            status: StatusCode::OK,
            headers,
            session: None,
            store: Arc::clone(app.session_store()),
            session_cookie: settings.session.cookie_name.clone(),
            view: app.view().cloned(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set a response header, replacing earlier values of the same name.
    /// `Set-Cookie` headers accumulate instead.
    pub fn add_header<V>(&mut self, name: HeaderName, value: V) -> Result<(), Error>
    where
        V: TryInto<HeaderValue>,
        V::Error: Into<BoxError>,
    {
        let value = value.try_into().map_err(Error::other)?;
        if name == header::SET_COOKIE {
            self.headers.append(name, value);
        } else {
            self.headers.insert(name, value);
        }
        Ok(())
    }

    pub fn set_content_type(&mut self, content_type: &str) -> Result<(), Error> {
        self.add_header(header::CONTENT_TYPE, content_type)
    }

    pub fn set_cookie(&mut self, cookie: SetCookie) -> Result<(), Error> {
        self.add_header(header::SET_COOKIE, cookie.to_string())
    }

    /// Redirect the client to `location` with `302 Found`.
    ///
    /// ```
    /// # use mortimer::{Context, HandlerResult, RequestHandler};
    /// struct Legacy;
    ///
    /// impl RequestHandler for Legacy {
    ///     fn get(&self, cx: &mut Context) -> HandlerResult {
    ///         cx.redirect("/new-home")
    ///     }
    /// }
    /// ```
    pub fn redirect(&mut self, location: &str) -> HandlerResult {
        self.set_status(StatusCode::FOUND);
        self.add_header(header::LOCATION, location)?;
        Ok(Bytes::new())
    }

    /// The client's session, loaded on first access from the session cookie.
    pub fn session(&mut self) -> Result<&mut Session, Error> {
        if self.session.is_none() {
            let id = self.request.cookie(&self.session_cookie);
            let session = Session::load(id.as_deref(), self.store.as_ref())?;
            self.session = Some(session);
        }
        Ok(self.session.get_or_insert_with(Session::new))
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_deref()
    }

    /// Render a template of the application's view as the response body.
    pub fn render<C>(&self, template: &str, context: &C) -> HandlerResult
    where
        C: Serialize,
    {
        let view = self.view().ok_or(ViewError::NotConfigured)?;
        Ok(view.render(template, context)?)
    }

    /// Persist the session and build the response around `body`.
    pub(crate) fn finish(mut self, body: Bytes) -> Result<Response<Bytes>, Error> {
        if let Some(mut session) = self.session.take() {
            if session.is_deleted() {
                if let Some(id) = session.id() {
                    let cookie = SetCookie::new(format!("{}={id}", self.session_cookie)).removal();
                    self.set_cookie(cookie)?;
                }
                session.destroy(self.store.as_ref())?;
            } else {
                session.save(self.store.as_ref())?;
                if let Some(id) = session.id() {
                    let cookie = SetCookie::new(format!("{}={id}", self.session_cookie));
                    self.set_cookie(cookie)?;
                }
            }
        }

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        Ok(response)
    }
}

impl std::ops::Deref for Context {
    type Target = Request;

    fn deref(&self) -> &Self::Target {
        &self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{router::routes::Args, session::MemoryStore};
    use pretty_assertions::assert_eq;

    fn context(app: &WebApplication, cookie: Option<&str>) -> Context {
        let mut builder = http::Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = Request::new(builder.body(Bytes::new()).unwrap(), Args::default());
        Context::new(request, app)
    }

    fn set_cookies(response: &Response<Bytes>) -> Vec<&str> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap())
            .collect()
    }

    #[test]
    fn defaults() {
        let app = WebApplication::new();
        let response = context(&app, None).finish(Bytes::new()).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=UTF-8"
        );
        assert!(set_cookies(&response).is_empty());
    }

    #[test]
    fn headers_replace_but_cookies_accumulate() {
        let app = WebApplication::new();
        let mut cx = context(&app, None);
        cx.set_content_type("text/plain").unwrap();
        cx.set_content_type("application/json").unwrap();
        cx.set_cookie(SetCookie::new("a=1")).unwrap();
        cx.set_cookie(SetCookie::new("b=2").domain("example.com"))
            .unwrap();

        let response = cx.finish(Bytes::new()).unwrap();
        assert_eq!(
            response
                .headers()
                .get_all(header::CONTENT_TYPE)
                .iter()
                .count(),
            1
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(
            set_cookies(&response),
            vec!["a=1; path=/", "b=2; path=/; domain=example.com"]
        );
    }

    #[test]
    fn invalid_header_value() {
        let app = WebApplication::new();
        let mut cx = context(&app, None);
        assert!(cx.add_header(header::LOCATION, "bad\nvalue").is_err());
    }

    #[test]
    fn redirect() {
        let app = WebApplication::new();
        let mut cx = context(&app, None);
        let body = cx.redirect("/elsewhere").unwrap();
        assert!(body.is_empty());

        let response = cx.finish(body).unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/elsewhere");
    }

    #[test]
    fn modified_session_is_saved_and_sent() {
        let store = Arc::new(MemoryStore::new());
        let app = WebApplication::new().with_session_store(store.clone());

        let mut cx = context(&app, None);
        cx.session().unwrap().insert("user", "alice").unwrap();
        let response = cx.finish(Bytes::new()).unwrap();

        assert_eq!(store.len(), 1);
        let cookie = set_cookies(&response)[0].to_owned();
        let id = cookie
            .strip_prefix("session_id=")
            .and_then(|rest| rest.strip_suffix("; path=/"))
            .unwrap();

        let mut cx = context(&app, Some(format!("session_id={id}").as_str()));
        let session = cx.session().unwrap();
        assert_eq!(session.id(), Some(id));
        assert_eq!(
            session.get_as::<String>("user").unwrap().as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn session_cookie_name_follows_settings() {
        let store = Arc::new(MemoryStore::new());
        let mut settings = crate::Settings::default();
        settings.session.cookie_name = "sid".to_owned();
        let app = WebApplication::from_settings(settings)
            .unwrap()
            .with_session_store(store.clone());

        let mut cx = context(&app, None);
        cx.session().unwrap().insert("user", "bob").unwrap();
        let response = cx.finish(Bytes::new()).unwrap();
        let cookie = set_cookies(&response)[0].to_owned();
        let id = cookie
            .strip_prefix("sid=")
            .and_then(|rest| rest.strip_suffix("; path=/"))
            .unwrap();

        // the default cookie name is not consulted
        let mut cx = context(&app, Some(format!("session_id={id}").as_str()));
        assert_eq!(cx.session().unwrap().id(), None);

        let mut cx = context(&app, Some(format!("sid={id}").as_str()));
        cx.session().unwrap().delete();
        let response = cx.finish(Bytes::new()).unwrap();
        assert!(store.is_empty());
        assert_eq!(
            set_cookies(&response),
            vec![format!(
                "sid={id}; expires=Sat, 01-Jan-2000 00:00:00 GMT; path=/"
            )]
        );
    }

    #[test]
    fn untouched_fresh_session_sends_no_cookie() {
        let app = WebApplication::new().with_session_store(Arc::new(MemoryStore::new()));
        let mut cx = context(&app, None);
        assert!(cx.session().unwrap().is_empty());
        let response = cx.finish(Bytes::new()).unwrap();
        assert!(set_cookies(&response).is_empty());
    }

    #[test]
    fn deleted_session_is_removed() {
        let store = Arc::new(MemoryStore::new());
        let app = WebApplication::new().with_session_store(store.clone());
        let mut session = Session::new();
        session.insert("user", "alice").unwrap();
        session.save(store.as_ref()).unwrap();
        let id = session.id().unwrap().to_owned();

        let mut cx = context(&app, Some(format!("session_id={id}").as_str()));
        cx.session().unwrap().delete();
        let response = cx.finish(Bytes::new()).unwrap();

        assert!(store.is_empty());
        assert_eq!(
            set_cookies(&response),
            vec![format!(
                "session_id={id}; expires=Sat, 01-Jan-2000 00:00:00 GMT; path=/"
            )]
        );
    }

    #[test]
    fn render_without_view() {
        let app = WebApplication::new();
        let cx = context(&app, None);
        let err = cx.render("index.html", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, Error::View(ViewError::NotConfigured)));
    }
}
