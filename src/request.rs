use std::collections::HashMap;

use http::{header, Method};
use hyper::body::Bytes;

use crate::{
    form::{self, FormData, FormError},
    multipart::{self, Multipart, UploadedFile},
    router::routes::Args,
};

type HttpRequest = http::Request<Bytes>;

const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// An incoming request with its body fully buffered, along with the
/// capture groups of the route it matched.
#[derive(Debug)]
pub struct Request {
    request: HttpRequest,
    args: Args,
}

impl Request {
    pub fn new(request: HttpRequest, args: Args) -> Self {
        Self { request, args }
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    /// Positional capture group `index`, starting at zero.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index)
    }

    pub fn named_arg(&self, name: &str) -> Option<&str> {
        self.args.name(name)
    }

    /// The `Content-Type` header, or an empty string.
    pub fn content_type(&self) -> &str {
        self.request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    fn is_multipart(&self) -> bool {
        self.content_type().starts_with(MULTIPART_FORM_DATA)
    }

    /// Arguments of the query string.
    pub fn query_args(&self) -> HashMap<String, String> {
        form::parse_query(self.request.uri().query().unwrap_or_default())
    }

    /// Fields of a url-encoded or multipart form body. Uploaded files are
    /// available through [`Request::files`].
    pub fn post_args(&self) -> Result<FormData, FormError> {
        if self.is_multipart() {
            let mut form = FormData::new();
            for (name, value) in self.multipart()?.fields {
                form.set(name, value);
            }
            return Ok(form);
        }
        let body = String::from_utf8_lossy(self.request.body());
        Ok(form::parse_urlencoded(&body))
    }

    /// Files uploaded with a multipart `POST`. Empty for any other request.
    pub fn files(&self) -> Result<HashMap<String, UploadedFile>, FormError> {
        if self.request.method() != Method::POST || !self.is_multipart() {
            return Ok(HashMap::new());
        }
        Ok(self.multipart()?.files)
    }

    fn multipart(&self) -> Result<Multipart, FormError> {
        let boundary =
            multipart::boundary(self.content_type()).ok_or(FormError::MissingBoundary)?;
        Ok(multipart::parse(self.request.body(), boundary))
    }

    /// Cookies sent with the request.
    pub fn cookies(&self) -> HashMap<String, String> {
        self.request
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(form::parse_cookies)
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies().remove(name)
    }

    pub fn into_inner(self) -> HttpRequest {
        self.request
    }
}

impl std::ops::Deref for Request {
    type Target = HttpRequest;

    fn deref(&self) -> &Self::Target {
        &self.request
    }
}
