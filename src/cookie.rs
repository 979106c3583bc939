use std::fmt;

/// Expiry date used to make a client drop a cookie.
pub const REMOVAL_EXPIRES: &str = "Sat, 01-Jan-2000 00:00:00 GMT";

/// Builder for the value of a `Set-Cookie` response header.
///
/// ```
/// use mortimer::SetCookie;
///
/// let cookie = SetCookie::new("theme=dark").domain("example.com");
/// assert_eq!(cookie.to_string(), "theme=dark; path=/; domain=example.com");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SetCookie {
    data: String,
    expires: Option<String>,
    path: Option<String>,
    domain: Option<String>,
    removal: bool,
}

impl SetCookie {
    /// `data` is the `name=value` pair. The path defaults to `/`.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            expires: None,
            path: Some("/".to_owned()),
            domain: None,
            removal: false,
        }
    }

    pub fn expires(mut self, expires: impl Into<String>) -> Self {
        self.expires = Some(expires.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn without_path(mut self) -> Self {
        self.path = None;
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Expire the cookie in the past so the client removes it. Overrides
    /// any expiry set with [`SetCookie::expires`].
    pub fn removal(mut self) -> Self {
        self.removal = true;
        self
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)?;
        if self.removal {
            write!(f, "; expires={REMOVAL_EXPIRES}")?;
        } else if let Some(expires) = &self.expires {
            write!(f, "; expires={expires}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "; path={path}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; domain={domain}")?;
        }
        Ok(())
    }
}
