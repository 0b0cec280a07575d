use crate::config::ResponseFormat;
use std::borrow::Cow;

/// Outcome of classifying one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Pass,
    Redirect(String),
}

impl Decision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }

    /// The `<result>` field of a reply line: `-` for PASS, otherwise the
    /// redirect target in the configured shape.
    pub fn to_wire(&self, format: ResponseFormat, status: u16) -> Cow<'_, str> {
        match self {
            Self::Pass => Cow::Borrowed("-"),
            Self::Redirect(url) => match format {
                ResponseFormat::BareUrl => Cow::Borrowed(url.as_str()),
                ResponseFormat::StatusPrefixed => Cow::Owned(format!("{status}:{url}")),
            },
        }
    }
}
