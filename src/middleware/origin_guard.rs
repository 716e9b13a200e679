// src/middleware/origin_guard.rs
use std::collections::HashSet;

use actix_web::HttpRequest;
use actix_web::http::header::ORIGIN;
use log::warn;

/// Origins allowed to submit cookie-authenticated forms. The service's own host is
/// always allowed.
#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins {
    origins: HashSet<String>,
}

impl AllowedOrigins {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            origins: origins
                .into_iter()
                .map(|o| o.as_ref().trim_end_matches('/').to_ascii_lowercase())
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }

    /// Requests without an `Origin` header come from non-browser clients and pass.
    pub fn permits(&self, req: &HttpRequest) -> bool {
        let Some(origin) = req.headers().get(ORIGIN) else {
            return true;
        };
        let Ok(origin) = origin.to_str() else {
            warn!("rejecting non-ascii Origin header");
            return false;
        };
        let origin = origin.trim_end_matches('/').to_ascii_lowercase();

        if self.origins.contains(&origin) {
            return true;
        }

        let own_host = req.connection_info().host().to_ascii_lowercase();
        let same_host = origin
            .split_once("://")
            .is_some_and(|(_, host)| host == own_host);
        if !same_host {
            warn!("rejecting form post from origin {}", origin);
        }
        same_host
    }
}
