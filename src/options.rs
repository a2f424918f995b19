/// Configures base transport behavior: timeout, retry and default headers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_backoff_ms: u64,
    /// Headers sent with every request unless the descriptor overrides them.
    pub default_headers: Vec<(String, String)>,
}

impl ClientOptions {
    /// Adds a default header, replacing an existing one with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.default_headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.default_headers.push((name, value.into()));
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 0,
            retry_backoff_ms: 250,
            default_headers: vec![("Content-Type".to_owned(), "application/json".to_owned())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ClientOptions;

    #[test]
    fn defaults_match_ten_second_timeout_without_retry() {
        let opts = ClientOptions::default();
        assert_eq!(opts.timeout_ms, 10_000);
        assert_eq!(opts.max_retries, 0);
    }

    #[test]
    fn with_header_replaces_case_insensitively() {
        let opts = ClientOptions::default().with_header("content-type", "text/plain");
        assert_eq!(opts.default_headers.len(), 1);
        assert_eq!(opts.default_headers[0].1, "text/plain");
    }
}
