/// Routing abstraction used for forced redirects (e.g. back to the login
/// route after a role change).
///
/// Any `Fn(&str) + Send + Sync` closure is a `Navigator`.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn navigate(&self, path: &str) {
        self(path);
    }
}

/// Navigator for hosts without client-side routing; only logs the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        tracing::info!(path = %path, "Navigation requested");
    }
}
