/// Sends the user back to the login entry point.
///
/// Invoked when a request is attempted without a token and when a refresh
/// episode fails. Embedders route it to their UI (a webview navigation, a
/// TUI screen switch, a CLI prompt).
pub trait LoginNavigator: Send + Sync + 'static {
    fn redirect_to_login(&self, target: &str);
}

/// Default navigator: records the redirect in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNavigator;

impl LoginNavigator for LogNavigator {
    fn redirect_to_login(&self, target: &str) {
        tracing::warn!(target_path = %target, "Login required; redirecting");
    }
}

impl<F> LoginNavigator for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn redirect_to_login(&self, target: &str) {
        self(target);
    }
}
