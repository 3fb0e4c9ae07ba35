use parking_lot::Mutex;

use crate::error::Error;
use crate::request::{ApiResponse, OutboundRequest};
use crate::transport::Transport;

type Handler = Box<dyn Fn(&OutboundRequest) -> Result<ApiResponse, Error> + Send + Sync>;

/// In-process transport answering from a closure and recording every request.
pub(crate) struct ScriptedTransport {
    handler: Mutex<Handler>,
    seen: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        handler: impl Fn(&OutboundRequest) -> Result<ApiResponse, Error> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Mutex::new(Box::new(handler)),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_handler(
        &self,
        handler: impl Fn(&OutboundRequest) -> Result<ApiResponse, Error> + Send + Sync + 'static,
    ) {
        *self.handler.lock() = Box::new(handler);
    }

    pub(crate) fn seen(&self) -> Vec<OutboundRequest> {
        self.seen.lock().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().len()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.seen.lock().iter().filter(|r| r.url.path() == path).count()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<ApiResponse, Error> {
        self.seen.lock().push(request.clone());
        (*self.handler.lock())(&request)
    }
}
