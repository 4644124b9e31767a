// SPDX-License-Identifier: MIT

//! The request-handling seam a Managed Service implements.

use async_trait::async_trait;
use bytes::Bytes;

/// The outcome of dispatching one inbound request to a handler.
///
/// There is no separate transport-error channel here: every outcome the
/// daemon can produce (success, no-handler, script-failed, timeout) is
/// already a value the handler can construct and hand back.
#[derive(Debug, Clone)]
pub enum HandlerReply {
    Ok(Bytes),
    Error { message: String },
}

/// Implemented by whatever owns a registered service's endpoint set —
/// in production, a Managed Service.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle one inbound request for `subject` (the *rewritten* subject the
    /// bus delivered) with `payload` as the request body.
    async fn handle(&self, subject: &str, payload: Bytes) -> HandlerReply;
}
