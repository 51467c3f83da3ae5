//! Handshake use case: one `connect` request, one acknowledgement.

use std::time::Duration;

use attendance_core::{Message, RequestKind};
use tracing::debug;

use crate::application::transport::{recv_acknowledgement, send_message, FrameTransport};
use crate::error::EndpointError;

/// Sends `{"type":"connect"}` and waits up to `timeout` for
/// `{"type":"acknowledge","targeting":"connect"}`.
///
/// Any other outcome (timeout, closed stream, malformed or mistargeted
/// reply) is reported as [`EndpointError::Handshake`]; only socket write
/// failures surface as [`EndpointError::Io`].
pub async fn perform_handshake<T>(transport: &mut T, timeout: Duration) -> Result<(), EndpointError>
where
    T: FrameTransport + ?Sized,
{
    send_message(transport, &Message::Connect).await?;
    match recv_acknowledgement(transport, RequestKind::Connect, timeout).await {
        Ok(Some(_)) => {
            debug!("handshake acknowledged");
            Ok(())
        }
        Ok(None) => Err(EndpointError::Handshake(format!(
            "no reply within {timeout:?}"
        ))),
        Err(EndpointError::Protocol(e)) => Err(EndpointError::Handshake(format!(
            "incorrect response ({e}); is another service listening on this port?"
        ))),
        Err(EndpointError::TransportClosed) => Err(EndpointError::Handshake(
            "connection closed before reply".to_string(),
        )),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::transport::MockFrameTransport;

    fn transport_replying(reply: Result<Option<Vec<u8>>, EndpointError>) -> MockFrameTransport {
        let mut mock = MockFrameTransport::new();
        mock.expect_send_frame().times(1).returning(|_| Ok(()));
        let mut reply = Some(reply);
        mock.expect_recv_frame()
            .times(1)
            .returning(move |_| reply.take().unwrap_or(Ok(None)));
        mock
    }

    #[tokio::test]
    async fn test_handshake_accepts_connect_acknowledgement() {
        let mut mock = transport_replying(Ok(Some(
            br#"{"type":"acknowledge","targeting":"connect"}"#.to_vec(),
        )));

        let result = perform_handshake(&mut mock, Duration::from_millis(10)).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_handshake_rejects_wrong_target() {
        let mut mock = transport_replying(Ok(Some(
            br#"{"type":"acknowledge","targeting":"code","valid_to":5}"#.to_vec(),
        )));

        let result = perform_handshake(&mut mock, Duration::from_millis(10)).await;

        assert!(matches!(result, Err(EndpointError::Handshake(_))));
    }

    #[tokio::test]
    async fn test_handshake_rejects_non_json_reply() {
        let mut mock = transport_replying(Ok(Some(b"HTTP/1.1 400 Bad Request".to_vec())));

        let result = perform_handshake(&mut mock, Duration::from_millis(10)).await;

        assert!(matches!(result, Err(EndpointError::Handshake(_))));
    }

    #[tokio::test]
    async fn test_handshake_times_out() {
        let mut mock = transport_replying(Ok(None));

        let result = perform_handshake(&mut mock, Duration::from_millis(10)).await;

        assert!(matches!(result, Err(EndpointError::Handshake(_))));
    }

    #[tokio::test]
    async fn test_handshake_reports_closed_stream() {
        let mut mock = transport_replying(Err(EndpointError::TransportClosed));

        let result = perform_handshake(&mut mock, Duration::from_millis(10)).await;

        assert!(matches!(result, Err(EndpointError::Handshake(_))));
    }
}
