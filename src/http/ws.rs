//! GraphQL subscriptions over WebSocket.
//!
//! The connection protocol itself is implemented by `juniper_graphql_ws`. We
//! support both the legacy `graphql-ws` protocol (from the
//! `subscriptions-transport-ws` package) and its successor
//! `graphql-transport-ws`. Which one is used is negotiated via the
//! `Sec-WebSocket-Protocol` header, defaulting to the legacy one.

use futures::{future, Sink, SinkExt, Stream, StreamExt, TryStreamExt};
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper_tungstenite::tungstenite::{
    Error as WsError,
    Message,
    protocol::{CloseFrame, frame::coding::CloseCode},
};
use juniper::ScalarValue;
use juniper_graphql_ws::{ArcSchema, ConnectionConfig, graphql_transport_ws, graphql_ws};
use std::sync::Arc;

use crate::{api, prelude::*};
use super::{Context, Request, Response, response};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    GraphqlWs,
    GraphqlTransportWs,
}

impl Protocol {
    fn as_str(self) -> &'static str {
        match self {
            Self::GraphqlWs => "graphql-ws",
            Self::GraphqlTransportWs => "graphql-transport-ws",
        }
    }

    /// Picks the protocol from the ones requested by the client. Returns
    /// `None` for the protocol if the client did not request any.
    fn negotiate(headers: &HeaderMap) -> (Self, Option<Self>) {
        let requested = headers.get_all(header::SEC_WEBSOCKET_PROTOCOL)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .find_map(|p| match p {
                "graphql-transport-ws" => Some(Self::GraphqlTransportWs),
                "graphql-ws" => Some(Self::GraphqlWs),
                _ => None,
            });

        (requested.unwrap_or(Self::GraphqlWs), requested)
    }
}


/// Answers the upgrade request and spawns a task serving the WebSocket
/// connection once the upgrade is done.
pub(super) fn upgrade(mut req: Request, ctx: &Context) -> Response {
    let (protocol, requested) = Protocol::negotiate(req.headers());
    let (mut response, websocket) = match hyper_tungstenite::upgrade(&mut req, None) {
        Ok(v) => v,
        Err(e) => {
            debug!("Invalid WebSocket upgrade request: {e}");
            return response::bad_request(Some("invalid WebSocket upgrade request"));
        }
    };

    if requested.is_some() {
        response.headers_mut().insert(
            header::SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(protocol.as_str()),
        );
    }

    let root = Arc::clone(&ctx.api_root);
    let config = ConnectionConfig::new(api::Context::new(Arc::clone(&ctx.store)))
        .with_keep_alive_interval(ctx.config.http.ws_keep_alive_interval);

    tokio::spawn(async move {
        let socket = match websocket.await {
            Ok(socket) => socket,
            Err(e) => {
                warn!("WebSocket handshake failed: {e}");
                return;
            }
        };

        debug!("Opened subscription connection ({})", protocol.as_str());
        let res = match protocol {
            Protocol::GraphqlWs => serve_graphql_ws(socket, root, config).await,
            Protocol::GraphqlTransportWs => serve_graphql_transport_ws(socket, root, config).await,
        };
        match res {
            Ok(()) => debug!("Closed subscription connection"),
            Err(e) => debug!("Subscription connection closed with error: {e}"),
        }
    });

    response
}


/// Wrapper to convert incoming WebSocket messages into protocol messages.
struct ClientFrame(Message);

impl<S: ScalarValue> TryFrom<ClientFrame> for graphql_ws::ClientMessage<S> {
    type Error = serde_json::Error;

    fn try_from(frame: ClientFrame) -> serde_json::Result<Self> {
        serde_json::from_slice(&frame.0.into_data())
    }
}

impl<S: ScalarValue> TryFrom<ClientFrame> for graphql_transport_ws::Input<S> {
    type Error = serde_json::Error;

    fn try_from(frame: ClientFrame) -> serde_json::Result<Self> {
        match frame.0 {
            Message::Close(_) => Ok(Self::Close),
            other => serde_json::from_slice(&other.into_data()).map(Self::Message),
        }
    }
}

fn encode(msg: &impl serde::Serialize) -> Option<Result<Message, WsError>> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Ok(Message::text(json))),
        Err(e) => {
            error!("Failed to serialize subscription message: {e}");
            None
        }
    }
}

/// Serves a connection with the legacy `graphql-ws` protocol. Ends when the
/// client closes the connection.
async fn serve_graphql_ws<W>(
    socket: W,
    root: Arc<api::RootNode>,
    config: ConnectionConfig<api::Context>,
) -> Result<(), WsError>
where
    W: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError>,
{
    let (ws_tx, ws_rx) = socket.split();
    let (conn_tx, conn_rx) = graphql_ws::Connection::new(ArcSchema(root), config)
        .split::<ClientFrame>();

    // This protocol has no message for closing, so we stop reading at the
    // close frame. Ping/pong is answered by tungstenite itself.
    let input = ws_rx
        .try_take_while(|msg| future::ready(Ok(!msg.is_close())))
        .try_filter(|msg| future::ready(msg.is_text() || msg.is_binary()))
        .map_ok(ClientFrame)
        .forward(conn_tx.sink_map_err(|e| match e {}));

    let output = conn_rx
        .filter_map(|msg| future::ready(encode(&msg)))
        .forward(ws_tx);

    let (input, output) = future::join(input, output).await;
    input.and(output)
}

/// Serves a connection with the `graphql-transport-ws` protocol. Ends when
/// either side closes the connection.
async fn serve_graphql_transport_ws<W>(
    socket: W,
    root: Arc<api::RootNode>,
    config: ConnectionConfig<api::Context>,
) -> Result<(), WsError>
where
    W: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError>,
{
    let (ws_tx, ws_rx) = socket.split();
    let (conn_tx, conn_rx) = graphql_transport_ws::Connection::new(ArcSchema(root), config)
        .split::<ClientFrame>();

    let input = ws_rx
        .try_filter(|msg| future::ready(msg.is_text() || msg.is_binary() || msg.is_close()))
        .map_ok(ClientFrame)
        .forward(conn_tx.sink_map_err(|e| match e {}));

    let output = conn_rx
        .filter_map(|out| future::ready(match out {
            graphql_transport_ws::Output::Message(msg) => encode(&msg),
            graphql_transport_ws::Output::Close { code, message } => {
                Some(Ok(Message::Close(Some(CloseFrame {
                    code: CloseCode::from(code),
                    reason: message.into(),
                }))))
            }
        }))
        .forward(ws_tx);

    let (input, output) = future::join(input, output).await;
    input.and(output)
}
