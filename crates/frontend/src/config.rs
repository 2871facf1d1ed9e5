/// GraphQL queries and mutations, relative to the page origin.
pub const GRAPHQL_PATH: &str = "/graphql";
/// GraphQL subscriptions over WebSocket, relative to the page origin.
pub const GRAPHQL_WS_PATH: &str = "/graphql/ws";

/// Origin of the page the app was served from.
pub fn page_origin() -> Result<String, String> {
    let window = web_sys::window().ok_or("no window")?;
    window
        .location()
        .origin()
        .map_err(|e| format!("failed to read page origin: {:?}", e))
}

pub fn graphql_url(origin: &str) -> String {
    format!("{}{}", origin, GRAPHQL_PATH)
}

/// Subscription endpoint on the same host, `ws` for `http` and `wss` for `https`.
pub fn websocket_url(origin: &str) -> String {
    let host = if let Some(rest) = origin.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = origin.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        origin.to_string()
    };
    format!("{}{}", host, GRAPHQL_WS_PATH)
}
