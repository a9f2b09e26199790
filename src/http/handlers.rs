use bytes::Bytes;
use graphql_parser::query::{Definition, OperationDefinition};
use http_body_util::Full;
use hyper::{
    Method,
    header::{self, HeaderValue},
};
use std::{sync::Arc, time::Instant};

use crate::{api, prelude::*};
use super::{Context, Request, Response, log, response, ws};


/// This is the main HTTP entry point, called for each incoming request.
pub(super) async fn handle(req: Request, ctx: Arc<Context>) -> Response {
    log::req::log(&req);
    if ctx.config.log.log_http_headers {
        log::headers::log(&req);
    }

    let method = req.method().clone();
    let path = req.uri().path().trim_end_matches('/').to_owned();
    let http = &ctx.config.http;
    let is_path = |configured: &str| path == configured.trim_end_matches('/');

    let mut response = match path.as_str() {
        // CORS preflight requests can be sent for any path.
        _ if method == Method::OPTIONS => response::no_content(),

        // Subscriptions. This comes first since the path might be the same as
        // the one for queries.
        p if is_path(&http.subscriptions_path) && hyper_tungstenite::is_upgrade_request(&req) => {
            trace!("Upgrading request to '{p}' to WebSocket");
            ws::upgrade(req, &ctx)
        }

        // The GraphQL endpoint for queries and mutations.
        _ if is_path(&http.graphql_path) && (method == Method::POST || method == Method::GET) => {
            handle_api(req, &ctx).await
        }

        // From this point on, we only support GET and HEAD requests.
        _ if method != Method::GET && method != Method::HEAD => response::method_not_allowed(),

        // The interactive GraphQL API explorer/IDE.
        "/~graphiql" if http.graphiql => graphiql(&req, &ctx).await,

        p => {
            debug!("Responding with 404 to {:?} '{}'", method, p);
            response::not_found()
        }
    };

    add_cors_headers(&mut response, &ctx);
    response
}

fn add_cors_headers(response: &mut Response, ctx: &Context) {
    let origin = &ctx.config.http.cors_allowed_origin;
    if origin.is_empty() {
        return;
    }

    let Ok(origin) = HeaderValue::from_str(origin) else {
        warn!("Configured CORS origin '{origin}' is not a valid header value");
        return;
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type, authorization"),
    );
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
}

/// Handles a `GET` or `POST` request to the GraphQL endpoint.
///
/// `GET` requests may only run queries. `POST` requests need a
/// `Content-Length` within `max_body_size` since the body is read completely.
async fn handle_api(req: Request, ctx: &Context) -> Response {
    if req.method() == Method::GET {
        match operation_kind(req.uri().query().unwrap_or("")) {
            Ok(Some(OperationKind::Query)) | Ok(None) => {}
            Ok(Some(kind)) => {
                debug!(?kind, "Rejected GraphQL GET request that is not a query");
                return response::method_not_allowed();
            }
            Err(e) => {
                debug!("Received unparsable GraphQL GET request: {e}");
                return response::bad_request(Some(&format!("invalid GraphQL document: {e}")));
            }
        }
    } else {
        let limit = ctx.config.http.max_body_size;
        match content_length(&req) {
            None => return response::length_required(),
            Some(len) if len > limit => {
                debug!("Rejected GraphQL request with body of {len} bytes (limit {limit})");
                return response::payload_too_large();
            }
            Some(_) => {}
        }
    }

    let before = Instant::now();
    let api_context = Arc::new(api::Context::new(Arc::clone(&ctx.store)));
    let out = juniper_hyper::graphql(Arc::clone(&ctx.api_root), api_context, req).await;
    debug!(status = out.status().as_u16(), "Finished GraphQL request in {:.2?}", before.elapsed());

    out.map(|body| Bytes::from(body).pipe(Full::new))
}

fn content_length(req: &Request) -> Option<usize> {
    req.headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// Determines which kind of operation the GraphQL request given by the URL
/// query parameters `query` and `operationName` would run. Returns `Ok(None)`
/// if that cannot be decided, e.g. because `query` is missing or there is no
/// operation with the given name. Executing such a request only yields an
/// error.
fn operation_kind(url_query: &str) -> Result<Option<OperationKind>, String> {
    let mut document = None;
    let mut operation_name = None;
    for (key, value) in form_urlencoded::parse(url_query.as_bytes()) {
        match &*key {
            "query" => document = Some(value),
            "operationName" => operation_name = Some(value),
            _ => {}
        }
    }

    let Some(document) = document else {
        return Ok(None);
    };
    let document = graphql_parser::parse_query::<&str>(&document).map_err(|e| e.to_string())?;
    let mut operations = document.definitions.iter().filter_map(|def| match def {
        Definition::Operation(op) => Some(op),
        Definition::Fragment(_) => None,
    });

    let operation = match operation_name.as_deref().filter(|name| !name.is_empty()) {
        Some(name) => operations.find(|op| operation_name_of(op) == Some(name)),
        None => operations.next(),
    };

    Ok(operation.map(|op| match op {
        OperationDefinition::SelectionSet(_) | OperationDefinition::Query(_) => OperationKind::Query,
        OperationDefinition::Mutation(_) => OperationKind::Mutation,
        OperationDefinition::Subscription(_) => OperationKind::Subscription,
    }))
}

fn operation_name_of<'a>(op: &OperationDefinition<'a, &'a str>) -> Option<&'a str> {
    match op {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(q) => q.name,
        OperationDefinition::Mutation(m) => m.name,
        OperationDefinition::Subscription(s) => s.name,
    }
}

/// Serves the GraphiQL IDE, configured to talk to our endpoints.
async fn graphiql(req: &Request, ctx: &Context) -> Response {
    let http = &ctx.config.http;
    let host = req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("{}:{}", http.address, http.port));
    let subscriptions_url = format!("ws://{host}{}", http.subscriptions_path);

    juniper_hyper::graphiql(&http.graphql_path, Some(&subscriptions_url)).await
        .map(|html| Bytes::from(html).pipe(Full::new))
}
