use std::sync::Arc;

use ledbridge_ble::Transport;
use ledbridge_proto::Envelope;

use crate::dispatcher::{Dispatcher, Route};

pub type HttpResult<E = std::io::Error> = Result<HttpResponse, E>;

pub type HttpResponse =
    hyper::Response<http_body_util::combinators::BoxBody<hyper::body::Bytes, std::io::Error>>;

pub async fn bind(addr: &str) -> std::io::Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind(addr).await
}

pub async fn run_server<T: Transport>(
    listener: tokio::net::TcpListener,
    dispatcher: Arc<Dispatcher<T>>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(
        peripheral = %dispatcher.executor().peripheral().address,
        "listening on http://{addr}"
    );
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                tokio::task::spawn(handle_connection(stream, dispatcher.clone()));
            }
            Err(e) => {
                tracing::error!("failed to accept: {e:?}");
                continue;
            }
        }
    }
}

async fn handle_connection<T: Transport>(
    stream: tokio::net::TcpStream,
    dispatcher: Arc<Dispatcher<T>>,
) {
    let io = hyper_util::rt::TokioIo::new(stream);

    let builder =
        hyper_util::server::conn::auto::Builder::new(hyper_util::rt::tokio::TokioExecutor::new());
    let conn = builder.serve_connection(
        io,
        // hyper does not pipeline http/1.1, so one connection has at most one
        // request (and so one BLE exchange) in flight
        hyper::service::service_fn(|r| handle_request(r, dispatcher.clone())),
    );

    if let Err(e) = conn.await {
        tracing::warn!("connection error: {e:?}");
    }
}

async fn handle_request<T: Transport>(
    r: hyper::Request<hyper::body::Incoming>,
    dispatcher: Arc<Dispatcher<T>>,
) -> HttpResult {
    let method = r.method().clone();
    let path = r.uri().path().to_string();

    let response = match Route::resolve(&path) {
        None => ledbridge_hub::not_found!("not found: {path}"),
        Some(_) if method != hyper::Method::GET => {
            ledbridge_hub::method_not_allowed!("method not allowed: {method}")
        }
        Some(route) => {
            let reply = dispatcher.dispatch(route).await;
            json(&reply.body, reply.status)
        }
    };

    if let Ok(ref resp) = response {
        tracing::info!(%method, %path, status = resp.status().as_u16(), "request");
    }
    response
}

pub fn json<T: serde::Serialize>(o: T, status: hyper::StatusCode) -> HttpResult {
    let bytes = match serde_json::to_vec(&o) {
        Ok(v) => v,
        Err(e) => {
            return bytes_to_resp(
                format!("failed to serialize json: {e:?}").into_bytes(),
                hyper::StatusCode::INTERNAL_SERVER_ERROR,
            );
        }
    };
    let mut r = bytes_to_resp(bytes, status)?;
    r.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    Ok(r)
}

pub fn not_found_(m: String) -> HttpResult {
    json(Envelope::error(m), hyper::StatusCode::NOT_FOUND)
}

pub fn method_not_allowed_(m: String) -> HttpResult {
    let mut r = json(Envelope::error(m), hyper::StatusCode::METHOD_NOT_ALLOWED)?;
    r.headers_mut().insert(
        hyper::header::ALLOW,
        hyper::header::HeaderValue::from_static("GET"),
    );
    Ok(r)
}

pub fn bytes_to_resp(bytes: Vec<u8>, status: hyper::StatusCode) -> HttpResult {
    use http_body_util::BodyExt;

    let mut r = hyper::Response::new(
        http_body_util::Full::new(hyper::body::Bytes::from(bytes))
            .map_err(|e| match e {})
            .boxed(),
    );
    *r.status_mut() = status;
    Ok(r)
}

#[macro_export]
macro_rules! not_found {
    ($($t:tt)*) => {{
        ledbridge_hub::http::not_found_(format!($($t)*))
    }};
}

#[macro_export]
macro_rules! method_not_allowed {
    ($($t:tt)*) => {{
        ledbridge_hub::http::method_not_allowed_(format!($($t)*))
    }};
}
