//! TLS connector construction.

pub type Connector = hyper_rustls::HttpsConnector<hyper::client::HttpConnector>;

pub fn create() -> Connector {
    let mut http = hyper::client::HttpConnector::new();
    http.enforce_http(false);

    hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http)
}
