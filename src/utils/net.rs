/// accept ip either like 127.0.0.1 or docker host name: node1
pub(crate) fn address_str(addr: &str) -> String {
    // Strip existing "http://" or "https://" prefixes if duplicated.
    let normalized = addr.trim_start_matches("http://").trim_start_matches("https://");
    format!("http://{normalized}")
}

/// Liveness URL of a node's HTTP API
pub(crate) fn ping_url(
    host: &str,
    port: u16,
    path: &str,
) -> String {
    format!("{}:{}{}", address_str(host), port, path)
}

/// `worker-2:3000` -> `worker-2`
pub(crate) fn host_of(addr: &str) -> &str {
    addr.split(':').next().unwrap_or(addr)
}
