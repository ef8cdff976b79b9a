// XML-RPC client - Talks to supervisord over HTTP on TCP or a Unix socket

use crate::error::{Result, UptimemonError};
use crate::supervisor::xmlrpc::{self, Value};
use crate::supervisor::{ProcessInfo, QualifiedName, SupervisorRpc};
use reqwest::blocking::{Body, Client, Request};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use reqwest::Url;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables supervisord sets for its event listeners
pub const SERVER_URL_ENV: &str = "SUPERVISOR_SERVER_URL";
pub const USERNAME_ENV: &str = "SUPERVISOR_USERNAME";
pub const PASSWORD_ENV: &str = "SUPERVISOR_PASSWORD";

/// Path of the XML-RPC handler on the supervisor's HTTP server
const RPC_PATH: &str = "/RPC2";

/// Where the supervisor's RPC interface listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorUrl {
    Http(Url),
    Unix(PathBuf),
}

impl SupervisorUrl {
    /// Parse `http://host[:port][/path]` or `unix:///path/to/socket`
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(path) = url.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(UptimemonError::ConfigError(format!(
                    "Missing socket path in supervisor URL '{}'",
                    url
                )));
            }
            return Ok(SupervisorUrl::Unix(PathBuf::from(path)));
        }

        let parsed = Url::parse(url).map_err(|e| {
            UptimemonError::ConfigError(format!("Invalid supervisor URL '{}': {}", url, e))
        })?;

        if parsed.scheme() != "http" {
            return Err(UptimemonError::ConfigError(format!(
                "Unsupported supervisor URL '{}'. Use http:// or unix://",
                url
            )));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(UptimemonError::ConfigError(format!(
                "Missing host in supervisor URL '{}'",
                url
            )));
        }

        Ok(SupervisorUrl::Http(parsed))
    }

    /// Address of the RPC handler; Unix sockets get a placeholder host
    fn endpoint(&self) -> Result<Url> {
        let endpoint = match self {
            SupervisorUrl::Http(base) => base.join(RPC_PATH),
            SupervisorUrl::Unix(_) => Url::parse("http://localhost").and_then(|u| u.join(RPC_PATH)),
        };
        endpoint.map_err(|e| UptimemonError::ConfigError(format!("Invalid RPC endpoint: {}", e)))
    }
}

/// Supervisor RPC client speaking XML-RPC over HTTP
#[derive(Debug, Clone)]
pub struct XmlRpcClient {
    url: SupervisorUrl,
    credentials: Option<(String, String)>,
    http: Client,
}

impl XmlRpcClient {
    pub fn new(url: SupervisorUrl) -> Result<Self> {
        // stopProcess only answers once the process has exited
        let http = Client::builder()
            .timeout(None::<Duration>)
            .user_agent(concat!("uptimemon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                UptimemonError::TransportError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            url,
            credentials: None,
            http,
        })
    }

    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.credentials = Some((username, password));
        self
    }

    /// Build a client from the listener environment supervisord provides
    pub fn from_env(env: &HashMap<String, String>) -> Result<Self> {
        let url = env.get(SERVER_URL_ENV).ok_or_else(|| {
            UptimemonError::ConfigError(format!(
                "{} is not set; uptimemon must run as a supervisor event listener",
                SERVER_URL_ENV
            ))
        })?;

        let client = Self::new(SupervisorUrl::parse(url)?)?;
        Ok(match env.get(USERNAME_ENV) {
            Some(username) => client.with_credentials(
                username.clone(),
                env.get(PASSWORD_ENV).cloned().unwrap_or_default(),
            ),
            None => client,
        })
    }

    pub fn url(&self) -> &SupervisorUrl {
        &self.url
    }

    /// Invoke an XML-RPC method and decode its result
    pub fn call(&self, method: &str, params: &[Value]) -> Result<Value> {
        let request = self.build_request(xmlrpc::encode_call(method, params))?;

        tracing::debug!(method, "calling supervisor");
        let body = match &self.url {
            SupervisorUrl::Http(_) => self
                .http
                .execute(request)
                .and_then(|response| response.error_for_status())
                .and_then(|response| response.text())
                .map_err(|e| {
                    UptimemonError::TransportError(format!("Supervisor request failed: {}", e))
                })?,
            SupervisorUrl::Unix(path) => send_over_unix_socket(path, &request)?,
        };

        xmlrpc::decode_response(&body)
    }

    fn build_request(&self, body: String) -> Result<Request> {
        let mut builder = self
            .http
            .post(self.url.endpoint()?)
            .header(CONTENT_TYPE, "text/xml")
            .body(body);
        if let Some((username, password)) = &self.credentials {
            builder = builder.basic_auth(username, Some(password));
        }
        builder
            .build()
            .map_err(|e| UptimemonError::TransportError(format!("Failed to build request: {}", e)))
    }

    fn call_for_process(&self, method: &str, name: &QualifiedName) -> Result<Value> {
        self.call(method, &[Value::String(name.to_string())])
    }
}

impl SupervisorRpc for XmlRpcClient {
    fn get_all_process_info(&self) -> Result<Vec<ProcessInfo>> {
        let value = self.call("supervisor.getAllProcessInfo", &[])?;
        let items = value.as_array().ok_or_else(|| {
            UptimemonError::RpcDecodeError("getAllProcessInfo did not return an array".to_string())
        })?;
        items.iter().map(ProcessInfo::from_value).collect()
    }

    fn get_process_info(&self, name: &QualifiedName) -> Result<ProcessInfo> {
        let value = self.call_for_process("supervisor.getProcessInfo", name)?;
        ProcessInfo::from_value(&value)
    }

    fn stop_process(&self, name: &QualifiedName) -> Result<()> {
        self.call_for_process("supervisor.stopProcess", name)
            .map(|_| ())
    }

    fn start_process(&self, name: &QualifiedName) -> Result<()> {
        self.call_for_process("supervisor.startProcess", name)
            .map(|_| ())
    }
}

// reqwest cannot dial Unix sockets, so the prepared request is written out as
// HTTP/1.0 by hand and the connection is read until the server closes it.
fn send_over_unix_socket(path: &Path, request: &Request) -> Result<String> {
    let mut stream = UnixStream::connect(path).map_err(|e| {
        UptimemonError::TransportError(format!("Failed to connect to {}: {}", path.display(), e))
    })?;

    write_request(&mut stream, request)
        .map_err(|e| UptimemonError::TransportError(format!("Failed to send request: {}", e)))?;

    let mut raw = Vec::new();
    stream
        .read_to_end(&mut raw)
        .map_err(|e| UptimemonError::TransportError(format!("Failed to read response: {}", e)))?;

    let raw = String::from_utf8(raw)
        .map_err(|e| UptimemonError::TransportError(format!("Response is not UTF-8: {}", e)))?;
    response_body(&raw).map(str::to_string)
}

fn write_request<W: Write>(mut out: W, request: &Request) -> std::io::Result<()> {
    let body = request.body().and_then(Body::as_bytes).unwrap_or_default();

    write!(out, "{} {} HTTP/1.0\r\n", request.method(), request.url().path())?;
    write!(out, "Host: localhost\r\n")?;
    for (name, value) in request.headers() {
        if name == HOST || name == CONTENT_LENGTH {
            continue;
        }
        out.write_all(name.as_str().as_bytes())?;
        out.write_all(b": ")?;
        out.write_all(value.as_bytes())?;
        out.write_all(b"\r\n")?;
    }
    write!(out, "Content-Length: {}\r\n\r\n", body.len())?;
    out.write_all(body)?;
    out.flush()
}

/// Body of an HTTP response, rejecting non-200 statuses
fn response_body(raw: &str) -> Result<&str> {
    let (head, body) = raw.split_once("\r\n\r\n").ok_or_else(|| {
        UptimemonError::TransportError("Malformed HTTP response from supervisor".to_string())
    })?;

    let status_line = head.lines().next().unwrap_or_default();
    if status_line.split_whitespace().nth(1) != Some("200") {
        return Err(UptimemonError::TransportError(format!(
            "Supervisor answered '{}'",
            status_line
        )));
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn test_parse_http_url() {
        let url = SupervisorUrl::parse("http://127.0.0.1:9001").unwrap();
        assert_eq!(
            url.endpoint().unwrap().as_str(),
            "http://127.0.0.1:9001/RPC2"
        );

        let url = SupervisorUrl::parse("http://localhost/RPC2").unwrap();
        assert_eq!(url.endpoint().unwrap().as_str(), "http://localhost/RPC2");
    }

    #[test]
    fn test_parse_ipv6_url() {
        match SupervisorUrl::parse("http://[::1]:9001").unwrap() {
            SupervisorUrl::Http(url) => {
                assert_eq!(url.host_str(), Some("[::1]"));
                assert_eq!(url.port(), Some(9001));
            }
            other => panic!("Expected an HTTP URL, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_unix_url() {
        assert_eq!(
            SupervisorUrl::parse("unix:///var/run/supervisor.sock").unwrap(),
            SupervisorUrl::Unix(PathBuf::from("/var/run/supervisor.sock"))
        );
    }

    #[test]
    fn test_parse_invalid_urls() {
        assert!(SupervisorUrl::parse("ftp://host").is_err());
        assert!(SupervisorUrl::parse("unix://").is_err());
        assert!(SupervisorUrl::parse("http://:9001").is_err());
        assert!(SupervisorUrl::parse("http://host:port").is_err());
    }

    #[test]
    fn test_from_env_requires_url() {
        let env = HashMap::new();
        assert!(matches!(
            XmlRpcClient::from_env(&env),
            Err(UptimemonError::ConfigError(_))
        ));
    }

    #[test]
    fn test_from_env_with_credentials() {
        let mut env = HashMap::new();
        env.insert(SERVER_URL_ENV.to_string(), "unix:///tmp/supervisor.sock".to_string());
        env.insert(USERNAME_ENV.to_string(), "user".to_string());
        env.insert(PASSWORD_ENV.to_string(), "123".to_string());

        let client = XmlRpcClient::from_env(&env).unwrap();
        assert_eq!(
            client.url(),
            &SupervisorUrl::Unix(PathBuf::from("/tmp/supervisor.sock"))
        );

        let request = client.build_request("<x/>".to_string()).unwrap();
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Basic dXNlcjoxMjM="
        );
    }

    #[test]
    fn test_write_request_for_unix_socket() {
        let client = XmlRpcClient::new(SupervisorUrl::Unix(PathBuf::from("/tmp/s.sock"))).unwrap();
        let request = client.build_request("<x/>".to_string()).unwrap();

        let mut written = Vec::new();
        write_request(&mut written, &request).unwrap();
        let written = String::from_utf8(written).unwrap();

        assert!(written.starts_with("POST /RPC2 HTTP/1.0\r\nHost: localhost\r\n"));
        assert!(written.contains("content-type: text/xml\r\n"));
        assert!(written.ends_with("Content-Length: 4\r\n\r\n<x/>"));
    }

    #[test]
    fn test_response_body() {
        let raw = "HTTP/1.0 200 OK\r\nContent-Type: text/xml\r\n\r\n<methodResponse/>";
        assert_eq!(response_body(raw).unwrap(), "<methodResponse/>");

        assert!(matches!(
            response_body("HTTP/1.0 401 Unauthorized\r\n\r\n"),
            Err(UptimemonError::TransportError(_))
        ));
    }
}
