use crate::{DirectDependencies, LookupConfig, LookupError, MetadataLookup};
use async_trait::async_trait;
use berth_schema::RepositoryKey;
use std::io::Read;

pub const DEPENDENCIES_PATH: &str = "/api/repositories/dependencies";

/// Fetches direct dependencies from a tool shed over HTTP.
///
/// Expects:
/// - `GET <url>/api/repositories/dependencies?tool_shed=..&owner=..&name=..&changeset_revision=..`
///   returning `{"dependencies": [{"key": "...", "prior_installation_required": false}]}`
/// - `404` for unknown repository revisions
#[derive(Clone)]
pub struct HttpLookup {
    config: LookupConfig,
    agent: ureq::Agent,
}

impl HttpLookup {
    pub fn new(config: LookupConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(config.timeout())
            .build();
        let agent = ureq::Agent::new_with_config(agent_config);
        Self { config, agent }
    }

    pub fn url(&self) -> String {
        format!("{}{DEPENDENCIES_PATH}", self.config.url)
    }

    /// Blocking fetch of one repository's direct dependencies.
    pub fn fetch(&self, key: &RepositoryKey) -> Result<DirectDependencies, LookupError> {
        let url = self.url();
        tracing::debug!("GET {url} for {key}");
        let mut req = self
            .agent
            .get(&url)
            .query("tool_shed", key.tool_shed())
            .query("owner", key.owner())
            .query("name", key.name())
            .query("changeset_revision", key.changeset_revision());
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(LookupError::NotFound(key.to_string()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(LookupError::Unreachable(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(LookupError::Unreachable(e.to_string()));
            }
        };

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| LookupError::Unreachable(e.to_string()))?;
        serde_json::from_slice(&body)
            .map_err(|e| LookupError::Malformed(format!("dependencies of {key}: {e}")))
    }
}

#[async_trait]
impl MetadataLookup for HttpLookup {
    async fn get_direct_dependencies(
        &self,
        key: &RepositoryKey,
    ) -> Result<DirectDependencies, LookupError> {
        let this = self.clone();
        let key = key.clone();
        tokio::task::spawn_blocking(move || this.fetch(&key))
            .await
            .map_err(|e| LookupError::Unreachable(format!("lookup task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    /// A captured HTTP request for header inspection.
    #[derive(Debug, Clone)]
    struct CapturedRequest {
        target: String,
        headers: HashMap<String, String>,
    }

    /// Serves canned bodies keyed by repository name; unknown names get 404.
    struct MockShed {
        addr: String,
        _handle: std::thread::JoinHandle<()>,
        requests: Arc<Mutex<Vec<CapturedRequest>>>,
    }

    impl MockShed {
        fn start(bodies: HashMap<&'static str, &'static str>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = format!("http://{}", listener.local_addr().unwrap());
            let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));
            let bodies = Arc::new(bodies);

            let requests_clone = Arc::clone(&requests);
            let handle = std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let reqs = Arc::clone(&requests_clone);
                    let bodies = Arc::clone(&bodies);

                    std::thread::spawn(move || {
                        let mut reader = BufReader::new(stream.try_clone().unwrap());
                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).is_err() {
                            return;
                        }
                        let parts: Vec<&str> = request_line.trim().splitn(3, ' ').collect();
                        if parts.len() < 2 {
                            return;
                        }
                        let target = parts[1].to_owned();

                        let mut headers = HashMap::new();
                        loop {
                            let mut line = String::new();
                            if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                                break;
                            }
                            if let Some((k, v)) = line.trim().split_once(": ") {
                                headers.insert(k.to_lowercase(), v.to_owned());
                            }
                        }
                        reqs.lock().unwrap().push(CapturedRequest {
                            target: target.clone(),
                            headers,
                        });

                        let name = target
                            .split(['?', '&'])
                            .find_map(|p| p.strip_prefix("name="))
                            .unwrap_or_default();
                        let response = match bodies.get(name) {
                            Some(body) if target.starts_with(DEPENDENCIES_PATH) => format!(
                                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                                body.len()
                            ),
                            _ => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                                .to_owned(),
                        };
                        let _ = stream.write_all(response.as_bytes());
                        let _ = stream.flush();
                    });
                }
            });

            MockShed {
                addr,
                _handle: handle,
                requests,
            }
        }

        fn captured_requests(&self) -> Vec<CapturedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn key(name: &str) -> RepositoryKey {
        RepositoryKey::new("shed.example.org:9009", "iuc", name, "abc123").unwrap()
    }

    fn shed() -> MockShed {
        MockShed::start(HashMap::from([
            (
                "bwa",
                r#"{"dependencies": [{"key": "shed.example.org:9009/repos/iuc/package_zlib/def456", "prior_installation_required": true}]}"#,
            ),
            ("package_zlib", r#"{"dependencies": []}"#),
            ("broken", r#"{"dependencies": "#),
        ]))
    }

    #[test]
    fn fetch_parses_dependencies() {
        let server = shed();
        let lookup = HttpLookup::new(LookupConfig::new(&server.addr));
        let deps = lookup.fetch(&key("bwa")).unwrap();
        assert_eq!(deps.dependencies.len(), 1);
        assert_eq!(deps.dependencies[0].key.name(), "package_zlib");
        assert!(deps.dependencies[0].prior_installation_required);

        let leaf = lookup.fetch(&key("package_zlib")).unwrap();
        assert!(leaf.dependencies.is_empty());
    }

    #[test]
    fn fetch_sends_key_as_query() {
        let server = shed();
        let lookup = HttpLookup::new(LookupConfig::new(&server.addr));
        lookup.fetch(&key("bwa")).unwrap();

        let reqs = server.captured_requests();
        assert_eq!(reqs.len(), 1);
        let target = &reqs[0].target;
        assert!(target.starts_with(DEPENDENCIES_PATH));
        assert!(target.contains("owner=iuc"));
        assert!(target.contains("name=bwa"));
        assert!(target.contains("changeset_revision=abc123"));
        assert!(target.contains("tool_shed=shed.example.org"));
    }

    #[test]
    fn unknown_repository_is_not_found() {
        let server = shed();
        let lookup = HttpLookup::new(LookupConfig::new(&server.addr));
        assert!(matches!(
            lookup.fetch(&key("samtools")),
            Err(LookupError::NotFound(_))
        ));
    }

    #[test]
    fn invalid_body_is_malformed() {
        let server = shed();
        let lookup = HttpLookup::new(LookupConfig::new(&server.addr));
        assert!(matches!(
            lookup.fetch(&key("broken")),
            Err(LookupError::Malformed(_))
        ));
    }

    #[test]
    fn closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let lookup = HttpLookup::new(LookupConfig::new(&addr));
        assert!(matches!(
            lookup.fetch(&key("bwa")),
            Err(LookupError::Unreachable(_))
        ));
    }

    /// Accepts connections and never answers.
    fn silent_shed() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        std::thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                held.push(stream);
            }
        });
        addr
    }

    #[test]
    fn silent_server_times_out() {
        let addr = silent_shed();
        let lookup = HttpLookup::new(LookupConfig::new(&addr).with_timeout_secs(1));
        let start = std::time::Instant::now();
        assert!(matches!(
            lookup.fetch(&key("bwa")),
            Err(LookupError::Unreachable(_))
        ));
        assert!(start.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn auth_token_sent_as_bearer_header() {
        let server = shed();
        let lookup =
            HttpLookup::new(LookupConfig::new(&server.addr).with_token("secret-token-42"));
        lookup.fetch(&key("package_zlib")).unwrap();

        let reqs = server.captured_requests();
        assert_eq!(
            reqs[0].headers.get("authorization"),
            Some(&"Bearer secret-token-42".to_owned()),
        );
    }

    #[test]
    fn no_auth_header_without_token() {
        let server = shed();
        let lookup = HttpLookup::new(LookupConfig::new(&server.addr));
        lookup.fetch(&key("package_zlib")).unwrap();

        let reqs = server.captured_requests();
        assert!(!reqs[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn async_lookup_runs_off_the_runtime() {
        let server = shed();
        let lookup = HttpLookup::new(LookupConfig::new(&server.addr));
        let deps = lookup.get_direct_dependencies(&key("bwa")).await.unwrap();
        assert_eq!(deps.dependencies.len(), 1);
    }
}
