//! In-memory spreadsheet store and a canned HTTP server used by the unit
//! tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::client::SheetsApi;
use crate::error::{AuthFailure, Result, SheetsError};
use crate::model::AuthStatus;
use crate::sheets::Row;

/// A failure the fake can be told to produce on its next data calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    Expired,
    Forbidden,
    Unavailable,
}

impl Failure {
    fn to_error(self, range: &str) -> SheetsError {
        match self {
            Failure::Expired => SheetsError::TokenExpired,
            Failure::Forbidden => SheetsError::PermissionDenied {
                range: range.to_string(),
            },
            Failure::Unavailable => SheetsError::UnexpectedStatus {
                url: "https://sheets.test".to_string(),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub initialized: bool,
    pub connected: bool,
    pub auth_failure: Option<AuthFailure>,
    pub read_failure: Option<Failure>,
    pub write_failure: Option<Failure>,
    /// Data rows per sheet name, header excluded.
    pub tables: HashMap<String, Vec<Row>>,
    pub reads: usize,
    pub writes: Vec<(String, Vec<Row>)>,
    pub appends: Vec<(String, Vec<Row>)>,
    pub signed_out: bool,
}

#[derive(Debug, Default)]
pub(crate) struct FakeSheets {
    pub state: Mutex<FakeState>,
}

impl FakeSheets {
    pub fn connected() -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            state.initialized = true;
            state.connected = true;
        }
        fake
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_rows(&self, sheet: &str, rows: Vec<Row>) {
        self.with(|s| s.tables.insert(sheet.to_string(), rows));
    }

    pub fn rows(&self, sheet: &str) -> Vec<Row> {
        self.with(|s| s.tables.get(sheet).cloned().unwrap_or_default())
    }

    fn fail(state: &mut FakeState, failure: Failure, range: &str) -> SheetsError {
        if failure == Failure::Expired {
            state.connected = false;
        }
        failure.to_error(range)
    }
}

fn sheet_name(range: &str) -> String {
    range.split('!').next().unwrap_or(range).to_string()
}

#[async_trait]
impl SheetsApi for FakeSheets {
    async fn initialize(&self) -> Result<()> {
        self.with(|s| s.initialized = true);
        Ok(())
    }

    async fn authenticate(&self) -> Result<()> {
        self.with(|s| match s.auth_failure.clone() {
            Some(failure) => Err(failure.into()),
            None => {
                s.connected = true;
                Ok(())
            }
        })
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Row>> {
        self.with(|s| {
            s.reads += 1;
            if !s.connected {
                return Err(SheetsError::NotAuthenticated);
            }
            if let Some(failure) = s.read_failure {
                return Err(Self::fail(s, failure, range));
            }
            Ok(s.tables.get(&sheet_name(range)).cloned().unwrap_or_default())
        })
    }

    async fn write_range(&self, range: &str, rows: Vec<Row>) -> Result<()> {
        self.with(|s| {
            if !s.connected {
                return Err(SheetsError::NotAuthenticated);
            }
            if let Some(failure) = s.write_failure {
                return Err(Self::fail(s, failure, range));
            }
            s.writes.push((range.to_string(), rows.clone()));
            s.tables
                .insert(sheet_name(range), rows.into_iter().skip(1).collect());
            Ok(())
        })
    }

    async fn append_rows(&self, range: &str, rows: Vec<Row>) -> Result<()> {
        self.with(|s| {
            if !s.connected {
                return Err(SheetsError::NotAuthenticated);
            }
            if let Some(failure) = s.write_failure {
                return Err(Self::fail(s, failure, range));
            }
            s.appends.push((range.to_string(), rows.clone()));
            s.tables.entry(sheet_name(range)).or_default().extend(rows);
            Ok(())
        })
    }

    async fn is_connected(&self) -> bool {
        self.with(|s| s.initialized && s.connected)
    }

    async fn auth_status(&self) -> AuthStatus {
        self.with(|s| AuthStatus {
            initialized: s.initialized,
            authenticated: s.connected,
            has_token: s.connected,
        })
    }

    async fn sign_out(&self) {
        self.with(|s| {
            s.connected = false;
            s.signed_out = true;
        });
    }
}

/// A local HTTP server that answers each connection with the next canned
/// `(status, body)` pair and records the raw request it received.
pub(crate) struct CannedServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    pub async fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                seen.lock().unwrap().push(request);
                let reply = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    /// Raw requests received so far, oldest first.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// An HTTP client that never routes the local server through a proxy.
pub(crate) fn local_http() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Read the head and a `Content-Length` body.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
