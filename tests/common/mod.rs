//! Shared test doubles, a minimal in-process license/manifest server and a
//! spy cdm implementing the [`vsl::Cdm`] capability.

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    io::{BufRead, BufReader, Read, Write},
    net::{TcpListener, TcpStream},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    thread,
};
use vsl::{Cdm, CdmError, Key, KeyType, SessionId};

#[derive(Clone, Debug)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|x| x.as_str())
    }
}

/// A blocking single threaded HTTP responder bound to a random local port.
/// Every response carries `Connection: close` so the accept loop stays
/// sequential.
pub struct StubServer {
    url: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl StubServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> (u16, Vec<u8>) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else {
                    continue;
                };

                if let Some(request) = read_request(&mut stream) {
                    let (status, body) = handler(&request);
                    seen.lock().unwrap().push(request);

                    let head = format!(
                        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        if status == 200 { "OK" } else { "NO" },
                        body.len()
                    );
                    let _ = stream.write_all(head.as_bytes());
                    let _ = stream.write_all(&body);
                }
            }
        });

        Self { url, requests }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_owned();
    let path = parts.next()?.to_owned();

    let mut headers = HashMap::new();

    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();

        if line.is_empty() {
            break;
        }

        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
        }
    }

    let length = headers
        .get("content-length")
        .and_then(|x| x.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;

    Some(Request {
        method,
        path,
        headers,
        body,
    })
}

/// A deterministic cdm double. License bodies are parsed from
/// `type:kidhex:keyhex` entries separated by `;`, anything else is a
/// [`CdmError::LicenseParse`].
#[derive(Clone, Default)]
pub struct StubCdm {
    inner: Arc<StubCdmInner>,
}

#[derive(Default)]
struct StubCdmInner {
    next_id: AtomicU64,
    opens: AtomicUsize,
    closes: AtomicUsize,
    challenges: AtomicUsize,
    sessions: Mutex<HashSet<u64>>,
    keys: Mutex<HashMap<u64, Vec<Key>>>,
}

impl StubCdm {
    pub fn opens(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    pub fn challenges(&self) -> usize {
        self.inner.challenges.load(Ordering::SeqCst)
    }

    fn check_open(&self, session: SessionId) -> Result<(), CdmError> {
        if self.inner.sessions.lock().unwrap().contains(&session.0) {
            Ok(())
        } else {
            Err(CdmError::InvalidSession(session))
        }
    }
}

impl Cdm for StubCdm {
    fn open(&self) -> Result<SessionId, CdmError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.sessions.lock().unwrap().insert(id);
        Ok(SessionId(id))
    }

    fn challenge(&self, session: SessionId, pssh: &[u8]) -> Result<Vec<u8>, CdmError> {
        self.check_open(session)?;
        self.inner.challenges.fetch_add(1, Ordering::SeqCst);
        Ok(format!("challenge:{}", hex::encode(pssh)).into_bytes())
    }

    fn parse_license(&self, session: SessionId, license: &[u8]) -> Result<(), CdmError> {
        self.check_open(session)?;

        let text = std::str::from_utf8(license)
            .map_err(|_| CdmError::LicenseParse("license is not utf-8".to_owned()))?;
        let mut keys = vec![];

        for entry in text.split(';').filter(|x| !x.is_empty()) {
            let mut fields = entry.split(':');

            let (Some(typ), Some(kid), Some(key), None) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(CdmError::LicenseParse(format!("bad entry {}", entry)));
            };

            keys.push(Key {
                typ: match typ {
                    "content" => KeyType::Content,
                    "signing" => KeyType::Signing,
                    x => KeyType::Other(x.to_owned()),
                },
                kid: decode_half(kid)?,
                key: decode_half(key)?,
            });
        }

        self.inner.keys.lock().unwrap().insert(session.0, keys);
        Ok(())
    }

    fn keys(&self, session: SessionId) -> Result<Vec<Key>, CdmError> {
        self.check_open(session)?;
        Ok(self
            .inner
            .keys
            .lock()
            .unwrap()
            .get(&session.0)
            .cloned()
            .unwrap_or_default())
    }

    fn close(&self, session: SessionId) -> Result<(), CdmError> {
        self.check_open(session)?;
        self.inner.sessions.lock().unwrap().remove(&session.0);
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn decode_half(value: &str) -> Result<[u8; 16], CdmError> {
    let bytes =
        hex::decode(value).map_err(|_| CdmError::LicenseParse(format!("bad hex {}", value)))?;
    bytes
        .try_into()
        .map_err(|_| CdmError::LicenseParse(format!("{} is not 16 bytes", value)))
}

/// `kidhex` helper, 16 repeated bytes.
pub fn half(n: u8) -> String {
    hex::encode([n; 16])
}

/// One `content` license entry for the stub cdm.
pub fn content_entry(kid: u8, key: u8) -> String {
    format!("content:{}:{}", half(kid), half(key))
}
