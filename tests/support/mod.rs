//! Purpose: Loopback HTTP/1.1 stub server shared by integration tests.
//! Exports: `StubServer`, `Route`, `unreachable_url`, `unreachable_https_url`, `self_signed_ca_pem`, `POST_ONE`.
//! Role: Serve canned responses so fetch behavior is testable without the network.
//! Invariants: Binds 127.0.0.1 on an ephemeral port; every response closes the connection.
//! Invariants: Each received request is recorded (path + lowercased headers).
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const POST_ONE: &str = r#"{
  "userId": 1,
  "id": 1,
  "title": "sunt aut facere repellat provident occaecati excepturi optio reprehenderit",
  "body": "quia et suscipit\nsuscipit recusandae consequuntur expedita et cum\nreprehenderit molestiae ut ut quas totam\nnostrum rerum est autem sunt rem eveniet architecto"
}"#;

pub const POST_ONE_TITLE: &str =
    "sunt aut facere repellat provident occaecati excepturi optio reprehenderit";

#[derive(Clone, Debug)]
pub enum Route {
    Respond {
        status: u16,
        reason: &'static str,
        content_type: &'static str,
        body: String,
    },
    Redirect {
        location: String,
    },
    /// Read the request, then never answer.
    Stall,
}

impl Route {
    pub fn json(body: impl Into<String>) -> Self {
        Self::Respond {
            status: 200,
            reason: "OK",
            content_type: "application/json",
            body: body.into(),
        }
    }

    pub fn status(status: u16, reason: &'static str, body: impl Into<String>) -> Self {
        Self::Respond {
            status,
            reason,
            content_type: "application/json",
            body: body.into(),
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
        }
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::Respond {
            status: 200,
            reason: "OK",
            content_type: "text/html",
            body: body.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
}

pub struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let routes = Arc::clone(&routes);
                let recorded = Arc::clone(&recorded);
                thread::spawn(move || handle(stream, &routes, &recorded));
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }
}

/// A loopback URL with nothing listening behind it.
pub fn unreachable_url() -> String {
    format!("http://{}/posts/1", free_loopback_addr())
}

pub fn unreachable_https_url() -> String {
    format!("https://{}/posts/1", free_loopback_addr())
}

fn free_loopback_addr() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr
}

/// PEM text of a freshly generated self-signed certificate for `localhost`.
pub fn self_signed_ca_pem() -> String {
    rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .expect("generate certificate")
        .serialize_pem()
        .expect("serialize certificate")
}

fn handle(
    stream: TcpStream,
    routes: &HashMap<String, Route>,
    recorded: &Mutex<Vec<RecordedRequest>>,
) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    recorded
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
        .push(RecordedRequest {
            method,
            path: path.clone(),
            headers,
        });

    let route = routes.get(&path).cloned().unwrap_or(Route::Respond {
        status: 404,
        reason: "Not Found",
        content_type: "application/json",
        body: r#"{"error":"no such route"}"#.to_string(),
    });

    let mut stream = stream;
    let response = match route {
        Route::Respond {
            status,
            reason,
            content_type,
            body,
        } => format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
        Route::Redirect { location } => format!(
            "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        ),
        Route::Stall => {
            thread::sleep(Duration::from_secs(3));
            return;
        }
    };
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
