//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_template("docker", templates::MINIMAL);
//!     fixture.command().args(["validate", "template://docker"]).assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::templates;
    #[allow(unused_imports)]
    pub use super::TestFixture;
}

/// Common template YAML snippets for testing.
#[allow(dead_code)]
pub mod templates {
    /// Smallest template that passes validation.
    pub const MINIMAL: &str = r#"images:
- location: https://example.com/images/ubuntu-24.04-amd64.img
  arch: x86_64
"#;

    /// Template inheriting everything from a catalog base.
    pub const WITH_BASE: &str = r#"base: template://_images/ubuntu
cpus: 4
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "cpus: [unclosed\n";

    /// Template with a misspelled field.
    pub const WITH_TYPO: &str = r#"images:
- location: https://example.com/images/ubuntu-24.04-amd64.img
cpu: 4
"#;
}

/// A temporary configuration home plus a scratch directory for templates.
///
/// Layout inside the temporary directory:
///
/// ```text
/// home/templates/   catalog used for template:// locators
/// home/*.yaml       site documents (base, default, override)
/// instances/        instance directories
/// work/             free-form files, and the command's working directory
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("home/templates")
            .create_dir_all()
            .expect("Failed to create catalog directory");
        temp_dir
            .child("work")
            .create_dir_all()
            .expect("Failed to create work directory");
        Self { temp_dir }
    }

    /// Add a catalog template reachable as `template://NAME`.
    pub fn with_template(self, name: &str, content: &str) -> Self {
        self.temp_dir
            .child(format!("home/templates/{}.yaml", name))
            .write_str(content)
            .expect("Failed to write template");
        self
    }

    /// Add a site document (`base.yaml`, `default.yaml`, `override.yaml`).
    #[allow(dead_code)]
    pub fn with_site_file(self, name: &str, content: &str) -> Self {
        self.temp_dir
            .child(format!("home/{}", name))
            .write_str(content)
            .expect("Failed to write site file");
        self
    }

    /// Add a file under the working directory.
    #[allow(dead_code)]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(format!("work/{}", path))
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// The working directory.
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().join("work")
    }

    /// The configuration home.
    pub fn home(&self) -> PathBuf {
        self.temp_dir.path().join("home")
    }

    /// The instances directory.
    pub fn instances(&self) -> PathBuf {
        self.temp_dir.path().join("instances")
    }

    /// Absolute path of a file under the working directory, as a string.
    #[allow(dead_code)]
    pub fn file_locator(&self, path: &str) -> String {
        self.path().join(path).to_string_lossy().into_owned()
    }

    /// Create a child path under the working directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(format!("work/{}", path))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// Create a command configured to run in this fixture's working
    /// directory, with the fixture's home and instances directories.
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("vmtmpl");
        cmd.current_dir(self.path())
            .env("VMTMPL_HOME", self.home())
            .env("VMTMPL_INSTANCES", self.instances())
            .env_remove("RUST_LOG");
        cmd
    }
}

/// Serves fixed responses over HTTP on a local port.
///
/// `routes` maps request paths to `(status, body)`. Unknown paths get a
/// 404. Returns the base URL, e.g. `http://127.0.0.1:41234`.
#[allow(dead_code)]
pub async fn serve(routes: HashMap<String, (u16, Vec<u8>)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let routes = routes.clone();
            tokio::spawn(async move {
                let path = read_request_path(&mut socket).await;
                let (status, body) = routes
                    .get(&path)
                    .cloned()
                    .unwrap_or((404, b"not found".to_vec()));
                let head = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    if status == 200 { "OK" } else { "Error" },
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Accepts connections and never answers them.
#[allow(dead_code)]
pub async fn serve_stalled() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    format!("http://{}", addr)
}

async fn read_request_path(socket: &mut tokio::net::TcpStream) -> String {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&request)
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_layout() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
        assert!(fixture.home().join("templates").exists());
    }

    #[test]
    fn test_fixture_with_template() {
        let fixture = TestFixture::new().with_template("docker", templates::MINIMAL);
        assert!(fixture.home().join("templates/docker.yaml").exists());
    }

    #[test]
    fn test_fixture_with_file() {
        let fixture = TestFixture::new().with_file("test.yaml", "cpus: 1\n");
        assert!(fixture.path().join("test.yaml").exists());
    }

    #[test]
    fn test_templates_are_valid_yaml() {
        for template in [templates::MINIMAL, templates::WITH_BASE, templates::WITH_TYPO] {
            let result: Result<serde_yaml::Value, _> = serde_yaml::from_str(template);
            assert!(result.is_ok(), "Template should be valid YAML: {}", template);
        }
    }
}
