#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use ingest::{
    CommandOutput, DEFAULT_LOG_PREFIX, ExtractOptions, RemoteExecutor, TransportError,
    listing_command, shell_quote,
};
use tempfile::TempDir;
use webextract_core::{Credentials, Target};
use webextract_db::{Db, NewTarget};

pub struct TestEnv {
    pub dir: TempDir,
    pub db: Db,
}

impl TestEnv {
    pub fn working_file(&self) -> PathBuf {
        self.dir.path().join("work").join("access.log")
    }

    pub fn options(&self) -> ExtractOptions {
        ExtractOptions {
            working_file: self.working_file(),
            ..ExtractOptions::default()
        }
    }

    pub fn register(&mut self, host: &str, directories: &[&str]) -> Target {
        self.db
            .add_target(&NewTarget {
                host: host.to_string(),
                username: "logs".to_string(),
                credentials: Credentials {
                    password: Some("secret".to_string()),
                    key_file: None,
                },
                directories: directories.iter().map(|dir| dir.to_string()).collect(),
            })
            .expect("add target")
    }
}

pub fn setup_env() -> TestEnv {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut db = Db::open(dir.path().join("usage.sqlite")).expect("open db");
    db.migrate().expect("migrate db");
    TestEnv { dir, db }
}

/// A request-style access log line for the default service path.
pub fn access_line(tenant: &str, timestamp: &str, bytes: &str) -> String {
    format!(
        r#"198.51.100.7 - - [{timestamp}] "GET /networking/Service?op=status&id={tenant}&fmt=json HTTP/1.1" 200 {bytes} "-" "probe/1.0""#
    )
}

#[derive(Default)]
struct FakeHost {
    directories: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    listing_stderr: BTreeMap<String, String>,
    unreadable: BTreeSet<String>,
    unreachable: bool,
}

/// In-memory hosts answering the listing and `cat` commands the collector issues.
#[derive(Default)]
pub struct FakeExecutor {
    hosts: BTreeMap<String, FakeHost>,
    calls: RefCell<Vec<String>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_directory(&mut self, host: &str, directory: &str) {
        self.host(host).directories.insert(directory.to_string());
    }

    pub fn add_file(&mut self, host: &str, directory: &str, name: &str, lines: &[String]) {
        let mut contents = lines.join("\n");
        contents.push('\n');
        self.add_raw_file(host, directory, name, contents.into_bytes());
    }

    pub fn add_raw_file(&mut self, host: &str, directory: &str, name: &str, contents: Vec<u8>) {
        let fake = self.host(host);
        fake.directories.insert(directory.to_string());
        fake.files.insert(format!("{directory}/{name}"), contents);
    }

    pub fn set_listing_stderr(&mut self, host: &str, directory: &str, stderr: &str) {
        let fake = self.host(host);
        fake.directories.insert(directory.to_string());
        fake.listing_stderr
            .insert(directory.to_string(), stderr.to_string());
    }

    pub fn set_unreadable(&mut self, host: &str, directory: &str, name: &str) {
        self.host(host)
            .unreadable
            .insert(format!("{directory}/{name}"));
    }

    pub fn set_unreachable(&mut self, host: &str) {
        self.host(host).unreachable = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn host(&mut self, host: &str) -> &mut FakeHost {
        self.hosts.entry(host.to_string()).or_default()
    }

    fn list(&self, fake: &FakeHost, directory: &str) -> CommandOutput {
        let prefix = format!("{directory}/{DEFAULT_LOG_PREFIX}");
        let names = fake
            .files
            .keys()
            .filter(|path| path.starts_with(&prefix))
            .cloned()
            .collect::<Vec<_>>();
        let mut stderr = fake
            .listing_stderr
            .get(directory)
            .cloned()
            .unwrap_or_default();
        if names.is_empty() && stderr.is_empty() {
            stderr = format!("ls: cannot access '{prefix}*': No such file or directory\n");
        }
        let mut stdout = names.join("\n");
        if !stdout.is_empty() {
            stdout.push('\n');
        }
        CommandOutput {
            stdout: stdout.into_bytes(),
            stderr: stderr.into_bytes(),
            exit_status: Some(if names.is_empty() { 2 } else { 0 }),
        }
    }
}

impl RemoteExecutor for FakeExecutor {
    fn execute(&self, target: &Target, command: &str) -> Result<CommandOutput, TransportError> {
        self.calls
            .borrow_mut()
            .push(format!("{}: {}", target.host, command));
        let Some(fake) = self.hosts.get(&target.host).filter(|fake| !fake.unreachable) else {
            return Err(TransportError::Exit {
                host: target.label(),
                command: command.to_string(),
                status: "exit status 255".to_string(),
                stderr: "ssh: connect to host: Connection refused".to_string(),
            });
        };
        for directory in &fake.directories {
            if command == listing_command(directory, DEFAULT_LOG_PREFIX) {
                return Ok(self.list(fake, directory));
            }
        }
        for (path, contents) in &fake.files {
            if command == format!("cat {}", shell_quote(path)) {
                if fake.unreadable.contains(path) {
                    return Ok(CommandOutput {
                        stdout: Vec::new(),
                        stderr: format!("cat: {path}: Input/output error\n").into_bytes(),
                        exit_status: Some(1),
                    });
                }
                return Ok(CommandOutput {
                    stdout: contents.clone(),
                    stderr: Vec::new(),
                    exit_status: Some(0),
                });
            }
        }
        Ok(CommandOutput {
            stdout: Vec::new(),
            stderr: format!("sh: unexpected command: {command}\n").into_bytes(),
            exit_status: Some(127),
        })
    }
}
