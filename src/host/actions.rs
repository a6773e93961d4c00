//! GitHub / Gitea Actions host
//!
//! Inputs arrive as `INPUT_<NAME>` variables and saved state as
//! `STATE_<key>`. State and outputs are appended to the files named by
//! `GITHUB_STATE` and `GITHUB_OUTPUT`; runners without those files get the
//! legacy workflow commands on stdout instead.

use super::Host;
use crate::error::{PersistError, PersistResult};
use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use uuid::Uuid;

const STATE_FILE_VAR: &str = "GITHUB_STATE";
const OUTPUT_FILE_VAR: &str = "GITHUB_OUTPUT";

/// Host backed by the process environment of an Actions runner
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionsHost;

impl ActionsHost {
    pub fn new() -> Self {
        Self
    }

    fn input_var(name: &str) -> String {
        format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
    }
}

/// Render one `key<<delimiter` record for an env file
fn file_command_record(key: &str, value: &str) -> io::Result<String> {
    let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
    if key.contains(&delimiter) || value.contains(&delimiter) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "value contains the file command delimiter",
        ));
    }
    Ok(format!("{key}<<{delimiter}\n{value}\n{delimiter}\n"))
}

fn append_file_command(path: &str, key: &str, value: &str) -> io::Result<()> {
    let record = file_command_record(key, value)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(record.as_bytes())?;
    file.flush()
}

/// Escape data for a workflow command line
fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn issue(
    channel: &'static str,
    file_var: &str,
    command: &str,
    key: &str,
    value: &str,
) -> PersistResult<()> {
    match env::var(file_var).ok().filter(|p| !p.is_empty()) {
        Some(path) => {
            append_file_command(&path, key, value).map_err(|source| PersistError::HostChannel {
                channel,
                key: key.to_string(),
                source,
            })
        }
        None => {
            println!("::{command} name={key}::{value}");
            Ok(())
        }
    }
}

impl Host for ActionsHost {
    fn input(&self, name: &str) -> Option<String> {
        env::var(Self::input_var(name))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn state(&self, key: &str) -> Option<String> {
        env::var(format!("STATE_{key}")).ok().filter(|v| !v.is_empty())
    }

    fn save_state(&self, key: &str, value: &str) -> PersistResult<()> {
        issue("state", STATE_FILE_VAR, "save-state", key, value)
    }

    fn set_output(&self, key: &str, value: &str) -> PersistResult<()> {
        issue("output", OUTPUT_FILE_VAR, "set-output", key, value)
    }

    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }

    fn warning(&self, message: &str) {
        println!("::warning::{}", escape_data(message));
    }

    fn start_group(&self, title: &str) {
        println!("::group::{title}");
    }

    fn end_group(&self) {
        println!("::endgroup::");
    }
}
