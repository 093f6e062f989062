//! Webhook related structures

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::error::{DispatchError, Result};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A GitHub `push` event.
///
/// Deserializes from GitHub's snake_case payload. Serializes with the
/// PascalCase field names argument templates refer to (`.Repo.FullName`,
/// `.HeadCommit.Message`, ...).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase"))]
pub struct PushEvent {
    pub r#ref: Option<String>,
    pub before: Option<String>,
    pub after: Option<String>,
    pub base_ref: Option<String>,
    pub compare: Option<String>,
    pub created: Option<bool>,
    pub deleted: Option<bool>,
    pub forced: Option<bool>,
    pub size: Option<u64>,
    pub distinct_size: Option<u64>,
    #[serde(rename(deserialize = "repository", serialize = "Repo"))]
    pub repo: PushRepository,
    #[serde(default)]
    pub commits: Vec<Commit>,
    pub head_commit: Option<Commit>,
    pub pusher: Option<User>,
    pub sender: Option<User>,
}

impl PushEvent {
    pub fn repository_name(&self) -> &str {
        &self.repo.full_name
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase"))]
pub struct PushRepository {
    #[serde(rename(serialize = "ID"))]
    pub id: Option<u64>,
    pub name: Option<String>,
    pub full_name: String,
    pub owner: Option<User>,
    pub description: Option<String>,
    pub private: Option<bool>,
    pub fork: Option<bool>,
    pub default_branch: Option<String>,
    pub master_branch: Option<String>,
    #[serde(rename(serialize = "URL"))]
    pub url: Option<String>,
    #[serde(rename(serialize = "HTMLURL"))]
    pub html_url: Option<String>,
    #[serde(rename(serialize = "CloneURL"))]
    pub clone_url: Option<String>,
    #[serde(rename(serialize = "GitURL"))]
    pub git_url: Option<String>,
    #[serde(rename(serialize = "SSHURL"))]
    pub ssh_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase"))]
pub struct Commit {
    #[serde(rename(serialize = "ID"))]
    pub id: Option<String>,
    #[serde(rename(serialize = "TreeID"))]
    pub tree_id: Option<String>,
    pub distinct: Option<bool>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
    #[serde(rename(serialize = "URL"))]
    pub url: Option<String>,
    pub author: Option<CommitAuthor>,
    pub committer: Option<CommitAuthor>,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase"))]
pub struct CommitAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename(deserialize = "username", serialize = "Login"))]
    pub username: Option<String>,
}

/// Pusher, sender or repository owner.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase"))]
pub struct User {
    #[serde(rename(serialize = "ID"))]
    pub id: Option<u64>,
    pub login: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename(serialize = "HTMLURL"))]
    pub html_url: Option<String>,
}

/// Returns the bytes holding the event JSON.
///
/// Form-encoded deliveries carry the JSON in the `payload` field; anything else
/// is taken to be the JSON itself.
pub fn extract_payload<'a>(content_type: &str, body: &'a [u8]) -> Result<Cow<'a, [u8]>> {
    if !is_form_content_type(content_type) {
        return Ok(Cow::Borrowed(body));
    }

    validate_form(body)?;
    let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| DispatchError::MalformedForm(e.to_string()))?;

    // A missing payload field decodes as empty JSON and is rejected there.
    let payload = fields
        .into_iter()
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value)
        .unwrap_or_default();
    Ok(Cow::Owned(payload.into_bytes()))
}

/// Decodes a push event, requiring at least `repository.full_name`.
pub fn parse_push_event(payload: &[u8]) -> Result<PushEvent> {
    Ok(serde_json::from_slice(payload)?)
}

fn is_form_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|media| media.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Applies Go's `url.ParseQuery` rules, which `serde_urlencoded` does not
/// enforce: a `%` must start a two-digit hex escape and `;` is not a separator.
fn validate_form(body: &[u8]) -> Result<()> {
    if body.contains(&b';') {
        return Err(DispatchError::MalformedForm(
            "invalid semicolon separator".to_string(),
        ));
    }

    let mut i = 0;
    while let Some(pos) = body[i..].iter().position(|&b| b == b'%') {
        let at = i + pos;
        match body.get(at + 1..at + 3) {
            Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i = at + 3,
            _ => {
                return Err(DispatchError::MalformedForm(format!(
                    "invalid URL escape at byte {}",
                    at
                )));
            }
        }
    }
    Ok(())
}
