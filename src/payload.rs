// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request payload for `POST /pullRequest/create`.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Prefix of every generated pull request id.
pub const ID_PREFIX: &str = "PR-";

/// Length of the random alphanumeric id suffix.
pub const ID_SUFFIX_LEN: usize = 5;

/// Body of a create request. Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePullRequest {
    pub pull_request_id: String,
    pub author_id: String,
    pub pull_request_name: String,
}

impl CreatePullRequest {
    /// Build a payload with a freshly generated id.
    pub fn generate(author_id: &str, pull_request_name: &str) -> Self {
        Self {
            pull_request_id: generate_pull_request_id(),
            author_id: author_id.to_string(),
            pull_request_name: pull_request_name.to_string(),
        }
    }
}

/// Generate `PR-<epoch ms>-<5 alphanumeric>`.
///
/// Uniqueness comes from the timestamp plus random suffix; not suitable
/// where unpredictability matters.
pub fn generate_pull_request_id() -> String {
    pull_request_id_at(Utc::now().timestamp_millis(), &mut rand::thread_rng())
}

/// Build an id from an explicit timestamp and random source.
pub fn pull_request_id_at<R: Rng + ?Sized>(epoch_millis: i64, rng: &mut R) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    format!("{ID_PREFIX}{epoch_millis}-{suffix}")
}

/// Check that a string has the shape `PR-<digits>-<5 alphanumeric>`.
pub fn is_valid_pull_request_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix(ID_PREFIX) else {
        return false;
    };
    let Some((millis, suffix)) = rest.split_once('-') else {
        return false;
    };
    !millis.is_empty()
        && millis.bytes().all(|b| b.is_ascii_digit())
        && suffix.len() == ID_SUFFIX_LEN
        && suffix.bytes().all(|b| b.is_ascii_alphanumeric())
}
