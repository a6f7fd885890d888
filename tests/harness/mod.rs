// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for load runs.
//!
//! Provides an in-process stand-in for the pull request service that
//! records every request it sees and answers with scripted statuses.

pub mod target;
