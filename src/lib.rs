// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! retitle: rename files after what they contain
//!
//! Each supported file in a directory is reduced to a short excerpt (or an
//! image), Gemini is asked for a descriptive title, and the file is renamed
//! to that title. Runs are strictly sequential.

pub mod config;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod inference;
pub mod orchestrator;
pub mod rename;

pub use config::AppConfig;
pub use error::{Result, RetitleError};
pub use orchestrator::{RenameOrchestrator, RunContext, RunStats};
