// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: TMSYNC_CLI

pub mod config;
pub mod report;
pub mod retry;

pub use syncscan;
pub use testdoc;
