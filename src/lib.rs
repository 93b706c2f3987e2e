// Copyright 2026 Matchup Contributors
// SPDX-License-Identifier: Apache-2.0

//! Matchup library — side-by-side feature comparison of competitor websites.
//!
//! Walks a fixed set of page paths on two sites, detects the presence of
//! common UI features through structural DOM probes, and reconciles the two
//! per-site feature maps into one comparison matrix.

pub mod analyzer;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod export;
pub mod job;
pub mod matrix;
pub mod renderer;
pub mod rest;
pub mod types;
pub mod walker;
