// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! # Tracing configuration setup.
//!
//! The weaver is instrumented with Rust's `tracing` framework. Embedders that do not install their
//! own subscriber may call [`init`], which installs a global subscriber filtered by the
//! `ASPECT_LOG` environment variable (same conventions as `RUST_LOG`), e.g.
//!
//! ```shell
//! ASPECT_LOG=aspect_weaver=debug
//! ```

use thiserror::Error;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, prelude::*};

use crate::env_const::ASPECT_LOG;

/// Initialize the tracing subscriber with a compact console layer.
pub fn init() -> Result<(), TracingInitError> {
    let fmt_layer = tracing_subscriber::fmt::layer().compact();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(ASPECT_LOG)
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[derive(Error, Debug)]
pub enum TracingInitError {
    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}
