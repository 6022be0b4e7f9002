// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::env::{EnvError, Environment};

pub const ASPECT_LOG: &str = "ASPECT_LOG";

pub const ASPECT_WEAVER_ENABLED: &str = "ASPECT_WEAVER_ENABLED";
pub const ASPECT_STRICT_ASPECT_IDS: &str = "ASPECT_STRICT_ASPECT_IDS";
pub const ASPECT_PLAN_CACHE: &str = "ASPECT_PLAN_CACHE";

/// Knobs of a weaving context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaverConfig {
    /// When false, woven classes dispatch straight to the original bodies.
    pub enabled: bool,
    /// Reject an aspect whose id is already registered instead of replacing it.
    pub strict_aspect_ids: bool,
    /// Memoize execution plans per target (rebuilt after enable/disable).
    pub plan_cache: bool,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict_aspect_ids: false,
            plan_cache: true,
        }
    }
}

impl WeaverConfig {
    pub fn from_env(env: &dyn Environment) -> Result<Self, EnvError> {
        let defaults = Self::default();

        Ok(Self {
            enabled: env.enabled(ASPECT_WEAVER_ENABLED, defaults.enabled)?,
            strict_aspect_ids: env.enabled(ASPECT_STRICT_ASPECT_IDS, defaults.strict_aspect_ids)?,
            plan_cache: env.enabled(ASPECT_PLAN_CACHE, defaults.plan_cache)?,
        })
    }
}
