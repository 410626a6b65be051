// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis configuration. Deserialized with `serde` rather
//! than parsed from the command line: driving the core from a config
//! value (or a hand-built struct in tests) is the boundary this crate
//! actually owns, a CLI front end is out of scope.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PtaType {
    ContextInsensitive,
    KCallSiteSensitive,
    KObjectSensitive,
    Hybrid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalysisOptions {
    #[serde(default = "default_pta_type")]
    pub pta_type: PtaType,
    /// k for call-site or hybrid call-site sensitivity.
    #[serde(default = "default_depth")]
    pub context_depth: usize,
    /// k for object or hybrid heap-context sensitivity.
    #[serde(default = "default_depth")]
    pub heap_context_depth: usize,
    #[serde(default)]
    pub taint_config: Option<PathBuf>,
}

fn default_pta_type() -> PtaType {
    PtaType::ContextInsensitive
}

fn default_depth() -> usize {
    1
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            pta_type: default_pta_type(),
            context_depth: default_depth(),
            heap_context_depth: default_depth(),
            taint_config: None,
        }
    }
}

impl AnalysisOptions {
    pub fn load_taint_config(&self) -> Result<Option<crate::taint::TaintConfig>> {
        let Some(path) = &self.taint_config else {
            return Ok(None);
        };
        Ok(Some(read_taint_config(path)?))
    }
}

fn read_taint_config(path: &Path) -> Result<crate::taint::TaintConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|source| AnalysisError::TaintConfigIo { path: path.to_path_buf(), source })?;
    serde_json::from_str(&contents)
        .map_err(|source| AnalysisError::TaintConfigParse { path: path.to_path_buf(), source })
}
