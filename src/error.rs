// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Precondition-violation errors.
//!
//! Semantic approximations (unresolved dispatch, division by zero,
//! unrecognized statement kinds) are never represented here: the solvers
//! absorb them in place and keep going. Only the handful of preconditions
//! that a caller can actually get wrong before an analysis starts are
//! modeled as errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::ir::method::MethodId;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("no method registered with id {0:?}")]
    UnknownMethod(MethodId),

    #[error("method {0:?} has no materialized IR (abstract or external)")]
    MissingIr(MethodId),

    #[error("unknown points-to result id {0:?} requested by the inter-procedural pass")]
    UnknownPointerAnalysisResult(String),

    #[error("failed to read taint configuration at {path:?}: {source}")]
    TaintConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed taint configuration at {path:?}: {source}")]
    TaintConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
