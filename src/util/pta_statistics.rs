// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Points-to statistics, logged rather than printed: a caller that wants
//! them on stdout can configure `env_logger` to do so, the analysis core
//! only ever emits them through `log`.

use log::info;

use crate::pta::andersen::AndersenResult;
use crate::pta::context_sensitive::ContextSensitiveResult;
use crate::pta::PointerAnalysisResult;

fn avg_pts_size(num_pointers: usize, num_relations: usize) -> f64 {
    if num_pointers == 0 {
        0.0
    } else {
        num_relations as f64 / num_pointers as f64
    }
}

pub struct AndersenStat<'a> {
    result: &'a AndersenResult,
}

impl<'a> AndersenStat<'a> {
    pub fn new(result: &'a AndersenResult) -> Self {
        AndersenStat { result }
    }

    pub fn dump_stats(&self) {
        info!(
            "context-insensitive call graph: {} reachable methods, {} pfg nodes, {} pfg edges",
            self.result.call_graph().num_reachable(),
            self.result.pfg().num_nodes(),
            self.result.pfg().num_edges(),
        );
        self.dump_pts_stat();
    }

    pub fn dump_pts_stat(&self) {
        let (num_pointers, num_relations) = self.result.pts_stats();
        info!(
            "points-to statistics: {} pointers, {} points-to relations, {:.2} avg points-to size",
            num_pointers,
            num_relations,
            avg_pts_size(num_pointers, num_relations),
        );
    }
}

pub struct ContextSensitiveStat<'a> {
    result: &'a ContextSensitiveResult,
}

impl<'a> ContextSensitiveStat<'a> {
    pub fn new(result: &'a ContextSensitiveResult) -> Self {
        ContextSensitiveStat { result }
    }

    pub fn dump_stats(&self) {
        info!(
            "context-sensitive call graph: {} reachable (context, method) pairs, {} pfg nodes, {} pfg edges",
            self.result.call_graph().num_reachable(),
            self.result.pfg().num_nodes(),
            self.result.pfg().num_edges(),
        );
        self.dump_pts_stat();
    }

    /// Dumps both the context-sensitive points-to sizes and their
    /// context-insensitive collapse, so the precision a context selector
    /// buys (or doesn't) over plain Andersen is visible side by side.
    pub fn dump_pts_stat(&self) {
        let (num_cs_pointers, num_cs_relations) = self.result.pts_stats();
        info!(
            "CS points-to statistics: {} pointers, {} points-to relations, {:.2} avg points-to size",
            num_cs_pointers,
            num_cs_relations,
            avg_pts_size(num_cs_pointers, num_cs_relations),
        );

        let (num_ci_pointers, num_ci_relations) = self.result.ci_pts_stats();
        info!(
            "CI-collapsed points-to statistics: {} pointers, {} points-to relations, {:.2} avg points-to size",
            num_ci_pointers,
            num_ci_relations,
            avg_pts_size(num_ci_pointers, num_ci_relations),
        );
    }
}
