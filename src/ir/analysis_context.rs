// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Bundles everything a solver needs about the program it is analyzing:
//! its IR, a heap model, the chosen configuration. Each solver borrows
//! one of these for its whole run rather than threading the same three
//! arguments through every method.

use crate::ir::heap::HeapModel;
use crate::ir::method::{MethodId, Program};
use crate::util::options::AnalysisOptions;

pub struct AnalysisContext<H: HeapModel> {
    pub program: Program,
    pub heap_model: H,
    pub options: AnalysisOptions,
}

impl<H: HeapModel> AnalysisContext<H> {
    pub fn new(program: Program, heap_model: H, options: AnalysisOptions) -> Self {
        AnalysisContext { program, heap_model, options }
    }

    pub fn entry_method(&self) -> MethodId {
        self.program.entry_method
    }
}
