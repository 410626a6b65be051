// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context-selection policy: how a caller's context and
//! a call site combine into the callee's context, and how an
//! allocation's context is derived. Kept as a trait so the solver never
//! hardcodes k-call-site vs. k-object vs. hybrid sensitivity.

use crate::ir::context::{ContextCache, ContextId, CtxElem};
use crate::ir::heap::ObjId;
use crate::ir::method::{MethodId, StmtLoc};

/// The receiver object a virtual call resolved against, together with
/// the context it itself carries. `None` for static/special calls, which
/// have no receiver to key object sensitivity on.
pub type ReceiverObj = Option<(ContextId, ObjId)>;

/// Selects the callee context at a call site and the allocation context
/// at a `new` statement.
pub trait ContextSelector {
    /// The context a call from `caller_ctx` at `call_site` into `callee`
    /// should run under. `receiver` carries the dispatched-on object and
    /// its context for virtual calls, so an object-sensitive selector can
    /// key off it.
    fn select_context(
        &self,
        cache: &mut ContextCache,
        caller_ctx: ContextId,
        call_site: StmtLoc,
        callee: MethodId,
        receiver: ReceiverObj,
    ) -> ContextId;

    /// The context an allocation site should tag its fresh object with,
    /// given the allocating method's own context.
    fn select_heap_context(&self, cache: &mut ContextCache, alloc_ctx: ContextId, alloc_site: StmtLoc) -> ContextId;
}

/// k-call-site-sensitive: a context is the last `k` call sites on the
/// path to the current method.
pub struct KCallSiteSensitive {
    pub k: usize,
}

impl ContextSelector for KCallSiteSensitive {
    fn select_context(
        &self,
        cache: &mut ContextCache,
        caller_ctx: ContextId,
        call_site: StmtLoc,
        _callee: MethodId,
        _receiver: ReceiverObj,
    ) -> ContextId {
        cache.extend(caller_ctx, CtxElem::CallSite(call_site), self.k)
    }

    fn select_heap_context(&self, _cache: &mut ContextCache, alloc_ctx: ContextId, _alloc_site: StmtLoc) -> ContextId {
        alloc_ctx
    }
}

/// k-object-sensitive: a virtual call's context is the last `k` receiver
/// objects on the path; static/special calls inherit the caller's
/// context unchanged, since they have no receiver to refine on.
pub struct KObjectSensitive {
    pub k: usize,
}

impl ContextSelector for KObjectSensitive {
    fn select_context(
        &self,
        cache: &mut ContextCache,
        caller_ctx: ContextId,
        _call_site: StmtLoc,
        _callee: MethodId,
        receiver: ReceiverObj,
    ) -> ContextId {
        match receiver {
            Some((obj_ctx, obj)) => cache.extend(obj_ctx, CtxElem::Object(obj), self.k),
            None => caller_ctx,
        }
    }

    fn select_heap_context(&self, _cache: &mut ContextCache, alloc_ctx: ContextId, _alloc_site: StmtLoc) -> ContextId {
        alloc_ctx
    }
}

/// Mixes call-site and object sensitivity in one context, each
/// independently k-limited by its own depth (the
/// `context-depth`/`heap-context-depth` split).
pub struct HybridSelector {
    pub call_site_k: usize,
    pub object_k: usize,
}

impl ContextSelector for HybridSelector {
    fn select_context(
        &self,
        cache: &mut ContextCache,
        caller_ctx: ContextId,
        call_site: StmtLoc,
        _callee: MethodId,
        receiver: ReceiverObj,
    ) -> ContextId {
        let with_call_site = cache.extend(caller_ctx, CtxElem::CallSite(call_site), self.call_site_k);
        match receiver {
            Some((_, obj)) => cache.extend(with_call_site, CtxElem::Object(obj), self.object_k),
            None => with_call_site,
        }
    }

    fn select_heap_context(&self, _cache: &mut ContextCache, alloc_ctx: ContextId, _alloc_site: StmtLoc) -> ContextId {
        alloc_ctx
    }
}
