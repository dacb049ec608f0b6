//! Type-directed lookup of view templates.

use std::fmt;

use metrics::{counter, histogram};
use tracing::{debug, trace};

use crate::{
    domain::types::{Model, TypeDescriptor},
    infra::{
        http::dispatch::{DispatchHandle, ServerContext},
        telemetry::{VIEW_CANDIDATES_PROBED, VIEW_MISSING_TOTAL, VIEW_RESOLVED_TOTAL},
    },
};

/// Outcome of a successful lookup: the type level that matched and its page.
#[derive(Debug)]
pub struct ResolvedView<'s> {
    pub descriptor: &'static TypeDescriptor,
    pub handle: DispatchHandle<'s>,
}

/// Finds the template for `(model type, view name)` by walking the type chain.
///
/// Candidates for one type level are probed prefix by prefix, and for each prefix
/// suffix by suffix. The first candidate that both exists and can be dispatched to wins.
/// A candidate that exists but has no page is skipped. Lookup never caches.
#[derive(Clone, Copy)]
pub struct ViewResolver<'s, 'c> {
    server: &'s dyn ServerContext,
    prefixes: &'c [String],
    suffixes: &'c [String],
}

impl fmt::Debug for ViewResolver<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewResolver")
            .field("prefixes", &self.prefixes)
            .field("suffixes", &self.suffixes)
            .finish_non_exhaustive()
    }
}

impl<'s, 'c> ViewResolver<'s, 'c> {
    pub fn new(
        server: &'s dyn ServerContext,
        prefixes: &'c [String],
        suffixes: &'c [String],
    ) -> Self {
        Self {
            server,
            prefixes,
            suffixes,
        }
    }

    /// Candidate paths for one type level, in probe order.
    pub fn candidates(&self, descriptor: &TypeDescriptor, view: &str) -> Vec<String> {
        let type_path = descriptor.path_segment();
        candidate_paths(self.prefixes, self.suffixes, &type_path, view)
    }

    /// Probe a single type level without ascending.
    pub fn resolve_at(
        &self,
        descriptor: &TypeDescriptor,
        view: &str,
    ) -> Option<DispatchHandle<'s>> {
        self.probe(descriptor, view, &mut 0)
    }

    /// Walk from the model's runtime type up through its ancestors.
    pub fn resolve(&self, model: &dyn Model, view: &str) -> Option<ResolvedView<'s>> {
        self.resolve_from(model, view, model.descriptor())
    }

    /// Walk from `start` up through its ancestors, on behalf of `model`.
    pub fn resolve_from(
        &self,
        model: &dyn Model,
        view: &str,
        start: &'static TypeDescriptor,
    ) -> Option<ResolvedView<'s>> {
        let mut probed = 0_usize;
        let found = start.ancestors().find_map(|descriptor| {
            self.probe(descriptor, view, &mut probed)
                .map(|handle| ResolvedView { descriptor, handle })
        });
        histogram!(VIEW_CANDIDATES_PROBED).record(probed as f64);

        match &found {
            Some(resolved) => {
                counter!(VIEW_RESOLVED_TOTAL).increment(1);
                debug!(
                    model_type = model.type_name(),
                    view,
                    matched_type = resolved.descriptor.name(),
                    path = resolved.handle.path(),
                    probed,
                    "view resolved"
                );
            }
            None => {
                counter!(VIEW_MISSING_TOTAL).increment(1);
                let model_type = model.type_name();
                debug!(model_type, view, probed, "no view template");
            }
        }
        found
    }

    fn probe(
        &self,
        descriptor: &TypeDescriptor,
        view: &str,
        probed: &mut usize,
    ) -> Option<DispatchHandle<'s>> {
        for candidate in self.candidates(descriptor, view) {
            *probed += 1;
            if !self.server.resource_exists(&candidate) {
                trace!(path = %candidate, "candidate missing");
                continue;
            }
            match DispatchHandle::lookup(self.server, &candidate) {
                Some(handle) => return Some(handle),
                None => trace!(path = %candidate, "candidate exists but is not dispatchable"),
            }
        }
        None
    }
}

/// Every candidate for one type path, prefix-major.
pub fn candidate_paths(
    prefixes: &[String],
    suffixes: &[String],
    type_path: &str,
    view: &str,
) -> Vec<String> {
    prefixes
        .iter()
        .flat_map(|prefix| {
            suffixes
                .iter()
                .map(move |suffix| candidate_path(prefix, type_path, view, suffix))
        })
        .collect()
}

/// `/<prefix>/<type path>.<view><suffix>`, with no prefix segment when `prefix` is empty.
pub fn candidate_path(prefix: &str, type_path: &str, view: &str, suffix: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let path = format!("{type_path}.{view}{suffix}");
    if prefix.is_empty() {
        format!("/{path}")
    } else {
        format!("/{prefix}/{path}")
    }
}
