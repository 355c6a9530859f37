//! Static recursion detection.
//!
//! Builds the call graph of the defined functions and repeatedly removes
//! functions that call nothing or are called by nothing. Whatever remains
//! is part of, or only reachable through, a cycle.

use alloc::{string::String, vec::Vec};

use hashbrown::HashSet;
use lpc_glir::{walk_body, CallCollector, ShaderIr, SignatureRef};

use crate::{diagnostics::Diagnostics, error::LinkError};

fn prototype_string(ir: &ShaderIr, sig: SignatureRef) -> String {
    let signature = ir.signature(sig);
    let params: Vec<String> = ir
        .param_types(signature)
        .iter()
        .map(|ty| ty.name())
        .collect();
    alloc::format!(
        "{} {}({})",
        signature.return_type,
        ir.funcs[sig.0].name,
        params.join(", ")
    )
}

/// Report every function of `ir` involved in static recursion.
///
/// Returns `true` when there is none.
pub fn detect_recursion_linked(ir: &ShaderIr, diag: &mut Diagnostics) -> bool {
    let mut nodes: Vec<SignatureRef> = Vec::new();
    for func in ir.functions() {
        for (index, sig) in ir.funcs[func].signatures.iter().enumerate() {
            if sig.is_defined {
                nodes.push((func, index));
            }
        }
    }

    let mut edges: Vec<(SignatureRef, SignatureRef)> = Vec::new();
    for &node in &nodes {
        let mut calls = CallCollector { calls: Vec::new() };
        walk_body(ir, &ir.signature(node).body, &mut calls);
        for (name, args) in calls.calls {
            if let Some(callee) = ir.find_defined_signature(&name, &args) {
                edges.push((node, callee));
            }
        }
    }

    let mut alive: HashSet<SignatureRef> = nodes.iter().copied().collect();
    loop {
        let removable: Vec<SignatureRef> = alive
            .iter()
            .copied()
            .filter(|n| {
                let calls = edges.iter().any(|(a, b)| a == n && alive.contains(b));
                let called = edges.iter().any(|(a, b)| b == n && alive.contains(a));
                !calls || !called
            })
            .collect();
        if removable.is_empty() {
            break;
        }
        for n in removable {
            alive.remove(&n);
        }
    }

    for node in nodes.iter().filter(|n| alive.contains(*n)) {
        diag.error(LinkError::StaticRecursion {
            prototype: prototype_string(ir, *node),
        });
    }
    alive.is_empty()
}
