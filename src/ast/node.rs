//! # AST programs as submitted over the wire.
//!
//! Programs arrive as JSON maps of the shape
//! `{"kind": ..., "args": {...}, "body": [...]}`. [`Ast::decode`] turns the
//! map into a typed tree; [`Heap::slice`](crate::ast::Heap::slice) then
//! flattens the tree into the interpreter's executable representation.
//!
//! An RPC carrying an emergency lock or unlock has the shape
//! `rpc_request` wrapping a single `emergency_lock` / `emergency_unlock`
//! node; [`Ast::hyper_signal`] recognizes it so the supervisor can take the
//! hyper path without creating a process.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ast::InstructionKind;
use crate::error::VmError;
use crate::interp::HyperSignal;

/// One node of a decoded program.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ast {
    /// Operation tag.
    pub kind: InstructionKind,
    /// Key → value argument mapping.
    #[serde(default)]
    pub args: Map<String, Value>,
    /// Child nodes, executed per the interpreter's semantics for `kind`.
    #[serde(default)]
    pub body: Vec<Ast>,
}

impl Ast {
    /// Creates a node with no args and no body.
    pub fn new(kind: InstructionKind) -> Self {
        Self {
            kind,
            args: Map::new(),
            body: Vec::new(),
        }
    }

    /// Attaches an argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Attaches child nodes.
    pub fn with_body(mut self, body: Vec<Ast>) -> Self {
        self.body = body;
        self
    }

    /// Decodes a JSON map into an AST.
    pub fn decode(value: Value) -> Result<Ast, VmError> {
        serde_json::from_value(value).map_err(|e| VmError::BadProgram {
            reason: e.to_string(),
        })
    }

    /// Returns the `label` argument, if present as a string.
    pub fn label(&self) -> Option<&str> {
        self.args.get("label").and_then(Value::as_str)
    }

    /// Recognizes an RPC wrapping a single emergency lock/unlock.
    ///
    /// Such programs bypass scheduling entirely; the supervisor services
    /// them on the hyper path.
    pub fn hyper_signal(&self) -> Option<HyperSignal> {
        if self.kind != InstructionKind::RpcRequest || self.body.len() != 1 {
            return None;
        }
        match self.body[0].kind {
            InstructionKind::EmergencyLock => Some(HyperSignal::EmergencyLock),
            InstructionKind::EmergencyUnlock => Some(HyperSignal::EmergencyUnlock),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_wire_shape() {
        let ast = Ast::decode(json!({
            "kind": "rpc_request",
            "args": {"label": "abc-123"},
            "body": [
                {"kind": "move_absolute", "args": {"x": 1, "y": 2, "z": 3}}
            ]
        }))
        .unwrap();

        assert_eq!(ast.kind, InstructionKind::RpcRequest);
        assert_eq!(ast.label(), Some("abc-123"));
        assert_eq!(ast.body.len(), 1);
        assert_eq!(ast.body[0].kind, InstructionKind::MoveAbsolute);
        assert!(ast.body[0].body.is_empty());
    }

    #[test]
    fn missing_args_and_body_default_to_empty() {
        let ast = Ast::decode(json!({"kind": "sync"})).unwrap();
        assert_eq!(ast.kind, InstructionKind::Sync);
        assert!(ast.args.is_empty());
        assert!(ast.body.is_empty());
        assert_eq!(ast.label(), None);
    }

    #[test]
    fn rejects_non_conforming_maps() {
        assert!(matches!(
            Ast::decode(json!({"args": {}})),
            Err(VmError::BadProgram { .. })
        ));
        assert!(matches!(
            Ast::decode(json!("not a map")),
            Err(VmError::BadProgram { .. })
        ));
    }

    #[test]
    fn recognizes_emergency_rpcs() {
        let lock = Ast::new(InstructionKind::RpcRequest)
            .with_arg("label", "estop")
            .with_body(vec![Ast::new(InstructionKind::EmergencyLock)]);
        assert_eq!(lock.hyper_signal(), Some(HyperSignal::EmergencyLock));

        let unlock = Ast::new(InstructionKind::RpcRequest)
            .with_body(vec![Ast::new(InstructionKind::EmergencyUnlock)]);
        assert_eq!(unlock.hyper_signal(), Some(HyperSignal::EmergencyUnlock));
    }

    #[test]
    fn ordinary_programs_are_not_hyper() {
        // Wrong wrapper kind.
        let seq = Ast::new(InstructionKind::Sequence)
            .with_body(vec![Ast::new(InstructionKind::EmergencyLock)]);
        assert_eq!(seq.hyper_signal(), None);

        // More than one body node.
        let double = Ast::new(InstructionKind::RpcRequest).with_body(vec![
            Ast::new(InstructionKind::EmergencyLock),
            Ast::new(InstructionKind::Sync),
        ]);
        assert_eq!(double.hyper_signal(), None);

        // RPC wrapping something else.
        let rpc = Ast::new(InstructionKind::RpcRequest)
            .with_body(vec![Ast::new(InstructionKind::MoveAbsolute)]);
        assert_eq!(rpc.hyper_signal(), None);
    }
}
