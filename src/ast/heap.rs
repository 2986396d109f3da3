//! # Sliced programs: the interpreter's executable representation.
//!
//! [`Heap::slice`] flattens an [`Ast`] tree depth-first into a vector of
//! addressed cells. Address 0 is the program root; each cell records its
//! children's addresses, so the interpreter can walk the program without
//! chasing owned subtrees.
//!
//! The scheduler itself reads only one thing from a heap: the instruction
//! kind at the current program counter, via [`Heap::kind_at`]. Everything
//! else is interpreter territory.

use serde_json::{Map, Value};

use crate::ast::{Ast, InstructionKind};

/// Address of a cell within a [`Heap`].
pub type Address = usize;

/// One flattened program node.
#[derive(Clone, Debug)]
pub struct Cell {
    /// Operation tag.
    pub kind: InstructionKind,
    /// Arguments, copied from the AST node.
    pub args: Map<String, Value>,
    /// Addresses of this node's body entries, in source order.
    pub body: Vec<Address>,
}

/// Flattened, addressed form of a program.
#[derive(Clone, Debug, Default)]
pub struct Heap {
    cells: Vec<Cell>,
}

impl Heap {
    /// Flattens an AST into a heap. The root lands at address 0.
    pub fn slice(ast: &Ast) -> Heap {
        let mut cells = Vec::new();
        slice_node(&mut cells, ast);
        Heap { cells }
    }

    /// Returns the instruction kind at `addr`.
    ///
    /// Out-of-range addresses (including any address of an empty heap)
    /// report [`InstructionKind::Nothing`].
    pub fn kind_at(&self, addr: Address) -> InstructionKind {
        self.cells
            .get(addr)
            .map_or(InstructionKind::Nothing, |c| c.kind)
    }

    /// Returns the cell at `addr`, if in range.
    pub fn cell(&self, addr: Address) -> Option<&Cell> {
        self.cells.get(addr)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the heap holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Pre-order placement: a node's address precedes all of its descendants.
fn slice_node(cells: &mut Vec<Cell>, ast: &Ast) -> Address {
    let addr = cells.len();
    cells.push(Cell {
        kind: ast.kind,
        args: ast.args.clone(),
        body: Vec::new(),
    });
    let body: Vec<Address> = ast.body.iter().map(|child| slice_node(cells, child)).collect();
    cells[addr].body = body;
    addr
}
