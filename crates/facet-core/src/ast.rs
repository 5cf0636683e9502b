use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Index of a node inside its owning [`SyntaxTree`] arena.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Binding strength for the serializer; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 4,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 5,
            BinaryOp::Add | BinaryOp::Sub => 6,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

/// One `name` or `name = init` entry of a `var` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declarator {
    pub name: String,
    pub init: Option<NodeId>,
}

/// Node payload. Child links are arena indices into the owning tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Script {
        body: Vec<NodeId>,
    },
    Function {
        name: Option<String>,
        params: Vec<String>,
        body: Vec<NodeId>,
        /// Function declaration statement vs. function expression.
        declaration: bool,
    },
    Block {
        body: Vec<NodeId>,
    },
    VarDecl {
        declarators: Vec<Declarator>,
    },
    If {
        condition: NodeId,
        consequent: NodeId,
        alternate: Option<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    ExprStmt {
        expression: NodeId,
    },
    Empty,
    Assign {
        target: NodeId,
        value: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Call {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    Member {
        object: NodeId,
        property: String,
    },
    Ident {
        name: String,
    },
    This,
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
}

/// Reference statistics attached to a parsed tree.
///
/// `shared` holds exact symbol references, `packages` holds dotted
/// namespace references. The `loadtime_*` sets are the subset of each
/// that is referenced outside any function body; those become break
/// dependencies (must load strictly before the referencing class).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefStats {
    pub shared: IndexSet<String>,
    pub packages: IndexSet<String>,
    pub loadtime_shared: IndexSet<String>,
    pub loadtime_packages: IndexSet<String>,
}

/// Syntax tree over the compiled JavaScript subset.
///
/// Nodes live in a flat arena indexed by [`NodeId`]; `Clone` produces a
/// fully independent deep copy, which is what keeps the cached base
/// tree immutable while permutation specialization mutates its copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxTree {
    nodes: Vec<NodeKind>,
    root: NodeId,
    stats: RefStats,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: 0,
            stats: RefStats::default(),
        }
    }

    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(kind);
        self.nodes.len() - 1
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id]
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id]
    }

    /// Replaces a node's payload in place, keeping its identity.
    pub fn replace(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id] = kind;
    }

    pub fn stats(&self) -> &RefStats {
        &self.stats
    }

    pub fn set_stats(&mut self, stats: RefStats) {
        self.stats = stats;
    }

    /// Top-level statement list of the script root.
    pub fn script_body(&self) -> &[NodeId] {
        match self.kind(self.root) {
            NodeKind::Script { body } => body,
            _ => &[],
        }
    }
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a numeric literal the way the serializer and variant values
/// need it: whole values without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
