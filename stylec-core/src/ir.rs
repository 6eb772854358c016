//! Intermediate representation reconstructed from the stack language.
//!
//! The IR is a closed set of sum types so the optimizer and the code
//! generator can pattern-match exhaustively. Expression operands are
//! `Rc`-shared: `duplicate$` pushes a second reference to the same
//! node, never a deep clone, and the code generator re-renders a
//! shared node in full at every use site.

use std::rc::Rc;

use crate::lexer::Token;
use crate::parser::OptionDefault;
use crate::registry::Builtin;

/// Static type of a value slot in the style language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Int,
    Str,
    /// The demanding signature placed no constraint on the slot.
    Unknown,
}

/// Inferred return type of a synthesized function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Int,
    Str,
}

/// Where a named variable lives, which fixes its access pattern in
/// the generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    /// Global integer: a plain field of the generated class.
    GlobalInt,
    /// Global string: a plain field of the generated class.
    GlobalStr,
    /// Entry field: read through the expanded-field accessor. Read-only.
    Field,
    /// Entry-local integer: get/set through the entry.
    EntryInt,
    /// Entry-local string: get/set through the entry.
    EntryStr,
}

impl VarScope {
    pub fn var_type(self) -> VarType {
        match self {
            VarScope::GlobalInt | VarScope::EntryInt => VarType::Int,
            VarScope::GlobalStr | VarScope::EntryStr | VarScope::Field => VarType::Str,
        }
    }

    pub fn uses_entry(self) -> bool {
        matches!(self, VarScope::Field | VarScope::EntryInt | VarScope::EntryStr)
    }
}

/// An expression node. Expressions are pure; every observable effect
/// lives in a [`Stmt`].
#[derive(Debug)]
pub enum Expr {
    IntLit(i32),
    StrLit(String),
    /// Formal parameter synthesized on virtual-stack underflow.
    Param { index: usize, ty: VarType },
    Var { name: String, scope: VarScope },
    /// Built-in call with a pushed result.
    Call {
        builtin: &'static Builtin,
        args: Vec<Rc<Expr>>,
    },
    /// Call of a synthesized user function with a pushed result.
    CallUser {
        name: String,
        args: Vec<Rc<Expr>>,
        ret: ReturnType,
        uses_entry: bool,
    },
    /// EXPRESSION-shaped conditional.
    Ternary {
        cond: Rc<Expr>,
        then_value: Rc<Expr>,
        else_value: Rc<Expr>,
    },
    /// Negated condition, introduced by branch canonicalization.
    Not(Rc<Expr>),
    /// Quote-literal: an unevaluated name. Consumed by assignment and
    /// by conditional/loop block operands, never rendered directly.
    Name(String),
    /// Uninterpreted block operand awaiting a control construct.
    CodeBlock(Vec<Token>),
}

impl Expr {
    /// Static type of the expression, per the registry's rules.
    pub fn var_type(&self) -> VarType {
        match self {
            Expr::IntLit(_) => VarType::Int,
            Expr::StrLit(_) => VarType::Str,
            Expr::Param { ty, .. } => *ty,
            Expr::Var { scope, .. } => scope.var_type(),
            Expr::Call { builtin, .. } => builtin.output,
            Expr::CallUser { ret, .. } => match ret {
                ReturnType::Int => VarType::Int,
                ReturnType::Str => VarType::Str,
                ReturnType::Void => VarType::Unknown,
            },
            Expr::Ternary {
                then_value,
                else_value,
                ..
            } => match then_value.var_type() {
                VarType::Unknown => else_value.var_type(),
                ty => ty,
            },
            Expr::Not(_) => VarType::Int,
            Expr::Name(_) | Expr::CodeBlock(_) => VarType::Unknown,
        }
    }
}

/// Assignment target resolved from a quote-literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignTarget {
    pub name: String,
    pub scope: VarScope,
}

/// A statement node.
#[derive(Debug)]
pub enum Stmt {
    /// Built-in call with no pushed result (writer/diagnostic calls).
    VoidCall {
        builtin: &'static Builtin,
        args: Vec<Rc<Expr>>,
    },
    /// Call of a void user function.
    VoidCallUser {
        name: String,
        args: Vec<Rc<Expr>>,
        uses_entry: bool,
    },
    Assign {
        target: AssignTarget,
        value: Rc<Expr>,
    },
    /// STATEMENT-shaped conditional.
    If {
        cond: Rc<Expr>,
        then_arm: Vec<Stmt>,
        else_arm: Vec<Stmt>,
    },
    /// Pre-test loop; the guard is conceptually re-evaluated every
    /// iteration.
    While { cond: Rc<Expr>, body: Vec<Stmt> },
    /// A value popped without use. Elided by the optimizer.
    Discard(Rc<Expr>),
    Return(Rc<Expr>),
}

/// Formal parameter of a synthesized function, in demand order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamIr {
    /// 1-based, contiguous, assigned strictly in demand order.
    pub index: usize,
    pub ty: VarType,
}

/// One synthesized function.
#[derive(Debug)]
pub struct FunctionIr {
    /// Original style-language name.
    pub name: String,
    pub params: Vec<ParamIr>,
    /// When set, the method takes an implicit leading entry parameter.
    pub uses_entry: bool,
    pub body: Vec<Stmt>,
    pub ret: ReturnType,
}

impl FunctionIr {
    /// Whether the function can serve as an entry-type handler in the
    /// per-type dispatch.
    pub fn is_entry_handler(&self) -> bool {
        self.ret == ReturnType::Void && self.params.is_empty() && self.uses_entry
    }
}

/// One step of the generated `run()` method, in command order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStep {
    Execute(String),
    Read,
    Sort,
    Iterate(String),
    Reverse(String),
}

/// Everything the code generator needs, produced once per run.
#[derive(Debug)]
pub struct CompilationUnit {
    pub class_name: String,
    /// Global integer variables, declaration order.
    pub int_globals: Vec<String>,
    /// Global string variables, declaration order.
    pub str_globals: Vec<String>,
    /// Functions in memoization (first-reference) order.
    pub functions: Vec<FunctionIr>,
    /// Option defaults for the constructor's initializer block.
    pub options: Vec<(String, OptionDefault)>,
    pub run: Vec<RunStep>,
}
