//! The immutable built-in registry.
//!
//! One table records, per built-in, its stack signature, static slot
//! types, and code template. The table is the sole source of
//! type-propagation rules: the interpreter never hard-codes a type.
//! It is built once, never mutated, and safe to share across
//! concurrent compilations.
//!
//! Template placeholders `{0}`, `{1}`, ... index operands in demand
//! order (the order they were popped). Delegates pass their operands
//! to the support routine in reverse demand order; that permutation
//! was observed per built-in and is a property of the table, not a
//! uniform rule.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::ir::VarType;

/// Pure helper methods generated at most once per compilation unit,
/// memoized by name, and referenced thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    AddPeriod,
    ChrToInt,
    IntToChr,
    IsEmpty,
}

impl Helper {
    pub fn method(self) -> &'static str {
        match self {
            Helper::AddPeriod => "addPeriod",
            Helper::ChrToInt => "chrToInt",
            Helper::IntToChr => "intToChr",
            Helper::IsEmpty => "isEmpty",
        }
    }
}

/// Built-ins with bespoke handling in the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    /// `if$`: conditional execution of two block operands.
    If,
    /// `while$`: pre-test loop over two block operands.
    While,
    /// `:=`: assignment to a quoted variable name.
    Assign,
    /// `pop$`: discard the top value.
    Pop,
    /// `swap$`: exchange the two top values.
    Swap,
    /// `duplicate$`: push a second reference to the top value.
    Duplicate,
    /// `skip$`: no operation.
    Skip,
    /// `stack$`: drain the stack into diagnostics.
    Stack,
    /// `call.type$`: dispatch on the current entry's type.
    CallType,
}

/// How a built-in call is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    /// Binary infix template: `({1} op {0})`.
    Infix { op: &'static str },
    /// Boolean template producing a 0/1 integer. Rendered bare in
    /// guard position, wrapped `(... ? 1 : 0)` in value position.
    Bool { template: &'static str },
    /// Free-form inline template.
    Fmt { template: &'static str },
    /// Delegation to an external support routine; operands are passed
    /// in reverse demand order. Requires an import of the class.
    Delegate {
        class: &'static str,
        method: &'static str,
    },
    /// Call of a memoized helper method.
    Helper(Helper),
    /// Handled structurally by the interpreter.
    Special(Special),
}

/// Signature and code template of one built-in.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    /// Operands popped from the virtual stack.
    pub arity_in: usize,
    /// Results pushed (0 or 1; stack shufflers are special-cased).
    pub arity_out: usize,
    /// Per-slot static type, demand order. Unused slots are Unknown.
    pub inputs: [VarType; 3],
    pub output: VarType,
    /// Whether the built-in reads the current entry.
    pub uses_entry: bool,
    pub code: Code,
}

impl Builtin {
    pub fn import(&self) -> Option<String> {
        match self.code {
            Code::Delegate { class, .. } => Some(format!("bib.support.{class}")),
            _ => None,
        }
    }
}

use VarType::{Int, Str, Unknown};

const NONE: [VarType; 3] = [Unknown, Unknown, Unknown];

static BUILTINS: &[Builtin] = &[
    Builtin {
        name: "+",
        arity_in: 2,
        arity_out: 1,
        inputs: [Int, Int, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Infix { op: "+" },
    },
    Builtin {
        name: "-",
        arity_in: 2,
        arity_out: 1,
        inputs: [Int, Int, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Infix { op: "-" },
    },
    // String concatenation.
    Builtin {
        name: "*",
        arity_in: 2,
        arity_out: 1,
        inputs: [Str, Str, Unknown],
        output: Str,
        uses_entry: false,
        code: Code::Infix { op: "+" },
    },
    Builtin {
        name: "<",
        arity_in: 2,
        arity_out: 1,
        inputs: [Int, Int, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Bool { template: "{1} < {0}" },
    },
    Builtin {
        name: ">",
        arity_in: 2,
        arity_out: 1,
        inputs: [Int, Int, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Bool { template: "{1} > {0}" },
    },
    Builtin {
        name: "=",
        arity_in: 2,
        arity_out: 1,
        inputs: [Unknown, Unknown, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Bool {
            template: "{1} == {0}",
        },
    },
    Builtin {
        name: "and",
        arity_in: 2,
        arity_out: 1,
        inputs: [Int, Int, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Bool {
            template: "{1} && {0}",
        },
    },
    Builtin {
        name: "or",
        arity_in: 2,
        arity_out: 1,
        inputs: [Int, Int, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Bool {
            template: "{1} || {0}",
        },
    },
    Builtin {
        name: "not",
        arity_in: 1,
        arity_out: 1,
        inputs: [Int, Unknown, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Bool { template: "!({0})" },
    },
    Builtin {
        name: ":=",
        arity_in: 2,
        arity_out: 0,
        inputs: [Unknown, Unknown, Unknown],
        output: Unknown,
        uses_entry: false,
        code: Code::Special(Special::Assign),
    },
    Builtin {
        name: "add.period$",
        arity_in: 1,
        arity_out: 1,
        inputs: [Str, Unknown, Unknown],
        output: Str,
        uses_entry: false,
        code: Code::Helper(Helper::AddPeriod),
    },
    Builtin {
        name: "call.type$",
        arity_in: 0,
        arity_out: 0,
        inputs: NONE,
        output: Unknown,
        uses_entry: true,
        code: Code::Special(Special::CallType),
    },
    Builtin {
        name: "change.case$",
        arity_in: 2,
        arity_out: 1,
        inputs: [Str, Str, Unknown],
        output: Str,
        uses_entry: false,
        code: Code::Delegate {
            class: "ChangeCase",
            method: "changeCase",
        },
    },
    Builtin {
        name: "chr.to.int$",
        arity_in: 1,
        arity_out: 1,
        inputs: [Str, Unknown, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Helper(Helper::ChrToInt),
    },
    Builtin {
        name: "cite$",
        arity_in: 0,
        arity_out: 1,
        inputs: NONE,
        output: Str,
        uses_entry: true,
        code: Code::Fmt {
            template: "entry.getKey()",
        },
    },
    Builtin {
        name: "duplicate$",
        arity_in: 1,
        arity_out: 2,
        inputs: [Unknown, Unknown, Unknown],
        output: Unknown,
        uses_entry: false,
        code: Code::Special(Special::Duplicate),
    },
    Builtin {
        name: "empty$",
        arity_in: 1,
        arity_out: 1,
        inputs: [Str, Unknown, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Helper(Helper::IsEmpty),
    },
    Builtin {
        name: "format.name$",
        arity_in: 3,
        arity_out: 1,
        inputs: [Str, Int, Str],
        output: Str,
        uses_entry: false,
        code: Code::Delegate {
            class: "FormatName",
            method: "formatName",
        },
    },
    Builtin {
        name: "global.max$",
        arity_in: 0,
        arity_out: 1,
        inputs: NONE,
        output: Int,
        uses_entry: false,
        code: Code::Fmt {
            template: "Integer.MAX_VALUE",
        },
    },
    Builtin {
        name: "entry.max$",
        arity_in: 0,
        arity_out: 1,
        inputs: NONE,
        output: Int,
        uses_entry: false,
        code: Code::Fmt {
            template: "Integer.MAX_VALUE",
        },
    },
    Builtin {
        name: "if$",
        arity_in: 3,
        arity_out: 0,
        inputs: [Unknown, Unknown, Int],
        output: Unknown,
        uses_entry: false,
        code: Code::Special(Special::If),
    },
    Builtin {
        name: "int.to.chr$",
        arity_in: 1,
        arity_out: 1,
        inputs: [Int, Unknown, Unknown],
        output: Str,
        uses_entry: false,
        code: Code::Helper(Helper::IntToChr),
    },
    Builtin {
        name: "int.to.str$",
        arity_in: 1,
        arity_out: 1,
        inputs: [Int, Unknown, Unknown],
        output: Str,
        uses_entry: false,
        code: Code::Fmt {
            template: "String.valueOf({0})",
        },
    },
    Builtin {
        name: "locator.line$",
        arity_in: 0,
        arity_out: 1,
        inputs: NONE,
        output: Int,
        uses_entry: true,
        code: Code::Fmt {
            template: "entry.getLocator().getLineNumber()",
        },
    },
    Builtin {
        name: "locator.resource$",
        arity_in: 0,
        arity_out: 1,
        inputs: NONE,
        output: Str,
        uses_entry: true,
        code: Code::Fmt {
            template: "entry.getLocator().getResource()",
        },
    },
    Builtin {
        name: "missing$",
        arity_in: 1,
        arity_out: 1,
        inputs: [Unknown, Unknown, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Bool {
            template: "{0} == null",
        },
    },
    Builtin {
        name: "newline$",
        arity_in: 0,
        arity_out: 0,
        inputs: NONE,
        output: Unknown,
        uses_entry: false,
        code: Code::Fmt {
            template: "bibWriter.println()",
        },
    },
    Builtin {
        name: "num.names$",
        arity_in: 1,
        arity_out: 1,
        inputs: [Str, Unknown, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Delegate {
            class: "NumNames",
            method: "numNames",
        },
    },
    Builtin {
        name: "pop$",
        arity_in: 1,
        arity_out: 0,
        inputs: [Unknown, Unknown, Unknown],
        output: Unknown,
        uses_entry: false,
        code: Code::Special(Special::Pop),
    },
    Builtin {
        name: "preamble$",
        arity_in: 0,
        arity_out: 1,
        inputs: NONE,
        output: Str,
        uses_entry: false,
        code: Code::Fmt {
            template: "bibDB.getPreamble()",
        },
    },
    Builtin {
        name: "purify$",
        arity_in: 1,
        arity_out: 1,
        inputs: [Str, Unknown, Unknown],
        output: Str,
        uses_entry: false,
        code: Code::Delegate {
            class: "Purify",
            method: "purify",
        },
    },
    Builtin {
        name: "quote$",
        arity_in: 0,
        arity_out: 1,
        inputs: NONE,
        output: Str,
        uses_entry: false,
        code: Code::Fmt { template: "'\"'" },
    },
    Builtin {
        name: "skip$",
        arity_in: 0,
        arity_out: 0,
        inputs: NONE,
        output: Unknown,
        uses_entry: false,
        code: Code::Special(Special::Skip),
    },
    Builtin {
        name: "stack$",
        arity_in: 0,
        arity_out: 0,
        inputs: NONE,
        output: Unknown,
        uses_entry: false,
        code: Code::Special(Special::Stack),
    },
    Builtin {
        name: "substring$",
        arity_in: 3,
        arity_out: 1,
        inputs: [Int, Int, Str],
        output: Str,
        uses_entry: false,
        code: Code::Delegate {
            class: "SubString",
            method: "substring",
        },
    },
    Builtin {
        name: "swap$",
        arity_in: 2,
        arity_out: 2,
        inputs: [Unknown, Unknown, Unknown],
        output: Unknown,
        uses_entry: false,
        code: Code::Special(Special::Swap),
    },
    Builtin {
        name: "text.length$",
        arity_in: 1,
        arity_out: 1,
        inputs: [Str, Unknown, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Delegate {
            class: "TextLength",
            method: "textLength",
        },
    },
    Builtin {
        name: "text.prefix$",
        arity_in: 2,
        arity_out: 1,
        inputs: [Int, Str, Unknown],
        output: Str,
        uses_entry: false,
        code: Code::Delegate {
            class: "TextPrefix",
            method: "textPrefix",
        },
    },
    Builtin {
        name: "top$",
        arity_in: 1,
        arity_out: 0,
        inputs: [Unknown, Unknown, Unknown],
        output: Unknown,
        uses_entry: false,
        code: Code::Fmt {
            template: "bibProcessor.warning(String.valueOf({0}))",
        },
    },
    Builtin {
        name: "type$",
        arity_in: 0,
        arity_out: 1,
        inputs: NONE,
        output: Str,
        uses_entry: true,
        code: Code::Fmt {
            template: "entry.getType()",
        },
    },
    Builtin {
        name: "warning$",
        arity_in: 1,
        arity_out: 0,
        inputs: [Str, Unknown, Unknown],
        output: Unknown,
        uses_entry: false,
        code: Code::Fmt {
            template: "bibProcessor.warning({0})",
        },
    },
    Builtin {
        name: "while$",
        arity_in: 2,
        arity_out: 0,
        inputs: [Unknown, Unknown, Unknown],
        output: Unknown,
        uses_entry: false,
        code: Code::Special(Special::While),
    },
    Builtin {
        name: "width$",
        arity_in: 1,
        arity_out: 1,
        inputs: [Str, Unknown, Unknown],
        output: Int,
        uses_entry: false,
        code: Code::Delegate {
            class: "Width",
            method: "width",
        },
    },
    Builtin {
        name: "write$",
        arity_in: 1,
        arity_out: 0,
        inputs: [Str, Unknown, Unknown],
        output: Unknown,
        uses_entry: false,
        code: Code::Fmt {
            template: "bibWriter.print({0})",
        },
    },
];

/// Look up a built-in by its style-language name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    static INDEX: OnceLock<HashMap<&'static str, &'static Builtin>> = OnceLock::new();
    let index = INDEX.get_or_init(|| BUILTINS.iter().map(|b| (b.name, b)).collect());
    index.get(name).copied()
}

/// The full table, for tests and documentation tooling.
pub fn all() -> &'static [Builtin] {
    BUILTINS
}
