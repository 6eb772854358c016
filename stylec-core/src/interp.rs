//! Symbolic stack interpreter.
//!
//! Each function body is scanned left to right over a virtual stack
//! of IR nodes. Popping an empty stack synthesizes a formal
//! parameter, so a function's parameter list is exactly the set of
//! values it demanded from its caller, numbered in demand order.
//! The two higher-order built-ins (`if$`, `while$`) are lowered here
//! into structured control flow: their block operands are re-parsed
//! into nested statement sequences that continue from the current
//! outer stack.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::CompileError;
use crate::ir::{
    AssignTarget, CompilationUnit, Expr, FunctionIr, ParamIr, ReturnType, RunStep, Stmt, VarScope,
    VarType,
};
use crate::lexer::{Token, TokenKind};
use crate::parser::Declaration;
use crate::registry::{self, Builtin, Code, Special};

/// Build the IR forest for a parsed style program.
///
/// Functions are decompiled once, memoized by name, on first
/// reference; emission order is memoization order, not source order.
pub fn build_ir(
    declarations: &[Declaration],
    class_name: &str,
) -> Result<CompilationUnit, CompileError> {
    let mut builder = Builder::default();
    let mut int_globals = Vec::new();
    let mut str_globals = Vec::new();
    let mut options = Vec::new();

    for declaration in declarations {
        match declaration {
            Declaration::Entry {
                fields,
                int_fields,
                str_fields,
            } => {
                builder.fields.extend(fields.iter().cloned());
                builder.entry_ints.extend(int_fields.iter().cloned());
                builder.entry_strs.extend(str_fields.iter().cloned());
            }
            Declaration::Integers(names) => {
                for name in names {
                    if builder.global_ints.insert(name.clone()) {
                        int_globals.push(name.clone());
                    }
                }
            }
            Declaration::Strings(names) => {
                for name in names {
                    if builder.global_strs.insert(name.clone()) {
                        str_globals.push(name.clone());
                    }
                }
            }
            Declaration::Function { name, body } => {
                builder.bodies.insert(name.clone(), body.clone());
            }
            Declaration::Macro { name, text } => {
                builder.macros.insert(name.clone(), text.clone());
            }
            Declaration::Option { name, default } => {
                options.push((name.clone(), default.clone()));
            }
            _ => {}
        }
    }

    // Decompile every declared function and macro; references may
    // already have forced some of them.
    for declaration in declarations {
        match declaration {
            Declaration::Function { name, .. } | Declaration::Macro { name, .. } => {
                builder.ensure_function(name)?;
            }
            _ => {}
        }
    }

    let mut run = Vec::new();
    for declaration in declarations {
        match declaration {
            Declaration::Execute(name) => {
                builder.check_command("execute", name, false)?;
                run.push(RunStep::Execute(name.clone()));
            }
            Declaration::Iterate(name) => {
                builder.check_command("iterate", name, true)?;
                run.push(RunStep::Iterate(name.clone()));
            }
            Declaration::Reverse(name) => {
                builder.check_command("reverse", name, true)?;
                run.push(RunStep::Reverse(name.clone()));
            }
            Declaration::Read => run.push(RunStep::Read),
            Declaration::Sort => run.push(RunStep::Sort),
            _ => {}
        }
    }

    Ok(CompilationUnit {
        class_name: class_name.to_string(),
        int_globals,
        str_globals,
        functions: builder.finished,
        options,
        run,
    })
}

/// Per-function interpretation state shared by all nested stacks of
/// one body, so that both arms of a conditional reaching below the
/// same stack depth observe the same synthesized parameter.
struct FnState {
    name: String,
    params: Vec<ParamIr>,
    /// Parameters synthesized for underflow, indexed by depth below
    /// the function's entry stack.
    underflow: Vec<Rc<Expr>>,
    uses_entry: bool,
}

/// The virtual operand stack.
#[derive(Clone, Default)]
struct VStack {
    items: Vec<Rc<Expr>>,
    /// How many values below the function's entry stack this stack
    /// has consumed.
    taken_below: usize,
}

impl VStack {
    fn push(&mut self, value: Rc<Expr>) {
        self.items.push(value);
    }

    /// Pop an operand, synthesizing a parameter on underflow. The
    /// slot type comes from the demanding signature; the first demand
    /// fixes the type.
    fn pop(&mut self, state: &mut FnState, ty: VarType) -> Rc<Expr> {
        if let Some(value) = self.items.pop() {
            return value;
        }
        let depth = self.taken_below;
        self.taken_below += 1;
        if let Some(param) = state.underflow.get(depth) {
            return param.clone();
        }
        let index = state.params.len() + 1;
        let param = Rc::new(Expr::Param { index, ty });
        state.params.push(ParamIr { index, ty });
        state.underflow.push(param.clone());
        param
    }

    /// Structural equality by node identity.
    fn same_as(&self, other: &VStack) -> bool {
        self.taken_below == other.taken_below
            && self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| Rc::ptr_eq(a, b))
    }

    /// Whether `self` and `other` agree except for one freshly pushed
    /// value on top of each.
    fn same_below_top(&self, other: &VStack) -> bool {
        self.taken_below == other.taken_below
            && !self.items.is_empty()
            && self.items.len() == other.items.len()
            && self.items[..self.items.len() - 1]
                .iter()
                .zip(&other.items[..other.items.len() - 1])
                .all(|(a, b)| Rc::ptr_eq(a, b))
    }
}

#[derive(Default)]
struct Builder {
    fields: HashSet<String>,
    entry_ints: HashSet<String>,
    entry_strs: HashSet<String>,
    global_ints: HashSet<String>,
    global_strs: HashSet<String>,
    bodies: HashMap<String, Vec<Token>>,
    macros: HashMap<String, String>,
    finished: Vec<FunctionIr>,
    index: HashMap<String, usize>,
    in_progress: HashSet<String>,
}

impl Builder {
    fn scope_of(&self, name: &str) -> Option<VarScope> {
        if self.global_ints.contains(name) {
            Some(VarScope::GlobalInt)
        } else if self.global_strs.contains(name) {
            Some(VarScope::GlobalStr)
        } else if self.entry_ints.contains(name) {
            Some(VarScope::EntryInt)
        } else if self.entry_strs.contains(name) {
            Some(VarScope::EntryStr)
        } else if self.fields.contains(name) {
            Some(VarScope::Field)
        } else {
            None
        }
    }

    /// Decompile a function or macro on first reference.
    fn ensure_function(&mut self, name: &str) -> Result<usize, CompileError> {
        if let Some(&index) = self.index.get(name) {
            return Ok(index);
        }
        if self.in_progress.contains(name) {
            // A definition cycle cannot be expressed as straight-line
            // stack demands.
            return Err(CompileError::ComplexFunction {
                name: name.to_string(),
                residual: 0,
            });
        }
        if let Some(text) = self.macros.get(name).cloned() {
            return Ok(self.finish(FunctionIr {
                name: name.to_string(),
                params: Vec::new(),
                uses_entry: false,
                body: vec![Stmt::Return(Rc::new(Expr::StrLit(text)))],
                ret: ReturnType::Str,
            }));
        }
        let Some(body) = self.bodies.get(name).cloned() else {
            return Err(CompileError::UnknownIdentifier {
                name: name.to_string(),
            });
        };

        self.in_progress.insert(name.to_string());
        let mut state = FnState {
            name: name.to_string(),
            params: Vec::new(),
            underflow: Vec::new(),
            uses_entry: false,
        };
        let mut stack = VStack::default();
        let mut stmts = Vec::new();
        let outcome = self.interpret(&body, &mut state, &mut stack, &mut stmts);
        self.in_progress.remove(name);
        outcome?;

        let ret = match stack.items.len() {
            0 => ReturnType::Void,
            1 => {
                let value = stack.items.pop().expect("residual value present");
                if matches!(&*value, Expr::Name(_) | Expr::CodeBlock(_)) {
                    return Err(CompileError::ComplexFunction {
                        name: name.to_string(),
                        residual: 1,
                    });
                }
                let ret = match value.var_type() {
                    VarType::Str => ReturnType::Str,
                    VarType::Int | VarType::Unknown => ReturnType::Int,
                };
                stmts.push(Stmt::Return(value));
                ret
            }
            residual => {
                return Err(CompileError::ComplexFunction {
                    name: name.to_string(),
                    residual,
                });
            }
        };

        Ok(self.finish(FunctionIr {
            name: name.to_string(),
            params: state.params,
            uses_entry: state.uses_entry,
            body: stmts,
            ret,
        }))
    }

    fn finish(&mut self, function: FunctionIr) -> usize {
        let index = self.finished.len();
        self.index.insert(function.name.clone(), index);
        self.finished.push(function);
        index
    }

    fn interpret(
        &mut self,
        tokens: &[Token],
        state: &mut FnState,
        stack: &mut VStack,
        out: &mut Vec<Stmt>,
    ) -> Result<(), CompileError> {
        for token in tokens {
            match &token.kind {
                TokenKind::Number(value) => stack.push(Rc::new(Expr::IntLit(*value))),
                TokenKind::Str(text) => stack.push(Rc::new(Expr::StrLit(text.clone()))),
                TokenKind::Quote(name) => stack.push(Rc::new(Expr::Name(name.clone()))),
                TokenKind::Block(inner) => stack.push(Rc::new(Expr::CodeBlock(inner.clone()))),
                TokenKind::Ident(name) => {
                    if let Some(builtin) = registry::lookup(name) {
                        self.builtin(builtin, state, stack, out)?;
                    } else if let Some(scope) = self.scope_of(name) {
                        if scope.uses_entry() {
                            state.uses_entry = true;
                        }
                        stack.push(Rc::new(Expr::Var {
                            name: name.clone(),
                            scope,
                        }));
                    } else {
                        self.call_user(name, state, stack, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn call_user(
        &mut self,
        name: &str,
        state: &mut FnState,
        stack: &mut VStack,
        out: &mut Vec<Stmt>,
    ) -> Result<(), CompileError> {
        let index = self.ensure_function(name)?;
        let callee = &self.finished[index];
        let param_types: Vec<VarType> = callee.params.iter().map(|p| p.ty).collect();
        let ret = callee.ret;
        let uses_entry = callee.uses_entry;

        if uses_entry {
            state.uses_entry = true;
        }
        let mut args = Vec::with_capacity(param_types.len());
        for ty in param_types {
            args.push(stack.pop(state, ty));
        }
        if ret == ReturnType::Void {
            out.push(Stmt::VoidCallUser {
                name: name.to_string(),
                args,
                uses_entry,
            });
        } else {
            stack.push(Rc::new(Expr::CallUser {
                name: name.to_string(),
                args,
                ret,
                uses_entry,
            }));
        }
        Ok(())
    }

    fn builtin(
        &mut self,
        builtin: &'static Builtin,
        state: &mut FnState,
        stack: &mut VStack,
        out: &mut Vec<Stmt>,
    ) -> Result<(), CompileError> {
        if builtin.uses_entry {
            state.uses_entry = true;
        }
        let Code::Special(special) = builtin.code else {
            let mut args = Vec::with_capacity(builtin.arity_in);
            for slot in 0..builtin.arity_in {
                args.push(stack.pop(state, builtin.inputs[slot]));
            }
            if builtin.arity_out == 0 {
                out.push(Stmt::VoidCall { builtin, args });
            } else {
                stack.push(Rc::new(Expr::Call { builtin, args }));
            }
            return Ok(());
        };

        match special {
            Special::Skip => {}
            Special::Pop => {
                let value = stack.pop(state, VarType::Unknown);
                out.push(Stmt::Discard(value));
            }
            Special::Duplicate => {
                // A second reference to the same node, not a clone.
                let value = stack.pop(state, VarType::Unknown);
                stack.push(value.clone());
                stack.push(value);
            }
            Special::Swap => {
                let top = stack.pop(state, VarType::Unknown);
                let below = stack.pop(state, VarType::Unknown);
                stack.push(top);
                stack.push(below);
            }
            Special::Stack => {
                // Drains only the concrete stack; no parameters are
                // synthesized for values that were never pushed.
                let top = registry::lookup("top$").expect("top$ is registered");
                while let Some(value) = stack.items.pop() {
                    out.push(Stmt::VoidCall {
                        builtin: top,
                        args: vec![value],
                    });
                }
            }
            Special::Assign => self.assign(state, stack, out)?,
            Special::CallType => out.push(Stmt::VoidCall {
                builtin,
                args: Vec::new(),
            }),
            Special::If => self.conditional(state, stack, out)?,
            Special::While => self.pre_test_loop(state, stack, out)?,
        }
        Ok(())
    }

    fn assign(
        &mut self,
        state: &mut FnState,
        stack: &mut VStack,
        out: &mut Vec<Stmt>,
    ) -> Result<(), CompileError> {
        let target = stack.pop(state, VarType::Unknown);
        let Expr::Name(name) = &*target else {
            return Err(CompileError::AssignTarget {
                name: "<stack value>".to_string(),
            });
        };
        let scope = match self.scope_of(name) {
            Some(VarScope::Field) => {
                // Fields are read-only.
                return Err(CompileError::AssignTarget { name: name.clone() });
            }
            Some(scope) => scope,
            None => {
                if self.bodies.contains_key(name)
                    || self.macros.contains_key(name)
                    || registry::lookup(name).is_some()
                {
                    return Err(CompileError::AssignTarget { name: name.clone() });
                }
                return Err(CompileError::UnknownIdentifier { name: name.clone() });
            }
        };
        if scope.uses_entry() {
            state.uses_entry = true;
        }
        let value = stack.pop(state, scope.var_type());
        out.push(Stmt::Assign {
            target: AssignTarget {
                name: name.clone(),
                scope,
            },
            value,
        });
        Ok(())
    }

    /// Tokens of a block operand of `if$`/`while$`. A quoted function
    /// name stands for a block containing a single call.
    fn arm_tokens(&self, operand: &Expr, state: &FnState) -> Result<Vec<Token>, CompileError> {
        match operand {
            Expr::CodeBlock(tokens) => Ok(tokens.clone()),
            Expr::Name(name) => Ok(vec![Token::ident(name.clone(), 0)]),
            _ => Err(CompileError::ComplexFunction {
                name: state.name.clone(),
                residual: 1,
            }),
        }
    }

    fn conditional(
        &mut self,
        state: &mut FnState,
        stack: &mut VStack,
        out: &mut Vec<Stmt>,
    ) -> Result<(), CompileError> {
        // Demand order: else-block, then-block, condition.
        let else_op = stack.pop(state, VarType::Unknown);
        let then_op = stack.pop(state, VarType::Unknown);
        let cond = stack.pop(state, VarType::Int);
        let then_tokens = self.arm_tokens(&then_op, state)?;
        let else_tokens = self.arm_tokens(&else_op, state)?;

        let mut then_stack = stack.clone();
        let mut then_arm = Vec::new();
        self.interpret(&then_tokens, state, &mut then_stack, &mut then_arm)?;
        let mut else_stack = stack.clone();
        let mut else_arm = Vec::new();
        self.interpret(&else_tokens, state, &mut else_stack, &mut else_arm)?;

        let pure = then_arm.is_empty() && else_arm.is_empty();
        if pure && !then_stack.same_as(&else_stack) && then_stack.same_below_top(&else_stack) {
            // Both arms reduce to a single pushed expression:
            // EXPRESSION shape, rendered as a ternary.
            let then_value = then_stack.items.pop().expect("arm value present");
            let else_value = else_stack.items.pop().expect("arm value present");
            then_stack.push(Rc::new(Expr::Ternary {
                cond,
                then_value,
                else_value,
            }));
            *stack = then_stack;
        } else if then_stack.same_as(&else_stack) {
            // STATEMENT shape. Both arms must agree on their net
            // stack effect.
            *stack = then_stack;
            out.push(Stmt::If {
                cond,
                then_arm,
                else_arm,
            });
        } else {
            return Err(CompileError::ComplexFunction {
                name: state.name.clone(),
                residual: then_stack.items.len().max(else_stack.items.len()),
            });
        }
        Ok(())
    }

    fn pre_test_loop(
        &mut self,
        state: &mut FnState,
        stack: &mut VStack,
        out: &mut Vec<Stmt>,
    ) -> Result<(), CompileError> {
        // Demand order: body-block, then guard-block.
        let body_op = stack.pop(state, VarType::Unknown);
        let guard_op = stack.pop(state, VarType::Unknown);
        let body_tokens = self.arm_tokens(&body_op, state)?;
        let guard_tokens = self.arm_tokens(&guard_op, state)?;

        // The guard is a fresh nested interpretation, conceptually
        // re-evaluated every iteration: it must push exactly one
        // value and leave the outer stack untouched.
        let mut guard_stack = stack.clone();
        let mut guard_stmts = Vec::new();
        self.interpret(&guard_tokens, state, &mut guard_stack, &mut guard_stmts)?;
        let guard_ok = guard_stmts.is_empty()
            && guard_stack.taken_below == stack.taken_below
            && guard_stack.items.len() == stack.items.len() + 1
            && guard_stack.items[..stack.items.len()]
                .iter()
                .zip(&stack.items)
                .all(|(a, b)| Rc::ptr_eq(a, b));
        if !guard_ok {
            return Err(CompileError::ComplexFunction {
                name: state.name.clone(),
                residual: guard_stack.items.len(),
            });
        }
        let cond = guard_stack.items.pop().expect("guard value present");

        // The body must be stack-neutral across an iteration.
        let mut body_stack = stack.clone();
        let mut body = Vec::new();
        self.interpret(&body_tokens, state, &mut body_stack, &mut body)?;
        if !body_stack.same_as(stack) {
            return Err(CompileError::ComplexFunction {
                name: state.name.clone(),
                residual: body_stack.items.len(),
            });
        }

        out.push(Stmt::While { cond, body });
        Ok(())
    }

    fn check_command(
        &mut self,
        command: &'static str,
        name: &str,
        entry_in_scope: bool,
    ) -> Result<(), CompileError> {
        if let Some(builtin) = registry::lookup(name) {
            if builtin.arity_out > 0 {
                return Err(CompileError::CommandReturnsValue {
                    command,
                    name: name.to_string(),
                });
            }
            if builtin.arity_in > 0 {
                return Err(CompileError::CommandTakesArguments {
                    command,
                    name: name.to_string(),
                });
            }
            if builtin.uses_entry && !entry_in_scope {
                return Err(CompileError::CommandNeedsEntry {
                    command,
                    name: name.to_string(),
                });
            }
            return Ok(());
        }
        let index = self.ensure_function(name)?;
        let function = &self.finished[index];
        if function.ret != ReturnType::Void {
            return Err(CompileError::CommandReturnsValue {
                command,
                name: name.to_string(),
            });
        }
        if !function.params.is_empty() {
            return Err(CompileError::CommandTakesArguments {
                command,
                name: name.to_string(),
            });
        }
        if function.uses_entry && !entry_in_scope {
            return Err(CompileError::CommandNeedsEntry {
                command,
                name: name.to_string(),
            });
        }
        Ok(())
    }
}
