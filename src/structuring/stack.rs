//! Stack simulation and expression reconstruction.
//!
//! A block's instructions are replayed against an [`ExprStack`]: operands are
//! popped as expression trees, wrapped into a new [`Instruction`] and pushed
//! back. Instructions that only have effects (stores, `void` calls, `iinc`)
//! append statements to the open scope instead.

use log::debug;

use crate::{
    ast::{
        ArrayAccess, ArrayLength, Cast, CompoundAssignment, Constant, IncrementExpression,
        IncrementStatement, InstanceFieldAccess, InstanceMethodInvoke, InstanceOf, Instruction,
        LocalVariable, Lvalue, MethodRef, Negate, New, NewArray, NumberCompare, Statement,
        StatementBlock, StaticFieldAccess, StaticMethodInvoke,
    },
    bytecode::{Insn, InvokeKind},
    utils::descriptor,
    DecompilerConfig, Error, Result,
};

/// One slot of the simulated operand stack.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StackEntry {
    /// A fully built expression
    Value(Instruction),
    /// The result of `new T` before its constructor ran
    Uninitialized(String),
}

/// The simulated operand stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ExprStack {
    entries: Vec<StackEntry>,
}

impl ExprStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, value: Instruction) {
        self.entries.push(StackEntry::Value(value));
    }

    fn push_entry(&mut self, entry: StackEntry) {
        self.entries.push(entry);
    }

    fn pop_entry(&mut self) -> Result<StackEntry> {
        self.entries
            .pop()
            .ok_or_else(|| malformed_error!("operand stack underflow"))
    }

    /// Pops a finished expression.
    pub(crate) fn pop(&mut self) -> Result<Instruction> {
        match self.pop_entry()? {
            StackEntry::Value(value) => Ok(value),
            StackEntry::Uninitialized(desc) => Err(malformed_error!(
                "uninitialized {} used before its constructor",
                desc
            )),
        }
    }

    /// Pops `count` values, returning them in push order.
    fn pop_many(&mut self, count: usize) -> Result<Vec<Instruction>> {
        let mut values = (0..count).map(|_| self.pop()).collect::<Result<Vec<_>>>()?;
        values.reverse();
        Ok(values)
    }

    fn peek(&self) -> Option<&StackEntry> {
        self.entries.last()
    }

    fn peek_mut(&mut self) -> Option<&mut StackEntry> {
        self.entries.last_mut()
    }

    /// Returns `true` if the top value is a `long` or `double`.
    fn top_is_wide(&self) -> bool {
        matches!(self.peek(), Some(StackEntry::Value(value)) if descriptor::is_wide(&value.infer_type()))
    }
}

fn duplicable(entry: &StackEntry) -> Result<()> {
    match entry {
        StackEntry::Value(value) if value.has_side_effects() => Err(Error::Unstructurable(
            format!("duplicated side-effecting value {value}"),
        )),
        _ => Ok(()),
    }
}

/// Replays instructions against an [`ExprStack`].
pub(crate) struct StackSimulator<'a> {
    config: &'a DecompilerConfig,
}

impl<'a> StackSimulator<'a> {
    pub(crate) fn new(config: &'a DecompilerConfig) -> Self {
        StackSimulator { config }
    }

    /// Simulates `insns`, appending statements to `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] on stack underflow,
    /// [`Error::Unstructurable`] when a side-effecting value is duplicated and
    /// [`Error::InvalidContainerMutation`] if `scope` is locked.
    pub(crate) fn run(
        &self,
        insns: &[Insn],
        scope: &mut StatementBlock,
        stack: &mut ExprStack,
    ) -> Result<()> {
        let mut index = 0;
        while index < insns.len() {
            let insn = &insns[index];
            let prev = index.checked_sub(1).map(|i| &insns[i]);
            let next = insns.get(index + 1);

            let effect = insn.stack_effect()?;
            let two_slot = matches!(insn, Insn::Dup2 | Insn::Pop2 | Insn::DupX2);
            if !two_slot && stack.len() < usize::from(effect.pops) {
                return Err(malformed_error!(
                    "{:?} pops {} values but the stack holds {}",
                    insn,
                    effect.pops,
                    stack.len()
                ));
            }

            if self.step(insn, prev, next, scope, stack)? {
                index += 1;
            }
            index += 1;
        }
        Ok(())
    }

    /// Simulates one instruction. Returns `true` if it also consumed `next`.
    fn step(
        &self,
        insn: &Insn,
        prev: Option<&Insn>,
        next: Option<&Insn>,
        scope: &mut StatementBlock,
        stack: &mut ExprStack,
    ) -> Result<bool> {
        match insn {
            Insn::Const(constant) => stack.push(Instruction::Constant(constant.clone())),
            Insn::Load { local, ty } => {
                let var = resolve_local(scope, *local, ty)?;
                let pre_increment = self.config.recover_increments
                    && matches!(prev, Some(Insn::Iinc { local: slot, .. }) if slot == local)
                    && matches!(scope.last(), Some(Statement::Increment(inc)) if inc.local.slot == *local);
                if pre_increment {
                    if let Statement::Increment(inc) = scope.pop_last()? {
                        stack.push(Instruction::Increment(IncrementExpression {
                            local: inc.local,
                            amount: inc.amount,
                            prefix: true,
                        }));
                        return Ok(false);
                    }
                }
                stack.push(Instruction::Local(var));
            }
            Insn::Store { local, ty } => {
                let value = stack.pop()?;
                let var = resolve_local(scope, *local, ty)?;
                self.assign(scope, Lvalue::Local(var), value)?;
            }
            Insn::Iinc { local, amount } => {
                let var = resolve_local(scope, *local, descriptor::INT)?;
                let post_increment = self.config.recover_increments
                    && matches!(prev, Some(Insn::Load { local: slot, .. }) if slot == local)
                    && matches!(stack.peek(), Some(StackEntry::Value(Instruction::Local(l))) if l.slot == *local);
                if post_increment {
                    stack.pop()?;
                    stack.push(Instruction::Increment(IncrementExpression {
                        local: var,
                        amount: *amount,
                        prefix: false,
                    }));
                } else {
                    scope.append(Statement::Increment(IncrementStatement {
                        local: var,
                        amount: *amount,
                    }))?;
                }
            }
            Insn::Binary { op, .. } => {
                let right = stack.pop()?;
                let left = stack.pop()?;
                stack.push(Instruction::operator(*op, left, right));
            }
            Insn::Negate { .. } => {
                let value = Box::new(stack.pop()?);
                stack.push(Instruction::Negate(Negate { value }));
            }
            Insn::Compare(kind) => {
                let right = Box::new(stack.pop()?);
                let left = Box::new(stack.pop()?);
                stack.push(Instruction::Compare(NumberCompare {
                    kind: *kind,
                    left,
                    right,
                }));
            }
            Insn::Convert { to } => {
                let value = Box::new(stack.pop()?);
                stack.push(Instruction::Cast(Cast {
                    descriptor: to.clone(),
                    value,
                }));
            }
            Insn::CheckCast(class) => {
                let value = Box::new(stack.pop()?);
                stack.push(Instruction::Cast(Cast {
                    descriptor: descriptor::class_ref(class),
                    value,
                }));
            }
            Insn::InstanceOf(class) => {
                let value = Box::new(stack.pop()?);
                stack.push(Instruction::InstanceOf(InstanceOf {
                    descriptor: descriptor::class_ref(class),
                    value,
                }));
            }
            Insn::GetField(field) => {
                let receiver = Box::new(stack.pop()?);
                stack.push(Instruction::InstanceField(InstanceFieldAccess {
                    field: field.clone(),
                    receiver,
                }));
            }
            Insn::GetStatic(field) => {
                stack.push(Instruction::StaticField(StaticFieldAccess {
                    field: field.clone(),
                }));
            }
            Insn::PutField(field) => {
                let value = stack.pop()?;
                let receiver = stack.pop()?;
                let target = Lvalue::InstanceField {
                    field: field.clone(),
                    receiver,
                };
                self.assign(scope, target, value)?;
            }
            Insn::PutStatic(field) => {
                let value = stack.pop()?;
                self.assign(scope, Lvalue::StaticField(field.clone()), value)?;
            }
            Insn::ArrayLoad { .. } => {
                let index = Box::new(stack.pop()?);
                let array = Box::new(stack.pop()?);
                stack.push(Instruction::ArrayAccess(ArrayAccess { array, index }));
            }
            Insn::ArrayStore { .. } => {
                let value = stack.pop()?;
                let index = stack.pop()?;
                let array = stack.pop()?;
                if fold_initializer(stack, &array, &index, &value) {
                    return Ok(false);
                }
                if matches!(stack.peek(), Some(StackEntry::Value(top)) if *top == array)
                    && matches!(array, Instruction::NewArray(_))
                {
                    return Err(Error::Unstructurable(format!(
                        "store into unnamed array {array} at index {index}"
                    )));
                }
                self.assign(scope, Lvalue::Array { array, index }, value)?;
            }
            Insn::ArrayLength => {
                let array = Box::new(stack.pop()?);
                stack.push(Instruction::ArrayLength(ArrayLength { array }));
            }
            Insn::NewArray { element } => {
                let size = Box::new(stack.pop()?);
                stack.push(Instruction::NewArray(NewArray {
                    element: element.clone(),
                    size,
                    initializer: None,
                }));
            }
            Insn::New(class) => {
                stack.push_entry(StackEntry::Uninitialized(descriptor::class_ref(class)));
            }
            Insn::Invoke { kind, method } => self.invoke(*kind, method, scope, stack)?,
            Insn::Dup => {
                let top = stack.pop_entry()?;
                if let StackEntry::Value(value) = &top {
                    if value.has_side_effects() {
                        if let Some(target) = store_target(next, scope)? {
                            self.assign(scope, target.clone(), value.clone())?;
                            stack.push(target.read());
                            return Ok(true);
                        }
                    }
                }
                duplicable(&top)?;
                stack.push_entry(top.clone());
                stack.push_entry(top);
            }
            Insn::DupX1 => {
                let v1 = stack.pop_entry()?;
                let v2 = stack.pop_entry()?;
                if let (StackEntry::Value(value), StackEntry::Value(receiver), Some(Insn::PutField(field))) =
                    (&v1, &v2, next)
                {
                    if receiver.has_side_effects() {
                        return Err(Error::Unstructurable(format!(
                            "field store through side-effecting receiver {receiver}"
                        )));
                    }
                    // receiver.f = value, used as an expression
                    let target = Lvalue::InstanceField {
                        field: field.clone(),
                        receiver: receiver.clone(),
                    };
                    self.assign(scope, target.clone(), value.clone())?;
                    stack.push(target.read());
                    return Ok(true);
                }
                duplicable(&v1)?;
                stack.push_entry(v1.clone());
                stack.push_entry(v2);
                stack.push_entry(v1);
            }
            Insn::DupX2 => {
                let v1 = stack.pop_entry()?;
                duplicable(&v1)?;
                let wide_below = stack.top_is_wide();
                let v2 = stack.pop_entry()?;
                if wide_below {
                    stack.push_entry(v1.clone());
                    stack.push_entry(v2);
                } else {
                    let v3 = stack.pop_entry()?;
                    stack.push_entry(v1.clone());
                    stack.push_entry(v3);
                    stack.push_entry(v2);
                }
                stack.push_entry(v1);
            }
            Insn::Dup2 => {
                if stack.top_is_wide() {
                    let v1 = stack.pop_entry()?;
                    duplicable(&v1)?;
                    stack.push_entry(v1.clone());
                    stack.push_entry(v1);
                } else {
                    let v1 = stack.pop_entry()?;
                    let v2 = stack.pop_entry()?;
                    duplicable(&v1)?;
                    duplicable(&v2)?;
                    stack.push_entry(v2.clone());
                    stack.push_entry(v1.clone());
                    stack.push_entry(v2);
                    stack.push_entry(v1);
                }
            }
            Insn::Pop => discard(scope, stack.pop_entry()?)?,
            Insn::Pop2 => {
                let wide = stack.top_is_wide();
                discard(scope, stack.pop_entry()?)?;
                if !wide {
                    discard(scope, stack.pop_entry()?)?;
                }
            }
            Insn::Swap => {
                let v1 = stack.pop_entry()?;
                let v2 = stack.pop_entry()?;
                stack.push_entry(v1);
                stack.push_entry(v2);
            }
        }
        Ok(false)
    }

    fn invoke(
        &self,
        kind: InvokeKind,
        method: &MethodRef,
        scope: &mut StatementBlock,
        stack: &mut ExprStack,
    ) -> Result<()> {
        let parsed = method.parsed()?;
        let args = stack.pop_many(parsed.params.len())?;

        if !kind.has_receiver() {
            let call = Instruction::StaticInvoke(StaticMethodInvoke {
                method: method.clone(),
                args,
            });
            return push_or_emit(call, parsed.returns_void(), scope, stack);
        }

        match stack.pop_entry()? {
            StackEntry::Uninitialized(desc) if kind == InvokeKind::Special && method.name == "<init>" => {
                let constructed = Instruction::New(New {
                    descriptor: desc.clone(),
                    constructor: method.descriptor.clone(),
                    args,
                });
                match stack.peek_mut() {
                    Some(top) if matches!(&*top, StackEntry::Uninitialized(d) if *d == desc) => {
                        *top = StackEntry::Value(constructed);
                        Ok(())
                    }
                    _ => scope.append(Statement::Invoke(constructed)),
                }
            }
            StackEntry::Uninitialized(desc) => Err(malformed_error!(
                "{}.{} invoked on uninitialized {}",
                method.owner,
                method.name,
                desc
            )),
            StackEntry::Value(receiver) => {
                let call = Instruction::InstanceInvoke(InstanceMethodInvoke {
                    method: method.clone(),
                    receiver: Box::new(receiver),
                    args,
                });
                push_or_emit(call, parsed.returns_void(), scope, stack)
            }
        }
    }

    /// Appends `target = value`, as `target op= v` when `value` is
    /// `target op v`.
    fn assign(&self, scope: &mut StatementBlock, target: Lvalue, value: Instruction) -> Result<()> {
        if self.config.recover_compound_assignments {
            if let Instruction::Operator(op) = &value {
                if *op.left == target.read() {
                    debug!("compound assignment {} {}= {}", target, op.kind, op.right);
                    return scope.append(Statement::CompoundAssignment(CompoundAssignment {
                        target,
                        op: op.kind,
                        value: (*op.right).clone(),
                    }));
                }
            }
        }
        scope.append(Statement::assign(target, value))
    }
}

/// Resolves a local slot against the scope, declaring a synthetic name for
/// slots without debug information.
fn resolve_local(scope: &mut StatementBlock, slot: u16, ty: &str) -> Result<LocalVariable> {
    if let Some(local) = scope.locals().get(slot) {
        return Ok(local.clone());
    }
    let local = LocalVariable::new(slot, format!("local{slot}"), ty);
    scope.locals_mut()?.declare(local.clone());
    Ok(local)
}

/// Returns the destination of a store that immediately consumes a `dup`.
fn store_target(next: Option<&Insn>, scope: &mut StatementBlock) -> Result<Option<Lvalue>> {
    Ok(match next {
        Some(Insn::Store { local, ty }) => Some(Lvalue::Local(resolve_local(scope, *local, ty)?)),
        Some(Insn::PutStatic(field)) => Some(Lvalue::StaticField(field.clone())),
        _ => None,
    })
}

fn push_or_emit(
    call: Instruction,
    returns_void: bool,
    scope: &mut StatementBlock,
    stack: &mut ExprStack,
) -> Result<()> {
    if returns_void {
        scope.append(Statement::Invoke(call))
    } else {
        stack.push(call);
        Ok(())
    }
}

/// Drops a popped entry, keeping effectful expressions as statements.
fn discard(scope: &mut StatementBlock, entry: StackEntry) -> Result<()> {
    match entry {
        StackEntry::Value(value) if value.has_side_effects() => {
            scope.append(Statement::Invoke(value))
        }
        _ => Ok(()),
    }
}

/// Longest array whose stores are folded into an initializer.
const MAX_INITIALIZER_LEN: usize = 64;

/// Folds `dup; idx; value; xastore` on a fresh array into its initializer.
///
/// Only arrays with a constant size fold. The initializer always holds one
/// value per element; slots that were never stored keep the element type's
/// default. Stores must arrive in ascending index order.
fn fold_initializer(
    stack: &mut ExprStack,
    array: &Instruction,
    index: &Instruction,
    value: &Instruction,
) -> bool {
    let Instruction::NewArray(created) = array else {
        return false;
    };
    let Instruction::Constant(Constant::Int(size)) = created.size.as_ref() else {
        return false;
    };
    let Ok(size) = usize::try_from(*size) else {
        return false;
    };
    let Instruction::Constant(Constant::Int(index)) = index else {
        return false;
    };
    let Ok(index) = usize::try_from(*index) else {
        return false;
    };
    if size > MAX_INITIALIZER_LEN || index >= size {
        return false;
    }

    let default = default_value(&created.element);
    if let Some(values) = &created.initializer {
        let last_stored = values.iter().rposition(|v| *v != default);
        if last_stored.is_some_and(|last| index <= last) {
            return false;
        }
    }

    match stack.peek_mut() {
        Some(StackEntry::Value(Instruction::NewArray(top))) if *top == *created => {
            let values = top
                .initializer
                .get_or_insert_with(|| vec![default.clone(); size]);
            values[index] = value.clone();
            true
        }
        _ => false,
    }
}

/// The value an array element holds before it is stored.
fn default_value(element: &str) -> Instruction {
    let constant = match element {
        descriptor::LONG => Constant::Long(0),
        descriptor::FLOAT => Constant::Float(0.0),
        descriptor::DOUBLE => Constant::Double(0.0),
        descriptor::BOOLEAN => Constant::Boolean(false),
        e if e.starts_with('L') || e.starts_with('[') => Constant::Null,
        _ => Constant::Int(0),
    };
    Instruction::Constant(constant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BlockKind, FieldRef, MethodRef, OperatorKind};

    fn run(insns: &[Insn]) -> (StatementBlock, ExprStack) {
        let config = DecompilerConfig::default();
        let mut scope = StatementBlock::new(BlockKind::Method);
        let mut stack = ExprStack::new();
        StackSimulator::new(&config)
            .run(insns, &mut scope, &mut stack)
            .unwrap();
        (scope, stack)
    }

    fn load(local: u16) -> Insn {
        Insn::Load {
            local,
            ty: "I".into(),
        }
    }

    fn store(local: u16) -> Insn {
        Insn::Store {
            local,
            ty: "I".into(),
        }
    }

    #[test]
    fn test_binary_expression() {
        let (scope, mut stack) = run(&[
            load(1),
            Insn::Const(Constant::Int(2)),
            Insn::Binary {
                op: OperatorKind::Mul,
                ty: "I".into(),
            },
        ]);
        assert!(scope.is_empty());
        assert_eq!(stack.pop().unwrap().to_string(), "local1 * 2");
    }

    #[test]
    fn test_compound_assignment() {
        let (scope, stack) = run(&[
            load(1),
            load(2),
            Insn::Binary {
                op: OperatorKind::Add,
                ty: "I".into(),
            },
            store(1),
        ]);
        assert!(stack.is_empty());
        assert!(matches!(scope.last(), Some(Statement::CompoundAssignment(_))));
        assert_eq!(scope.last().unwrap().to_string(), "local1 += local2;");
    }

    #[test]
    fn test_compound_assignment_disabled() {
        let config = DecompilerConfig::default().with_compound_assignments(false);
        let mut scope = StatementBlock::new(BlockKind::Method);
        let mut stack = ExprStack::new();
        StackSimulator::new(&config)
            .run(
                &[
                    load(1),
                    Insn::Const(Constant::Int(3)),
                    Insn::Binary {
                        op: OperatorKind::Sub,
                        ty: "I".into(),
                    },
                    store(1),
                ],
                &mut scope,
                &mut stack,
            )
            .unwrap();
        assert_eq!(scope.last().unwrap().to_string(), "local1 = local1 - 3;");
    }

    #[test]
    fn test_increment_idioms() {
        let (scope, _) = run(&[Insn::Iinc { local: 1, amount: 1 }]);
        assert_eq!(scope.last().unwrap().to_string(), "local1++;");

        let (scope, mut stack) = run(&[load(1), Insn::Iinc { local: 1, amount: 1 }]);
        assert!(scope.is_empty());
        assert_eq!(stack.pop().unwrap().to_string(), "local1++");

        let (scope, mut stack) = run(&[Insn::Iinc { local: 1, amount: -1 }, load(1)]);
        assert!(scope.is_empty());
        assert_eq!(stack.pop().unwrap().to_string(), "--local1");
    }

    #[test]
    fn test_constructor_idiom() {
        let (scope, _) = run(&[
            Insn::New("java/lang/StringBuilder".into()),
            Insn::Dup,
            Insn::Const(Constant::String("a".into())),
            Insn::Invoke {
                kind: InvokeKind::Special,
                method: MethodRef::new("java/lang/StringBuilder", "<init>", "(Ljava/lang/String;)V"),
            },
            Insn::Store {
                local: 2,
                ty: "Ljava/lang/StringBuilder;".into(),
            },
        ]);
        assert_eq!(
            scope.last().unwrap().to_string(),
            "local2 = new java.lang.StringBuilder(\"a\");"
        );
    }

    #[test]
    fn test_discarded_constructor() {
        let (scope, stack) = run(&[
            Insn::New("java/lang/Object".into()),
            Insn::Invoke {
                kind: InvokeKind::Special,
                method: MethodRef::new("java/lang/Object", "<init>", "()V"),
            },
        ]);
        assert!(stack.is_empty());
        assert!(matches!(scope.last(), Some(Statement::Invoke(Instruction::New(_)))));
    }

    #[test]
    fn test_array_initializer() {
        let (scope, mut stack) = run(&[
            Insn::Const(Constant::Int(2)),
            Insn::NewArray {
                element: "I".into(),
            },
            Insn::Dup,
            Insn::Const(Constant::Int(0)),
            Insn::Const(Constant::Int(7)),
            Insn::ArrayStore { ty: "I".into() },
            Insn::Dup,
            Insn::Const(Constant::Int(1)),
            Insn::Const(Constant::Int(8)),
            Insn::ArrayStore { ty: "I".into() },
        ]);
        assert!(scope.is_empty());
        let array = stack.pop().unwrap();
        assert_eq!(array.infer_type(), "[I");
        let Instruction::NewArray(created) = array else {
            panic!("expected array construction");
        };
        assert_eq!(created.initializer.map(|v| v.len()), Some(2));
    }

    #[test]
    fn test_sparse_array_initializer_keeps_length() {
        let (_, mut stack) = run(&[
            Insn::Const(Constant::Int(3)),
            Insn::NewArray {
                element: "I".into(),
            },
            Insn::Dup,
            Insn::Const(Constant::Int(0)),
            Insn::Const(Constant::Int(7)),
            Insn::ArrayStore { ty: "I".into() },
        ]);
        assert_eq!(stack.pop().unwrap().to_string(), "new int[] {7, 0, 0}");
    }

    #[test]
    fn test_unfoldable_array_stores() {
        let config = DecompilerConfig::default();
        let simulate = |insns: &[Insn]| {
            let mut scope = StatementBlock::new(BlockKind::Method);
            let mut stack = ExprStack::new();
            StackSimulator::new(&config).run(insns, &mut scope, &mut stack)
        };
        let store = |index: i32, value: i32| {
            [
                Insn::Dup,
                Insn::Const(Constant::Int(index)),
                Insn::Const(Constant::Int(value)),
                Insn::ArrayStore { ty: "I".into() },
            ]
        };
        let new_array = Insn::NewArray {
            element: "I".into(),
        };

        // Non-constant size
        let mut insns = vec![load(1), new_array.clone()];
        insns.extend(store(0, 7));
        assert!(matches!(simulate(&insns), Err(Error::Unstructurable(_))));

        // Descending indices
        let mut insns = vec![Insn::Const(Constant::Int(2)), new_array];
        insns.extend(store(1, 8));
        insns.extend(store(0, 7));
        assert!(matches!(simulate(&insns), Err(Error::Unstructurable(_))));
    }

    #[test]
    fn test_field_increment_via_dup() {
        let field = FieldRef::new("a/Counter", "count", "I");
        let (scope, _) = run(&[
            Insn::Load {
                local: 0,
                ty: "La/Counter;".into(),
            },
            Insn::Dup,
            Insn::GetField(field.clone()),
            Insn::Const(Constant::Int(1)),
            Insn::Binary {
                op: OperatorKind::Add,
                ty: "I".into(),
            },
            Insn::PutField(field),
        ]);
        assert_eq!(scope.last().unwrap().to_string(), "local0.count += 1;");
    }

    #[test]
    fn test_void_call_and_pop() {
        let (scope, stack) = run(&[
            Insn::Invoke {
                kind: InvokeKind::Static,
                method: MethodRef::new("a/Util", "tick", "()I"),
            },
            Insn::Pop,
            Insn::Invoke {
                kind: InvokeKind::Static,
                method: MethodRef::new("a/Util", "reset", "()V"),
            },
        ]);
        assert!(stack.is_empty());
        assert_eq!(scope.len(), 2);
    }

    #[test]
    fn test_dup_of_call_into_store() {
        let (scope, mut stack) = run(&[
            Insn::Invoke {
                kind: InvokeKind::Static,
                method: MethodRef::new("a/Util", "next", "()I"),
            },
            Insn::Dup,
            store(3),
        ]);
        assert_eq!(scope.len(), 1);
        assert_eq!(stack.pop().unwrap().to_string(), "local3");
    }

    #[test]
    fn test_underflow_is_malformed() {
        let config = DecompilerConfig::default();
        let mut scope = StatementBlock::new(BlockKind::Method);
        let mut stack = ExprStack::new();
        let result = StackSimulator::new(&config).run(
            &[Insn::Binary {
                op: OperatorKind::Add,
                ty: "I".into(),
            }],
            &mut scope,
            &mut stack,
        );
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }
}
