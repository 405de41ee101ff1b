//! Expression nodes.
//!
//! An [`Instruction`] is any node that produces a value: literals, local and
//! field reads, array operations, operators, invocations, ternaries and the
//! increment expressions recovered from `iinc` idioms. Nodes are built bottom-up
//! by the stack simulator and are never modified afterwards; children are fixed
//! at construction.
//!
//! Every node supports [`Instruction::infer_type`], which returns the type
//! descriptor of the value, and [`Instruction::accept`], which drives an
//! [`InstructionVisitor`] over the node and its children in source evaluation
//! order.

use std::fmt;

use strum::{EnumCount, EnumIter};

use crate::{
    ast::{Condition, InstructionVisitor, LocalVariable},
    utils::descriptor::{self, MethodDescriptor},
};

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `int` literal (also used for `byte`, `short`, `char` pushes)
    Int(i32),
    /// `long` literal
    Long(i64),
    /// `float` literal
    Float(f32),
    /// `double` literal
    Double(f64),
    /// String literal
    String(String),
    /// The `null` reference
    Null,
    /// Class literal, holding the descriptor of the referenced type
    Type(String),
    /// `boolean` literal
    Boolean(bool),
}

impl Constant {
    /// Returns the descriptor of the literal's type.
    #[must_use]
    pub fn infer_type(&self) -> String {
        match self {
            Constant::Int(_) => descriptor::INT.to_string(),
            Constant::Long(_) => descriptor::LONG.to_string(),
            Constant::Float(_) => descriptor::FLOAT.to_string(),
            Constant::Double(_) => descriptor::DOUBLE.to_string(),
            Constant::String(_) => descriptor::STRING.to_string(),
            Constant::Null => descriptor::OBJECT.to_string(),
            Constant::Type(_) => descriptor::CLASS.to_string(),
            Constant::Boolean(_) => descriptor::BOOLEAN.to_string(),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Long(v) => write!(f, "{v}L"),
            Constant::Float(v) => write!(f, "{v:?}F"),
            Constant::Double(v) => write!(f, "{v:?}"),
            Constant::String(v) => write!(f, "{v:?}"),
            Constant::Null => write!(f, "null"),
            Constant::Type(desc) => write!(f, "{}.class", descriptor::source_name(desc)),
            Constant::Boolean(v) => write!(f, "{v}"),
        }
    }
}

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum OperatorKind {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `>>>`
    Ushr,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
}

impl OperatorKind {
    /// Returns the source-level symbol of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            OperatorKind::Add => "+",
            OperatorKind::Sub => "-",
            OperatorKind::Mul => "*",
            OperatorKind::Div => "/",
            OperatorKind::Rem => "%",
            OperatorKind::Shl => "<<",
            OperatorKind::Shr => ">>",
            OperatorKind::Ushr => ">>>",
            OperatorKind::And => "&",
            OperatorKind::Or => "|",
            OperatorKind::Xor => "^",
        }
    }

    /// Binding strength, higher binds tighter.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            OperatorKind::Mul | OperatorKind::Div | OperatorKind::Rem => 10,
            OperatorKind::Add | OperatorKind::Sub => 9,
            OperatorKind::Shl | OperatorKind::Shr | OperatorKind::Ushr => 8,
            OperatorKind::And => 5,
            OperatorKind::Xor => 4,
            OperatorKind::Or => 3,
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The raw three-way comparisons (`lcmp`, `fcmpl`, `fcmpg`, `dcmpl`, `dcmpg`).
///
/// They push -1, 0 or 1 and are normally consumed by a following branch, in
/// which case the structurer folds them into a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum CompareKind {
    /// `lcmp`
    Long,
    /// `fcmpl`, NaN yields -1
    FloatL,
    /// `fcmpg`, NaN yields 1
    FloatG,
    /// `dcmpl`
    DoubleL,
    /// `dcmpg`
    DoubleG,
}

/// A field reference: owner internal name, field name and descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Internal name of the declaring class, e.g. `java/lang/System`
    pub owner: String,
    /// Field name
    pub name: String,
    /// Field type descriptor
    pub descriptor: String,
}

impl FieldRef {
    /// Creates a field reference.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        FieldRef {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// A method reference: owner internal name, method name and method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Internal name of the declaring class
    pub owner: String,
    /// Method name
    pub name: String,
    /// Method descriptor, e.g. `(I)Ljava/lang/String;`
    pub descriptor: String,
}

impl MethodRef {
    /// Creates a method reference.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        MethodRef {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Returns the return type descriptor.
    ///
    /// Falls back to `java/lang/Object` when the descriptor has no `)`.
    #[must_use]
    pub fn return_type(&self) -> &str {
        self.descriptor
            .rsplit_once(')')
            .map_or(descriptor::OBJECT, |(_, ret)| ret)
    }

    /// Parses the method descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnrecognizedInput`] for a malformed descriptor.
    pub fn parsed(&self) -> crate::Result<MethodDescriptor> {
        MethodDescriptor::parse(&self.descriptor)
    }
}

/// Read of an instance field: `receiver.name`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceFieldAccess {
    /// The field being read
    pub field: FieldRef,
    /// The object the field is read from
    pub receiver: Box<Instruction>,
}

/// Read of a static field: `Owner.name`.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticFieldAccess {
    /// The field being read
    pub field: FieldRef,
}

/// Array element read: `array[index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayAccess {
    /// The array
    pub array: Box<Instruction>,
    /// The element index
    pub index: Box<Instruction>,
}

/// `array.length`
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLength {
    /// The array
    pub array: Box<Instruction>,
}

/// A binary operator over two operands.
///
/// All eleven operators share this node; [`OperatorKind`] carries the symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    /// Which operator
    pub kind: OperatorKind,
    /// Left operand, evaluated first
    pub left: Box<Instruction>,
    /// Right operand
    pub right: Box<Instruction>,
}

/// Arithmetic negation: `-value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Negate {
    /// The negated value
    pub value: Box<Instruction>,
}

/// Type conversion or checked cast: `(T) value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    /// Target type descriptor
    pub descriptor: String,
    /// The converted value
    pub value: Box<Instruction>,
}

/// `value instanceof T`
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceOf {
    /// Tested type descriptor
    pub descriptor: String,
    /// The tested value
    pub value: Box<Instruction>,
}

/// Array construction: `new T[size]` or `new T[] {a, b, c}`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArray {
    /// Element type descriptor
    pub element: String,
    /// The size expression
    pub size: Box<Instruction>,
    /// Initializer values, when the array was filled right after construction
    pub initializer: Option<Vec<Instruction>>,
}

/// Constructor invocation: `new T(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct New {
    /// Descriptor of the constructed type
    pub descriptor: String,
    /// Descriptor of the invoked `<init>` method
    pub constructor: String,
    /// Constructor arguments in order
    pub args: Vec<Instruction>,
}

/// Virtual, interface or special invocation on a receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceMethodInvoke {
    /// The invoked method
    pub method: MethodRef,
    /// The receiver, evaluated before the arguments
    pub receiver: Box<Instruction>,
    /// Arguments in order
    pub args: Vec<Instruction>,
}

/// Static invocation: `Owner.name(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticMethodInvoke {
    /// The invoked method
    pub method: MethodRef,
    /// Arguments in order
    pub args: Vec<Instruction>,
}

/// Conditional expression: `condition ? true_value : false_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ternary {
    /// The selecting condition
    pub condition: Box<Condition>,
    /// Value when the condition holds
    pub true_value: Box<Instruction>,
    /// Value otherwise
    pub false_value: Box<Instruction>,
}

impl Ternary {
    /// Returns both branch types when they differ.
    ///
    /// [`Instruction::infer_type`] reports the true branch's type for a ternary;
    /// this exposes the information that choice drops.
    #[must_use]
    pub fn type_conflict(&self) -> Option<(String, String)> {
        let true_type = self.true_value.infer_type();
        let false_type = self.false_value.infer_type();
        (true_type != false_type).then_some((true_type, false_type))
    }
}

/// Raw three-way comparison of two values.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberCompare {
    /// Which comparison instruction
    pub kind: CompareKind,
    /// Left operand
    pub left: Box<Instruction>,
    /// Right operand
    pub right: Box<Instruction>,
}

/// Increment used as a value: `i++`, `++i`, `i += 2` inside an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementExpression {
    /// The incremented local
    pub local: LocalVariable,
    /// Signed increment amount
    pub amount: i32,
    /// `true` for `++i`, `false` for `i++`
    pub prefix: bool,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Literal
    Constant(Constant),
    /// Local variable read
    Local(LocalVariable),
    /// Instance field read
    InstanceField(InstanceFieldAccess),
    /// Static field read
    StaticField(StaticFieldAccess),
    /// Array element read
    ArrayAccess(ArrayAccess),
    /// Array length
    ArrayLength(ArrayLength),
    /// Binary operator
    Operator(Operator),
    /// Negation
    Negate(Negate),
    /// Cast or primitive conversion
    Cast(Cast),
    /// `instanceof`
    InstanceOf(InstanceOf),
    /// Array construction
    NewArray(NewArray),
    /// Constructor invocation
    New(New),
    /// Instance method invocation
    InstanceInvoke(InstanceMethodInvoke),
    /// Static method invocation
    StaticInvoke(StaticMethodInvoke),
    /// Conditional expression
    Ternary(Ternary),
    /// Raw three-way comparison
    Compare(NumberCompare),
    /// Pre- or post-increment
    Increment(IncrementExpression),
}

impl Instruction {
    /// Shorthand for an `int` literal.
    #[must_use]
    pub fn int(value: i32) -> Self {
        Instruction::Constant(Constant::Int(value))
    }

    /// Shorthand for a local read.
    #[must_use]
    pub fn local(local: LocalVariable) -> Self {
        Instruction::Local(local)
    }

    /// Builds a binary operator node.
    #[must_use]
    pub fn operator(kind: OperatorKind, left: Instruction, right: Instruction) -> Self {
        Instruction::Operator(Operator {
            kind,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Builds a ternary node.
    #[must_use]
    pub fn ternary(condition: Condition, true_value: Instruction, false_value: Instruction) -> Self {
        Instruction::Ternary(Ternary {
            condition: Box::new(condition),
            true_value: Box::new(true_value),
            false_value: Box::new(false_value),
        })
    }

    /// Returns the type descriptor of the value this node produces.
    ///
    /// Pure and idempotent. Binary operators report their left operand's type
    /// and ternaries their true branch's type, without numeric promotion or
    /// unification. See [`Ternary::type_conflict`].
    #[must_use]
    pub fn infer_type(&self) -> String {
        match self {
            Instruction::Constant(constant) => constant.infer_type(),
            Instruction::Local(local) => local.descriptor.clone(),
            Instruction::InstanceField(access) => access.field.descriptor.clone(),
            Instruction::StaticField(access) => access.field.descriptor.clone(),
            Instruction::ArrayAccess(access) => {
                let array_type = access.array.infer_type();
                descriptor::element_of(&array_type)
                    .unwrap_or(descriptor::OBJECT)
                    .to_string()
            }
            Instruction::ArrayLength(_) | Instruction::Compare(_) => descriptor::INT.to_string(),
            Instruction::Operator(op) => op.left.infer_type(),
            Instruction::Negate(neg) => neg.value.infer_type(),
            Instruction::Cast(cast) => cast.descriptor.clone(),
            Instruction::InstanceOf(_) => descriptor::BOOLEAN.to_string(),
            Instruction::NewArray(array) => descriptor::array_of(&array.element),
            Instruction::New(new) => new.descriptor.clone(),
            Instruction::InstanceInvoke(invoke) => invoke.method.return_type().to_string(),
            Instruction::StaticInvoke(invoke) => invoke.method.return_type().to_string(),
            Instruction::Ternary(ternary) => ternary.true_value.infer_type(),
            Instruction::Increment(inc) => inc.local.descriptor.clone(),
        }
    }

    /// Returns `true` if evaluating this expression may have side effects.
    ///
    /// Invocations, constructor calls and increments are effectful. Everything
    /// else is treated as pure, including array and field reads.
    #[must_use]
    pub fn has_side_effects(&self) -> bool {
        match self {
            Instruction::Constant(_)
            | Instruction::Local(_)
            | Instruction::StaticField(_) => false,
            Instruction::InstanceInvoke(_)
            | Instruction::StaticInvoke(_)
            | Instruction::New(_)
            | Instruction::Increment(_) => true,
            Instruction::InstanceField(access) => access.receiver.has_side_effects(),
            Instruction::ArrayAccess(access) => {
                access.array.has_side_effects() || access.index.has_side_effects()
            }
            Instruction::ArrayLength(len) => len.array.has_side_effects(),
            Instruction::Operator(op) => op.left.has_side_effects() || op.right.has_side_effects(),
            Instruction::Negate(neg) => neg.value.has_side_effects(),
            Instruction::Cast(cast) => cast.value.has_side_effects(),
            Instruction::InstanceOf(test) => test.value.has_side_effects(),
            Instruction::NewArray(array) => {
                array.size.has_side_effects()
                    || array
                        .initializer
                        .iter()
                        .flatten()
                        .any(Instruction::has_side_effects)
            }
            Instruction::Ternary(ternary) => {
                ternary.condition.has_side_effects()
                    || ternary.true_value.has_side_effects()
                    || ternary.false_value.has_side_effects()
            }
            Instruction::Compare(cmp) => cmp.left.has_side_effects() || cmp.right.has_side_effects(),
        }
    }

    /// Returns `true` if this expression reads the local in `slot`.
    #[must_use]
    pub fn references_local(&self, slot: u16) -> bool {
        struct Finder {
            slot: u16,
            found: bool,
        }

        impl InstructionVisitor for Finder {
            fn visit_local_access(&mut self, local: &LocalVariable) {
                self.found |= local.slot == self.slot;
            }

            fn visit_increment_expression(&mut self, inc: &IncrementExpression) {
                self.found |= inc.local.slot == self.slot;
            }
        }

        let mut finder = Finder { slot, found: false };
        self.accept(&mut finder);
        finder.found
    }

    /// Walks this node and its children with `visitor`.
    ///
    /// Pre-order: the node's own hook runs first, then children in source
    /// evaluation order (receiver before arguments, left before right, array
    /// size before initializer elements, condition before both ternary arms).
    pub fn accept<V: InstructionVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Instruction::Constant(constant) => visitor.visit_constant(constant),
            Instruction::Local(local) => visitor.visit_local_access(local),
            Instruction::InstanceField(access) => {
                visitor.visit_instance_field_access(access);
                access.receiver.accept(visitor);
            }
            Instruction::StaticField(access) => visitor.visit_static_field_access(access),
            Instruction::ArrayAccess(access) => {
                visitor.visit_array_access(access);
                access.array.accept(visitor);
                access.index.accept(visitor);
            }
            Instruction::ArrayLength(len) => {
                visitor.visit_array_length(len);
                len.array.accept(visitor);
            }
            Instruction::Operator(op) => {
                visitor.visit_operator(op);
                op.left.accept(visitor);
                op.right.accept(visitor);
            }
            Instruction::Negate(neg) => {
                visitor.visit_negate(neg);
                neg.value.accept(visitor);
            }
            Instruction::Cast(cast) => {
                visitor.visit_cast(cast);
                cast.value.accept(visitor);
            }
            Instruction::InstanceOf(test) => {
                visitor.visit_instance_of(test);
                test.value.accept(visitor);
            }
            Instruction::NewArray(array) => {
                visitor.visit_new_array(array);
                array.size.accept(visitor);
                for value in array.initializer.iter().flatten() {
                    value.accept(visitor);
                }
            }
            Instruction::New(new) => {
                visitor.visit_new(new);
                for arg in &new.args {
                    arg.accept(visitor);
                }
            }
            Instruction::InstanceInvoke(invoke) => {
                visitor.visit_instance_method_invoke(invoke);
                invoke.receiver.accept(visitor);
                for arg in &invoke.args {
                    arg.accept(visitor);
                }
            }
            Instruction::StaticInvoke(invoke) => {
                visitor.visit_static_method_invoke(invoke);
                for arg in &invoke.args {
                    arg.accept(visitor);
                }
            }
            Instruction::Ternary(ternary) => {
                visitor.visit_ternary(ternary);
                ternary.condition.accept(visitor);
                ternary.true_value.accept(visitor);
                ternary.false_value.accept(visitor);
            }
            Instruction::Compare(cmp) => {
                visitor.visit_number_compare(cmp);
                cmp.left.accept(visitor);
                cmp.right.accept(visitor);
            }
            Instruction::Increment(inc) => visitor.visit_increment_expression(inc),
        }
    }

    /// Rendering precedence; atoms are highest.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Instruction::Operator(op) => op.kind.precedence(),
            Instruction::Ternary(_) => 1,
            Instruction::InstanceOf(_) => 7,
            Instruction::Cast(_) | Instruction::Negate(_) => 12,
            _ => 15,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Instruction]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Constant(constant) => write!(f, "{constant}"),
            Instruction::Local(local) => f.write_str(&local.name),
            Instruction::InstanceField(access) => {
                access.receiver.fmt_operand(f, 15)?;
                write!(f, ".{}", access.field.name)
            }
            Instruction::StaticField(access) => write!(
                f,
                "{}.{}",
                descriptor::source_name(&descriptor::object(&access.field.owner)),
                access.field.name
            ),
            Instruction::ArrayAccess(access) => {
                access.array.fmt_operand(f, 15)?;
                write!(f, "[{}]", access.index)
            }
            Instruction::ArrayLength(len) => {
                len.array.fmt_operand(f, 15)?;
                f.write_str(".length")
            }
            Instruction::Operator(op) => {
                let own = op.kind.precedence();
                op.left.fmt_operand(f, own)?;
                write!(f, " {} ", op.kind)?;
                op.right.fmt_operand(f, own + 1)
            }
            Instruction::Negate(neg) => {
                f.write_str("-")?;
                neg.value.fmt_operand(f, 12)
            }
            Instruction::Cast(cast) => {
                write!(f, "({}) ", descriptor::source_name(&cast.descriptor))?;
                cast.value.fmt_operand(f, 12)
            }
            Instruction::InstanceOf(test) => {
                test.value.fmt_operand(f, 8)?;
                write!(f, " instanceof {}", descriptor::source_name(&test.descriptor))
            }
            Instruction::NewArray(array) => {
                let element = descriptor::source_name(&array.element);
                match &array.initializer {
                    Some(values) => {
                        write!(f, "new {element}[] {{")?;
                        write_args(f, values)?;
                        f.write_str("}")
                    }
                    None => write!(f, "new {element}[{}]", array.size),
                }
            }
            Instruction::New(new) => {
                write!(f, "new {}(", descriptor::source_name(&new.descriptor))?;
                write_args(f, &new.args)?;
                f.write_str(")")
            }
            Instruction::InstanceInvoke(invoke) => {
                invoke.receiver.fmt_operand(f, 15)?;
                write!(f, ".{}(", invoke.method.name)?;
                write_args(f, &invoke.args)?;
                f.write_str(")")
            }
            Instruction::StaticInvoke(invoke) => {
                write!(
                    f,
                    "{}.{}(",
                    descriptor::source_name(&descriptor::object(&invoke.method.owner)),
                    invoke.method.name
                )?;
                write_args(f, &invoke.args)?;
                f.write_str(")")
            }
            Instruction::Ternary(ternary) => {
                write!(f, "{} ? ", ternary.condition)?;
                ternary.true_value.fmt_operand(f, 2)?;
                f.write_str(" : ")?;
                ternary.false_value.fmt_operand(f, 1)
            }
            Instruction::Compare(cmp) => {
                let name = match cmp.kind {
                    CompareKind::Long => "lcmp",
                    CompareKind::FloatL => "fcmpl",
                    CompareKind::FloatG => "fcmpg",
                    CompareKind::DoubleL => "dcmpl",
                    CompareKind::DoubleG => "dcmpg",
                };
                write!(f, "{name}({}, {})", cmp.left, cmp.right)
            }
            Instruction::Increment(inc) => {
                let name = &inc.local.name;
                let suffix = match inc.amount {
                    1 => "++".to_string(),
                    -1 => "--".to_string(),
                    // A postfix read yields the value from before the update.
                    n if inc.prefix => {
                        let (op, amount) = if n < 0 { ('-', -i64::from(n)) } else { ('+', i64::from(n)) };
                        return write!(f, "({name} {op}= {amount})");
                    }
                    n => {
                        let (op, undo, amount) =
                            if n < 0 { ('-', '+', -i64::from(n)) } else { ('+', '-', i64::from(n)) };
                        return write!(f, "(({name} {op}= {amount}) {undo} {amount})");
                    }
                };
                if inc.prefix {
                    write!(f, "{suffix}{}", inc.local.name)
                } else {
                    write!(f, "{}{suffix}", inc.local.name)
                }
            }
        }
    }
}
