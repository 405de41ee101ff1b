//! Method bodies in the block layout javac produces, shared by the unit tests.
//!
//! Every fixture is a static method of `demo/T` whose helper calls go to
//! static methods of the same class.

use crate::{
    ast::{CompareOp, OperatorKind},
    bytecode::{InvokeKind, MethodAccess, MethodBody, MethodBuilder},
};

pub const OWNER: &str = "demo/T";

fn method(name: &str, desc: &str) -> MethodBuilder {
    MethodBuilder::new(OWNER, name, desc).access(MethodAccess::PUBLIC | MethodAccess::STATIC)
}

fn call(builder: MethodBuilder, name: &str, desc: &str) -> MethodBuilder {
    builder.invoke(InvokeKind::Static, OWNER, name, desc)
}

/// `int sum(int n) { int s = 0; for (int i = 0; i < n; i++) { s += i; } return s; }`
pub fn counting_loop() -> MethodBody {
    method("sum", "(I)I")
        .local(0, "n", "I")
        .local(1, "s", "I")
        .local(2, "i", "I")
        .iconst(0)
        .store(1, "I")
        .iconst(0)
        .store(2, "I")
        .goto(1) // 0
        .load(2, "I")
        .load(0, "I")
        .if_cmp(CompareOp::Ge, 3, 2) // 1
        .load(1, "I")
        .load(2, "I")
        .binary(OperatorKind::Add, "I")
        .store(1, "I")
        .iinc(2, 1)
        .goto(1) // 2
        .load(1, "I")
        .ret_value() // 3
        .build()
        .unwrap()
}

/// `void f(boolean a, boolean b) { if (a && b) { g(); } }`
pub fn short_circuit_and() -> MethodBody {
    let builder = method("f", "(ZZ)V")
        .local(0, "a", "Z")
        .local(1, "b", "Z")
        .load(0, "Z")
        .if_zero(CompareOp::Eq, 3, 1) // 0
        .load(1, "Z")
        .if_zero(CompareOp::Eq, 3, 2); // 1
    call(builder, "g", "()V")
        .goto(3) // 2
        .ret() // 3
        .build()
        .unwrap()
}

/// `void f(int k) { switch (k) { case 1: case 2: a(); break; case 3: b(); default: c(); } }`
pub fn fallthrough_switch() -> MethodBody {
    let builder = method("f", "(I)V")
        .local(0, "k", "I")
        .load(0, "I")
        .switch(&[(1, 1), (2, 1), (3, 2)], 3); // 0
    let builder = call(builder, "a", "()V").goto(4); // 1
    let builder = call(builder, "b", "()V").goto(3); // 2
    call(builder, "c", "()V")
        .goto(4) // 3
        .ret() // 4
        .build()
        .unwrap()
}

/// `void f() { while (true) { work(); if (check()) break; more(); } }`
pub fn endless_loop_with_break() -> MethodBody {
    let builder = call(method("f", "()V"), "work", "()V");
    let builder = call(builder, "check", "()Z")
        .if_zero(CompareOp::Eq, 2, 1) // 0
        .goto(3); // 1
    call(builder, "more", "()V")
        .goto(0) // 2
        .ret() // 3
        .build()
        .unwrap()
}

/// A loop entered both at its top and in its middle.
pub fn irreducible() -> MethodBody {
    let builder = method("f", "(I)V")
        .local(0, "n", "I")
        .load(0, "I")
        .if_zero(CompareOp::Eq, 2, 1); // 0
    let builder = call(builder, "work", "()V").goto(2); // 1
    call(builder, "more", "()V")
        .load(0, "I")
        .if_zero(CompareOp::Ne, 1, 3) // 2
        .ret() // 3
        .build()
        .unwrap()
}

/// `do { work(); } while (n > 0);`
pub fn do_while_loop() -> MethodBody {
    let builder = method("f", "(I)V").local(0, "n", "I").goto(1); // 0
    call(builder, "work", "()V")
        .load(0, "I")
        .if_zero(CompareOp::Gt, 1, 2) // 1
        .ret() // 2
        .build()
        .unwrap()
}

/// A counting loop followed by a loop entered both at its top and in its
/// middle.
pub fn loop_then_irreducible() -> MethodBody {
    let builder = method("f", "(I)V")
        .local(0, "n", "I")
        .local(1, "i", "I")
        .iconst(0)
        .store(1, "I")
        .goto(1) // 0
        .load(1, "I")
        .load(0, "I")
        .if_cmp(CompareOp::Ge, 3, 2); // 1
    let builder = call(builder, "work", "()V").iinc(1, 1).goto(1) // 2
        .load(0, "I")
        .if_zero(CompareOp::Eq, 5, 4); // 3
    let builder = call(builder, "a", "()V").goto(5); // 4
    call(builder, "b", "()V")
        .load(0, "I")
        .if_zero(CompareOp::Ne, 4, 6) // 5
        .ret() // 6
        .build()
        .unwrap()
}
