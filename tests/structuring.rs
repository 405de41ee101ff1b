//! Structuring integration tests.
//!
//! Each test builds a method body in the block layout javac produces, runs it
//! through the public structuring entry point and checks the rendered source:
//! 1. Conditional values and assignments collapsing into ternaries
//! 2. Short-circuit conditions folded from chains of test blocks
//! 3. `while`, `for`, `do-while` and `continue` recovered from loops
//! 4. Dominator and loop facts exposed by the control flow graph
//! 5. Read-only walks over the recovered tree

use classcope::{
    analysis::ControlFlowGraph,
    ast::{
        Assignment, CompareCondition, CompoundAssignment, ForLoop, IncrementStatement,
        InstructionVisitor,
    },
    prelude::*,
};

const OWNER: &str = "demo/T";

fn method(name: &str, desc: &str) -> MethodBuilder {
    MethodBuilder::new(OWNER, name, desc).access(MethodAccess::PUBLIC | MethodAccess::STATIC)
}

fn call(builder: MethodBuilder, name: &str, desc: &str) -> MethodBuilder {
    builder.invoke(InvokeKind::Static, OWNER, name, desc)
}

fn structure_with(config: DecompilerConfig, method: &MethodBody) -> Result<StructuredBody> {
    structure_method(&StructuringContext::new(TypeDatabase::new(), config), method)
}

/// Structures with the default configuration and renders the body.
fn render(method: &MethodBody) -> Result<String> {
    let structured = structure_with(DecompilerConfig::default(), method)?;
    assert!(!structured.fallback, "unexpected fallback:\n{}", structured.body);
    Ok(structured.body.to_string())
}

/// `int max(int a, int b) { return a > b ? a : b; }`
fn max() -> Result<MethodBody> {
    method("max", "(II)I")
        .local(0, "a", "I")
        .local(1, "b", "I")
        .load(0, "I")
        .load(1, "I")
        .if_cmp(CompareOp::Le, 2, 1)
        .load(0, "I")
        .goto(3)
        .load(1, "I")
        .goto(3)
        .ret_value()
        .build()
}

/// `if (a > 0) { r = 1; } else { [log();] r = 2; } return r;`
fn choose(log_in_else: bool) -> Result<MethodBody> {
    let builder = method("choose", "(I)I")
        .local(0, "a", "I")
        .local(1, "r", "I")
        .load(0, "I")
        .if_zero(CompareOp::Le, 2, 1)
        .iconst(1)
        .store(1, "I")
        .goto(3);
    let builder = if log_in_else {
        call(builder, "log", "()V")
    } else {
        builder
    };
    builder
        .iconst(2)
        .store(1, "I")
        .goto(3)
        .load(1, "I")
        .ret_value()
        .build()
}

/// Three boolean parameters `a`, `b`, `c`.
fn three_flags(name: &str) -> MethodBuilder {
    method(name, "(ZZZ)V")
        .local(0, "a", "Z")
        .local(1, "b", "Z")
        .local(2, "c", "Z")
}

#[test]
fn test_value_ternary() -> Result<()> {
    assert_eq!(render(&max()?)?, "return a > b ? a : b;\n");
    Ok(())
}

#[test]
fn test_value_ternary_disabled_is_unstructurable() -> Result<()> {
    let result = structure_with(DecompilerConfig::default().with_ternaries(false), &max()?);
    assert!(matches!(result, Err(Error::Unstructurable(_))));
    Ok(())
}

#[test]
fn test_assignment_ternary() -> Result<()> {
    assert_eq!(render(&choose(false)?)?, "r = a > 0 ? 1 : 2;\nreturn r;\n");
    Ok(())
}

#[test]
fn test_side_effect_arm_stays_if_else() -> Result<()> {
    assert_eq!(
        render(&choose(true)?)?,
        "if (a > 0) {\n    r = 1;\n} else {\n    demo.T.log();\n    r = 2;\n}\nreturn r;\n"
    );
    Ok(())
}

#[test]
fn test_short_circuit_or() -> Result<()> {
    // if (a || b) { g(); }
    let builder = method("f", "(ZZ)V")
        .local(0, "a", "Z")
        .local(1, "b", "Z")
        .load(0, "Z")
        .if_zero(CompareOp::Ne, 2, 1)
        .load(1, "Z")
        .if_zero(CompareOp::Eq, 3, 2);
    let body = call(builder, "g", "()V").goto(3).ret().build()?;

    assert_eq!(render(&body)?, "if (a || b) {\n    demo.T.g();\n}\n");
    Ok(())
}

#[test]
fn test_short_circuit_three_way_or() -> Result<()> {
    // if (a || b || c) { g(); }
    let builder = three_flags("f")
        .load(0, "Z")
        .if_zero(CompareOp::Ne, 3, 1)
        .load(1, "Z")
        .if_zero(CompareOp::Ne, 3, 2)
        .load(2, "Z")
        .if_zero(CompareOp::Eq, 4, 3);
    let body = call(builder, "g", "()V").goto(4).ret().build()?;

    assert_eq!(render(&body)?, "if (a || b || c) {\n    demo.T.g();\n}\n");
    Ok(())
}

#[test]
fn test_short_circuit_or_inside_and() -> Result<()> {
    // if ((a || b) && c) { g(); }
    let builder = three_flags("f")
        .load(0, "Z")
        .if_zero(CompareOp::Ne, 2, 1)
        .load(1, "Z")
        .if_zero(CompareOp::Eq, 4, 2)
        .load(2, "Z")
        .if_zero(CompareOp::Eq, 4, 3);
    let body = call(builder, "g", "()V").goto(4).ret().build()?;

    assert_eq!(render(&body)?, "if ((a || b) && c) {\n    demo.T.g();\n}\n");
    Ok(())
}

#[test]
fn test_counting_loop_end_to_end() -> Result<()> {
    // for (int i = 0; i < 10; i++) { sum += i; }
    let body = method("f", "()V")
        .local(0, "i", "I")
        .iconst(0)
        .store(0, "I")
        .goto(1)
        .load(0, "I")
        .iconst(10)
        .if_cmp(CompareOp::Ge, 3, 2)
        .get_static(OWNER, "sum", "I")
        .load(0, "I")
        .binary(OperatorKind::Add, "I")
        .put_static(OWNER, "sum", "I")
        .iinc(0, 1)
        .goto(1)
        .ret()
        .build()?;
    let structured = structure_with(DecompilerConfig::default(), &body)?;

    assert_eq!(structured.body.kind(), BlockKind::Method);
    assert_eq!(structured.body.len(), 1);
    match structured.body.get(0) {
        Some(Statement::For(for_loop)) => {
            assert_eq!(for_loop.body.len(), 1);
            assert!(matches!(
                for_loop.body.get(0),
                Some(Statement::CompoundAssignment(_))
            ));
        }
        other => panic!("expected a for loop, got {other:?}"),
    }
    assert_eq!(
        structured.body.to_string(),
        "for (int i = 0; i < 10; i++) {\n    demo.T.sum += i;\n}\n"
    );
    Ok(())
}

#[test]
fn test_loop_without_update_stays_while() -> Result<()> {
    // int i = 0; while (i < n) { work(); }
    let builder = method("f", "(I)V")
        .local(0, "n", "I")
        .local(1, "i", "I")
        .iconst(0)
        .store(1, "I")
        .goto(1)
        .load(1, "I")
        .load(0, "I")
        .if_cmp(CompareOp::Ge, 3, 2);
    let body = call(builder, "work", "()V").goto(1).ret().build()?;

    assert_eq!(
        render(&body)?,
        "i = 0;\nwhile (i < n) {\n    demo.T.work();\n}\n"
    );
    Ok(())
}

#[test]
fn test_do_while() -> Result<()> {
    // do { work(); } while (n > 0);
    let builder = method("f", "(I)V").local(0, "n", "I").goto(1);
    let body = call(builder, "work", "()V")
        .load(0, "I")
        .if_zero(CompareOp::Gt, 1, 2)
        .ret()
        .build()?;

    assert_eq!(
        render(&body)?,
        "do {\n    demo.T.work();\n} while (n > 0);\n"
    );
    Ok(())
}

#[test]
fn test_continue_and_early_return() -> Result<()> {
    // while (n > 0) { if (skip()) continue; work(); if (n == 0) return; n--; }
    let builder = method("f", "(I)V")
        .local(0, "n", "I")
        .goto(1) // 0
        .load(0, "I")
        .if_zero(CompareOp::Le, 6, 2); // 1
    let builder = call(builder, "skip", "()Z").if_zero(CompareOp::Ne, 1, 3); // 2
    let body = call(builder, "work", "()V")
        .load(0, "I")
        .if_zero(CompareOp::Ne, 5, 4) // 3
        .ret() // 4
        .iinc(0, -1)
        .goto(1) // 5
        .ret() // 6
        .build()?;

    assert_eq!(
        render(&body)?,
        "while (n > 0) {\n    if (demo.T.skip()) {\n        continue;\n    }\n    demo.T.work();\n    if (n == 0) {\n        return;\n    }\n    n--;\n}\n"
    );
    Ok(())
}

#[test]
fn test_post_increment_by_two_yields_old_value() -> Result<()> {
    // return i += 2 as a postfix read
    let body = method("f", "(I)I")
        .local(0, "i", "I")
        .load(0, "I")
        .iinc(0, 2)
        .ret_value()
        .build()?;

    assert_eq!(render(&body)?, "return ((i += 2) - 2);\n");
    Ok(())
}

#[test]
fn test_sparse_array_initializer_keeps_length() -> Result<()> {
    // return new int[] {7, 0, 0}; with the zero stores skipped
    let body = method("f", "()[I")
        .iconst(3)
        .insn(Insn::NewArray { element: "I".into() })
        .dup()
        .iconst(0)
        .iconst(7)
        .insn(Insn::ArrayStore { ty: "I".into() })
        .ret_value()
        .build()?;

    assert_eq!(render(&body)?, "return new int[] {7, 0, 0};\n");
    Ok(())
}

#[test]
fn test_locked_body_rejects_mutation() -> Result<()> {
    let mut body = structure_with(DecompilerConfig::default(), &max()?)?.body;
    let before = body.len();

    assert!(matches!(
        body.append(Statement::Break),
        Err(Error::InvalidContainerMutation(_))
    ));
    assert!(matches!(
        body.pop_last(),
        Err(Error::InvalidContainerMutation(_))
    ));
    assert_eq!(body.len(), before);

    let mut copy = body.copy();
    assert!(!copy.is_locked());
    copy.append(Statement::Break)?;
    assert_eq!(body.len(), before);
    assert_eq!(copy.len(), before + 1);
    Ok(())
}

#[test]
fn test_diamond_dominators() -> Result<()> {
    let builder = method("f", "(I)V")
        .local(0, "n", "I")
        .load(0, "I")
        .if_zero(CompareOp::Eq, 2, 1);
    let builder = call(builder, "a", "()V").goto(3);
    let body = call(builder, "b", "()V").goto(3).ret().build()?;
    let cfg = ControlFlowGraph::from_blocks_ref(&body.blocks)?;
    let (entry, left, right, join) = (NodeId::new(0), NodeId::new(1), NodeId::new(2), NodeId::new(3));

    assert!(cfg.dominates(entry, join));
    assert!(!cfg.dominates(left, join));
    assert!(!cfg.dominates(right, join));
    assert_eq!(cfg.dominators().immediate_dominator(join), Some(entry));
    assert_eq!(cfg.ipdom(entry), Some(join));
    assert!(cfg.post_dominators().post_dominates(join, left));
    assert!(cfg.loops().is_empty());
    assert!(cfg.is_reducible());
    Ok(())
}

#[test]
fn test_natural_loop_detection() -> Result<()> {
    let builder = method("f", "(I)V")
        .local(0, "n", "I")
        .goto(1)
        .load(0, "I")
        .if_zero(CompareOp::Le, 3, 2);
    let body = call(builder, "work", "()V").goto(1).ret().build()?;
    let cfg = ControlFlowGraph::from_blocks_ref(&body.blocks)?;

    assert_eq!(cfg.loops().len(), 1);
    let info = cfg
        .loops()
        .loop_for_header(NodeId::new(1))
        .expect("loop at block 1");
    assert!(info.contains(NodeId::new(2)));
    assert!(!info.contains(NodeId::new(3)));
    assert_eq!(info.single_latch(), Some(NodeId::new(2)));
    Ok(())
}

#[derive(Default)]
struct Trace(Vec<&'static str>);

impl InstructionVisitor for Trace {
    fn visit_assignment(&mut self, _: &Assignment) {
        self.0.push("assign");
    }

    fn visit_compound_assignment(&mut self, _: &CompoundAssignment) {
        self.0.push("compound");
    }

    fn visit_increment_statement(&mut self, _: &IncrementStatement) {
        self.0.push("increment");
    }

    fn visit_compare_condition(&mut self, _: &CompareCondition) {
        self.0.push("compare");
    }

    fn visit_for_loop(&mut self, _: &ForLoop) {
        self.0.push("for");
    }

    fn visit_return(&mut self, _: Option<&Instruction>) {
        self.0.push("return");
    }
}

#[test]
fn test_visitor_walks_for_loop_in_source_order() -> Result<()> {
    // int s = 0; for (int i = 0; i < n; i++) { s += i; } return s;
    let body = method("sum", "(I)I")
        .local(0, "n", "I")
        .local(1, "s", "I")
        .local(2, "i", "I")
        .iconst(0)
        .store(1, "I")
        .iconst(0)
        .store(2, "I")
        .goto(1)
        .load(2, "I")
        .load(0, "I")
        .if_cmp(CompareOp::Ge, 3, 2)
        .load(1, "I")
        .load(2, "I")
        .binary(OperatorKind::Add, "I")
        .store(1, "I")
        .iinc(2, 1)
        .goto(1)
        .load(1, "I")
        .ret_value()
        .build()?;
    let structured = structure_with(DecompilerConfig::default(), &body)?;

    let mut trace = Trace::default();
    structured.body.accept(&mut trace);
    assert_eq!(
        trace.0,
        ["assign", "for", "assign", "compare", "increment", "compound", "return"]
    );
    Ok(())
}
