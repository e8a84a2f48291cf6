//! Structural invariants of emitted code, checked over a corpus of
//! representative programs: position coverage, label uniqueness and
//! closure, fresh-name hygiene, synthetic-variable cleanup, determinism,
//! serialization round-trips, and the stack discipline (statements net
//! zero, expressions net one), verified by a symbolic walk over the
//! instruction flow.

use num_bigint::BigInt;
use pebble::{
    Code, CodeLoc, CodeRange, Compiler, Def, DefLoc, Expr, ExprLoc, FieldBinding, Identifier,
    Messages, Op, Pattern, PatternLoc, Primitives, Program, Stmt, StmtLoc, SwitchBranch,
    SymbolTable,
};

// ============================================================================
// AST builders
// ============================================================================

fn pos(line: u32) -> CodeRange {
    CodeRange::new(CodeLoc::new(line, 1), CodeLoc::new(line, 60))
}

fn ident(name: &str) -> Identifier {
    Identifier::new(pos(1), name)
}

fn stmt(s: Stmt) -> StmtLoc {
    StmtLoc::new(pos(2), s)
}

fn expr(e: Expr) -> ExprLoc {
    ExprLoc::new(pos(2), e)
}

fn num(n: i64) -> ExprLoc {
    expr(Expr::ConstantNumber(BigInt::from(n)))
}

fn var(name: &str) -> ExprLoc {
    expr(Expr::Variable(ident(name)))
}

fn assign(name: &str, value: ExprLoc) -> Stmt {
    Stmt::AssignVariable {
        variable: ident(name),
        value,
    }
}

fn program_with(body: Stmt) -> Program {
    Program {
        position: pos(1),
        definitions: vec![DefLoc::new(pos(1), Def::Program { body: stmt(body) })],
    }
}

/// The symbol table shared by every corpus program.
fn corpus_symbols() -> SymbolTable {
    let mut symbols = SymbolTable::new();
    symbols.declare_constructor("North", "Dir", Vec::<String>::new());
    symbols.declare_constructor("South", "Dir", Vec::<String>::new());
    symbols.declare_constructor("Coord", "Position", ["x", "y"]);
    symbols
}

/// Representative programs covering every implemented lowering, paired
/// with the stack depth expected when a `Return` instruction executes.
fn corpus() -> Vec<(&'static str, Program, i64)> {
    let structure_branch = SwitchBranch::new(
        PatternLoc::new(
            pos(4),
            Pattern::Structure {
                constructor: ident("Coord"),
                params: vec![ident("a"), ident("b")],
            },
        ),
        stmt(assign("sum", var("a"))),
    );
    let tuple_branch = SwitchBranch::new(
        PatternLoc::new(
            pos(5),
            Pattern::Tuple {
                params: vec![ident("p"), ident("q")],
            },
        ),
        stmt(assign("sum", var("p"))),
    );
    let wildcard_branch = SwitchBranch::new(
        PatternLoc::new(pos(6), Pattern::Wildcard),
        stmt(Stmt::Block(vec![])),
    );

    vec![
        ("assign_literal", program_with(assign("x", num(42))), 0),
        (
            "assign_structure",
            program_with(assign(
                "p",
                expr(Expr::Structure {
                    constructor: ident("Coord"),
                    fields: vec![
                        FieldBinding::new(ident("x"), num(1)),
                        FieldBinding::new(ident("y"), num(2)),
                    ],
                }),
            )),
            0,
        ),
        (
            "assign_nested_collections",
            program_with(assign(
                "x",
                expr(Expr::List(vec![
                    expr(Expr::Tuple(vec![num(1), num(2)])),
                    expr(Expr::Tuple(vec![num(3), num(4)])),
                ])),
            )),
            0,
        ),
        (
            "assign_tuple",
            program_with(Stmt::AssignTuple {
                variables: vec![ident("a"), ident("b"), ident("c")],
                value: var("triple"),
            }),
            0,
        ),
        (
            "primitive_procedure_call",
            program_with(Stmt::ProcedureCall {
                procedure: ident("PutStone"),
                args: vec![var("d")],
            }),
            0,
        ),
        (
            "if_without_else",
            program_with(Stmt::If {
                condition: var("b"),
                then_branch: Box::new(stmt(assign("x", num(1)))),
                else_branch: None,
            }),
            0,
        ),
        (
            "if_with_else",
            program_with(Stmt::If {
                condition: var("b"),
                then_branch: Box::new(stmt(assign("x", num(1)))),
                else_branch: Some(Box::new(stmt(assign("x", num(2))))),
            }),
            0,
        ),
        (
            "while_loop",
            program_with(Stmt::While {
                condition: var("b"),
                body: Box::new(stmt(assign("x", num(0)))),
            }),
            0,
        ),
        (
            "repeat_loop",
            program_with(Stmt::Repeat {
                times: expr(Expr::FunctionCall {
                    function: ident("+"),
                    args: vec![num(1), num(2)],
                }),
                body: Box::new(stmt(assign("x", num(0)))),
            }),
            0,
        ),
        (
            "foreach_loop",
            program_with(Stmt::Foreach {
                index: ident("i"),
                range: var("xs"),
                body: Box::new(stmt(assign("y", var("i")))),
            }),
            0,
        ),
        (
            "switch_multi_branch",
            program_with(Stmt::Switch {
                subject: var("v"),
                branches: vec![structure_branch, tuple_branch, wildcard_branch],
            }),
            0,
        ),
        (
            "nested_loops",
            program_with(Stmt::Foreach {
                index: ident("i"),
                range: var("xs"),
                body: Box::new(stmt(Stmt::While {
                    condition: var("b"),
                    body: Box::new(stmt(Stmt::If {
                        condition: var("c"),
                        then_branch: Box::new(stmt(Stmt::Repeat {
                            times: var("i"),
                            body: Box::new(stmt(assign("x", num(0)))),
                        })),
                        else_branch: None,
                    })),
                })),
            }),
            0,
        ),
        (
            "explicit_return",
            program_with(Stmt::Return(expr(Expr::FunctionCall {
                function: ident("+"),
                args: vec![var("x"), num(1)],
            }))),
            1,
        ),
    ]
}

fn compile(program: &Program) -> Code {
    Compiler::compile(program, &corpus_symbols(), &Primitives::new(), &Messages::new())
        .expect("corpus programs compile")
}

// ============================================================================
// Symbolic stack walk
// ============================================================================

/// Walks the instruction flow, tracking stack depth before every
/// instruction. Checks that no instruction underflows, that control-flow
/// merges agree on the depth, and that every reachable `Return` executes
/// at `return_depth`. Returns the depth before each instruction (`None`
/// for unreachable ones).
fn check_stack(code: &Code, return_depth: i64) -> Vec<Option<i64>> {
    let instrs: Vec<&Op> = code.ops().collect();
    let label_index = |name: &pebble::Label| {
        instrs
            .iter()
            .position(|op| matches!(op, Op::Label(l) if l == name))
            .unwrap_or_else(|| panic!("jump to unknown label {name}"))
    };
    let primitives = Primitives::new();

    let mut depths: Vec<Option<i64>> = vec![None; instrs.len()];
    let mut worklist = vec![(0usize, 0i64)];

    while let Some((index, depth)) = worklist.pop() {
        assert!(index < instrs.len(), "control flow ran off the end");
        match depths[index] {
            Some(seen) => {
                assert_eq!(seen, depth, "depth mismatch at instruction {index}: {}", instrs[index]);
                continue;
            }
            None => depths[index] = Some(depth),
        }

        let op = instrs[index];
        let pops: i64;
        let pushes: i64;
        match op {
            Op::Label(_) => {
                pops = 0;
                pushes = 0;
            }
            Op::Jump(target) => {
                worklist.push((label_index(target), depth));
                continue;
            }
            Op::JumpIfFalse(target) => {
                assert!(depth >= 1, "JumpIfFalse underflow at {index}");
                worklist.push((label_index(target), depth - 1));
                worklist.push((index + 1, depth - 1));
                continue;
            }
            // Non-popping structure/tuple tests.
            Op::JumpIfStructure(_, target) | Op::JumpIfTuple(_, target) => {
                assert!(depth >= 1, "structure test on empty stack at {index}");
                worklist.push((label_index(target), depth));
                worklist.push((index + 1, depth));
                continue;
            }
            Op::Return => {
                assert_eq!(depth, return_depth, "Return at unexpected depth");
                continue;
            }
            Op::PrimitiveCall(name, nargs) => {
                if name == "_FAIL" {
                    // Aborts execution; no successor.
                    assert!(depth >= *nargs as i64, "_FAIL underflow at {index}");
                    continue;
                }
                pops = *nargs as i64;
                pushes = i64::from(primitives.is_function(name));
            }
            Op::PushInteger(_) | Op::PushString(_) | Op::PushVariable(_) => {
                pops = 0;
                pushes = 1;
            }
            Op::SetVariable(_) => {
                pops = 1;
                pushes = 0;
            }
            Op::UnsetVariable(_) | Op::SaveState | Op::RestoreState => {
                pops = 0;
                pushes = 0;
            }
            Op::TypeCheck(_) => {
                assert!(depth >= 1, "TypeCheck on empty stack at {index}");
                pops = 0;
                pushes = 0;
            }
            Op::Dup => {
                pops = 1;
                pushes = 2;
            }
            Op::Pop => {
                pops = 1;
                pushes = 0;
            }
            Op::Add => {
                pops = 2;
                pushes = 1;
            }
            Op::MakeTuple(size) | Op::MakeList(size) => {
                pops = *size as i64;
                pushes = 1;
            }
            Op::MakeStructure { field_names, .. } => {
                pops = field_names.len() as i64;
                pushes = 1;
            }
            Op::UpdateStructure { field_names, .. } => {
                pops = field_names.len() as i64 + 1;
                pushes = 1;
            }
            // Non-popping reads push the component they read.
            Op::ReadTupleComponent(_) | Op::ReadStructureField(_) => {
                assert!(depth >= 1, "read on empty stack at {index}");
                pops = 0;
                pushes = 1;
            }
            Op::Call(_, nargs) => {
                pops = *nargs as i64;
                pushes = 1;
            }
        }

        assert!(depth >= pops, "stack underflow at instruction {index}: {op}");
        worklist.push((index + 1, depth - pops + pushes));
    }

    depths
}

fn is_synthetic(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn every_instruction_carries_a_position() {
    for (name, program, _) in corpus() {
        let code = compile(&program);
        for instr in &code {
            assert!(
                instr.position.start().line > 0 && instr.position.end().line > 0,
                "{name}: instruction without a position: {}",
                instr.op
            );
        }
    }
}

#[test]
fn labels_are_unique() {
    for (name, program, _) in corpus() {
        let code = compile(&program);
        let mut seen = Vec::new();
        for op in code.ops() {
            if let Op::Label(label) = op {
                assert!(!seen.contains(&label), "{name}: duplicate label {label}");
                seen.push(label);
            }
        }
    }
}

#[test]
fn every_jump_targets_an_emitted_label() {
    for (name, program, _) in corpus() {
        let code = compile(&program);
        let labels: Vec<&pebble::Label> = code
            .ops()
            .filter_map(|op| match op {
                Op::Label(label) => Some(label),
                _ => None,
            })
            .collect();
        for op in code.ops() {
            let target = match op {
                Op::Jump(t) | Op::JumpIfFalse(t) | Op::JumpIfStructure(_, t) | Op::JumpIfTuple(_, t) => t,
                Op::Call(t, _) => t,
                _ => continue,
            };
            assert!(labels.contains(&target), "{name}: dangling jump target {target}");
        }
    }
}

#[test]
fn generated_names_stay_in_the_reserved_namespace() {
    for (name, program, _) in corpus() {
        let code = compile(&program);
        for op in code.ops() {
            match op {
                Op::Label(label) => {
                    assert!(
                        is_synthetic(label.as_str(), "_l"),
                        "{name}: label outside the reserved namespace: {label}"
                    );
                }
                Op::SetVariable(var) | Op::UnsetVariable(var) | Op::PushVariable(var) => {
                    // Variables are either user spellings (no underscore)
                    // or synthetic `_v{N}` names, never anything else.
                    assert!(
                        !var.starts_with('_') || is_synthetic(var, "_v"),
                        "{name}: malformed synthetic variable: {var}"
                    );
                }
                _ => {}
            }
        }
    }
}

#[test]
fn synthetic_variables_are_unset_after_use() {
    for (name, program, _) in corpus() {
        let code = compile(&program);
        let ops: Vec<&Op> = code.ops().collect();
        for (index, op) in ops.iter().enumerate() {
            if let Op::SetVariable(var) = op {
                if is_synthetic(var, "_v") {
                    let cleaned = ops[index..]
                        .iter()
                        .any(|later| matches!(later, Op::UnsetVariable(v) if v == var));
                    assert!(cleaned, "{name}: synthetic variable {var} never unset");
                }
            }
        }
    }
}

#[test]
fn stack_discipline_holds_across_the_corpus() {
    for (name, program, return_depth) in corpus() {
        let code = compile(&program);
        let depths = check_stack(&code, return_depth);
        // The entry instruction is always reachable.
        assert_eq!(depths.first().copied().flatten(), Some(0), "{name}: entry depth");
    }
}

#[test]
fn expressions_push_exactly_one_value() {
    // Expression lowerings net +1: by the time `x := <expr>` reaches its
    // SetVariable, exactly the expression's value is on the stack.
    let shapes: Vec<(&str, ExprLoc)> = vec![
        ("number", num(42)),
        ("string", expr(Expr::ConstantString("hi".to_owned()))),
        ("variable", var("y")),
        ("list", expr(Expr::List(vec![num(1), num(2), num(3)]))),
        ("tuple", expr(Expr::Tuple(vec![num(1), var("y")]))),
        (
            "structure",
            expr(Expr::Structure {
                constructor: ident("Coord"),
                fields: vec![
                    FieldBinding::new(ident("x"), num(1)),
                    FieldBinding::new(ident("y"), num(2)),
                ],
            }),
        ),
        (
            "call",
            expr(Expr::FunctionCall {
                function: ident("+"),
                args: vec![num(1), var("y")],
            }),
        ),
        (
            "nested",
            expr(Expr::List(vec![expr(Expr::Tuple(vec![
                num(1),
                expr(Expr::FunctionCall {
                    function: ident("-"),
                    args: vec![var("y"), num(1)],
                }),
            ]))])),
        ),
    ];

    for (name, value) in shapes {
        let program = program_with(assign("x", value));
        let code = compile(&program);
        let depths = check_stack(&code, 0);
        let set_at = code
            .ops()
            .position(|op| matches!(op, Op::SetVariable(var) if var == "x"))
            .expect("assignment emits a SetVariable");
        assert_eq!(depths[set_at], Some(1), "{name}: SetVariable at depth other than 1");
    }
}

#[test]
fn compilation_is_deterministic() {
    for (name, program, _) in corpus() {
        let first = compile(&program);
        let second = compile(&program);
        assert_eq!(first, second, "{name}: recompilation diverged");
    }
}

#[test]
fn code_survives_a_serde_round_trip() {
    for (name, program, _) in corpus() {
        let code = compile(&program);
        let json = serde_json::to_string(&code).expect("serialize");
        let back: Code = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(code, back, "{name}: serde round trip changed the code");
    }
}

#[test]
fn listing_has_one_line_per_instruction() {
    let (_, program, _) = corpus().remove(0);
    let code = compile(&program);
    assert_eq!(code.to_string().lines().count(), code.len());
}
