// Copyright (c) 2017-2021 Fabian Schuiki

#[macro_use]
extern crate indoc;

use sccp::{
    assembly::{parse_module, write_string},
    ir::prelude::*,
    opt::prelude::*,
    pass::sccp::{
        analyze, transform, CfgEdge, Changes, ConstantValue, PhiRepair, SccpOptions,
        SccpResult, WorklistOrder,
    },
    pass::SparseCondConstProp,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn parse(input: &str) -> Module {
    init();
    let module = parse_module(input).unwrap();
    for func in module.functions() {
        func.verify().unwrap();
    }
    module
}

fn only_function(module: &Module) -> &Function {
    module.functions().next().unwrap()
}

fn fact(func: &Function, result: &SccpResult, name: &str) -> Option<ConstantValue> {
    result.fact(func.find_value(name).unwrap())
}

fn edge(func: &Function, from: &str, to: &str) -> CfgEdge {
    CfgEdge::new(func.find_block(from).unwrap(), func.find_block(to).unwrap())
}

/// Run the analysis and transform on the single function of a module.
fn optimize(input: &str, opts: &SccpOptions) -> (Module, Changes) {
    let mut module = parse(input);
    let name = only_function(&module).name().to_owned();
    let changes = {
        let func = module.function_by_name_mut(&name).unwrap();
        let result = analyze(func, opts);
        let mut builder = FunctionBuilder::new(func);
        transform(&mut builder, &result, opts)
    };
    (module, changes)
}

fn all_orders() -> Vec<SccpOptions> {
    use WorklistOrder::*;
    let mut opts = vec![];
    for &cfg_order in &[Ascending, Descending] {
        for &ssa_order in &[Ascending, Descending] {
            opts.push(SccpOptions {
                cfg_order,
                ssa_order,
                ..Default::default()
            });
        }
    }
    opts
}

fn straight_line() -> &'static str {
    indoc! {"
        func @a () i32 {
        %entry:
            %x = add i32 2, 3
            %y = mul i32 %x, 4
            ret i32 %y
        }
    "}
}

fn constant_branch() -> &'static str {
    indoc! {"
        func @b (i32 %a) i32 {
        %entry:
            %c = slt i32 1, 2
            br %c, %then, %else
        %then:
            br %join
        %else:
            br %join
        %join:
            %p = phi i32 [%a, %then], [7, %else]
            ret i32 %p
        }
    "}
}

fn unknown_branch() -> &'static str {
    indoc! {"
        func @c (i32 %a, i32 %k) i32 {
        %entry:
            %c = slt i32 %a, 10
            br %c, %then, %else
        %then:
            br %join
        %else:
            br %join
        %join:
            %p = phi i32 [5, %then], [%k, %else]
            %q = phi i32 [5, %then], [5, %else]
            ret i32 %p
        }
    "}
}

fn counting_loop() -> &'static str {
    indoc! {"
        func @d (i32 %n) i32 {
        %entry:
            br %loop
        %loop:
            %i = phi i32 [0, %entry], [%next, %body]
            %c = slt i32 %i, 100
            br %c, %body, %exit
        %body:
            %next = add i32 %i, 1
            br %loop
        %exit:
            ret i32 %i
        }
    "}
}

fn nested_branches() -> &'static str {
    indoc! {"
        func @e (i32 %a) i32 {
        %entry:
            %x = add i32 1, 1
            %c0 = eq i32 %x, 2
            br %c0, %outer, %dead
        %outer:
            %c1 = slt i32 %a, 0
            br %c1, %left, %right
        %left:
            %l = mul i32 %x, 3
            br %merge
        %right:
            %r = sub i32 8, %x
            br %merge
        %dead:
            %d = add i32 %a, 1
            br %merge
        %merge:
            %m = phi i32 [%l, %left], [%r, %right], [%d, %dead]
            %n = add i32 %m, 1
            ret i32 %n
        }
    "}
}

#[test]
fn straight_line_arithmetic_folds() {
    let module = parse(straight_line());
    let func = only_function(&module);
    let result = analyze(func, &Default::default());
    assert_eq!(fact(func, &result, "x"), Some(ConstantValue::Constant(5)));
    assert_eq!(fact(func, &result, "y"), Some(ConstantValue::Constant(20)));

    let (module, changes) = optimize(straight_line(), &Default::default());
    assert_eq!(changes, Changes::CONSTANTS_FOLDED);
    assert_eq!(
        write_string(&module),
        indoc! {"
            func @a () i32 {
            %entry:
                ret i32 20
            }
        "}
    );
}

#[test]
fn constant_branch_prunes_untaken_side() {
    let module = parse(constant_branch());
    let func = only_function(&module);
    let result = analyze(func, &Default::default());
    assert_eq!(fact(func, &result, "c"), Some(ConstantValue::Constant(1)));
    assert_eq!(fact(func, &result, "p"), Some(ConstantValue::Bottom));
    assert!(result.is_executable_edge(edge(func, "entry", "then")));
    assert!(!result.is_executable_edge(edge(func, "entry", "else")));
    assert!(!result.is_executable_block(func.find_block("else").unwrap()));

    let (module, changes) = optimize(constant_branch(), &Default::default());
    assert_eq!(changes, Changes::all());
    assert_eq!(
        write_string(&module),
        indoc! {"
            func @b (i32 %a) i32 {
            %entry:
                br %then
            %then:
                br %join
            %join:
                %p = phi i32 [%a, %then]
                ret i32 %p
            }
        "}
    );
    only_function(&module).verify().unwrap();
}

#[test]
fn phi_merges_only_executable_edges() {
    let module = parse(unknown_branch());
    let func = only_function(&module);
    let result = analyze(func, &Default::default());
    assert_eq!(fact(func, &result, "c"), Some(ConstantValue::Bottom));
    assert_eq!(fact(func, &result, "p"), Some(ConstantValue::Bottom));
    assert_eq!(fact(func, &result, "q"), Some(ConstantValue::Constant(5)));
    assert!(result.is_executable_edge(edge(func, "then", "join")));
    assert!(result.is_executable_edge(edge(func, "else", "join")));
    assert_eq!(result.executable_incoming(func.find_block("join").unwrap()), 2);

    // With the condition known, the parameter never reaches the phi.
    let module = parse(&unknown_branch().replace("slt i32 %a, 10", "slt i32 3, 10"));
    let func = only_function(&module);
    let result = analyze(func, &Default::default());
    assert_eq!(fact(func, &result, "p"), Some(ConstantValue::Constant(5)));
    assert!(!result.is_executable_edge(edge(func, "else", "join")));
}

#[test]
fn loop_induction_variable_is_not_constant() {
    for opts in all_orders() {
        let module = parse(counting_loop());
        let func = only_function(&module);
        let result = analyze(func, &opts);
        assert_eq!(fact(func, &result, "i"), Some(ConstantValue::Bottom));
        assert_eq!(fact(func, &result, "c"), Some(ConstantValue::Bottom));
        assert_eq!(fact(func, &result, "next"), Some(ConstantValue::Bottom));
        for bb in func.blocks() {
            assert!(result.is_executable_block(bb), "{}", bb.dump(func));
        }
    }

    let (module, changes) = optimize(counting_loop(), &Default::default());
    assert!(changes.is_empty());
    assert_eq!(write_string(&module), counting_loop());
}

#[test]
fn cycles_of_unconditional_branches_terminate() {
    let module = parse(indoc! {"
        func @spin () void {
        %entry:
            br %a
        %a:
            br %b
        %b:
            br %a
        }
    "});
    let func = only_function(&module);
    let result = analyze(func, &Default::default());
    let edges: Vec<_> = result
        .executable_edges()
        .map(|e| e.dump(func).to_string())
        .collect();
    assert_eq!(
        edges,
        vec!["NULL -> %entry", "%entry -> %a", "%a -> %b", "%b -> %a"]
    );
    assert_eq!(result.facts().count(), 0);
}

#[test]
fn final_facts_do_not_depend_on_worklist_order() {
    for input in &[
        straight_line(),
        constant_branch(),
        unknown_branch(),
        counting_loop(),
        nested_branches(),
    ] {
        let module = parse(input);
        let func = only_function(&module);
        let results: Vec<_> = all_orders()
            .iter()
            .map(|opts| analyze(func, opts))
            .collect();
        for result in &results[1..] {
            assert_eq!(result, &results[0], "in @{}", func.name());
        }
    }
}

#[test]
fn executable_edges_leave_executable_blocks() {
    for input in &[constant_branch(), unknown_branch(), counting_loop(), nested_branches()] {
        let module = parse(input);
        let func = only_function(&module);
        let result = analyze(func, &Default::default());
        assert!(result.is_executable_edge(CfgEdge::entry(func.entry())));
        for edge in result.executable_edges() {
            if let Some(from) = edge.from {
                assert!(result.is_executable_block(from));
                assert!(func.successors(from).contains(&edge.to));
            }
        }
    }
}

#[test]
fn nested_branches_fold_through_phis() {
    let module = parse(nested_branches());
    let func = only_function(&module);
    let result = analyze(func, &Default::default());
    assert_eq!(fact(func, &result, "x"), Some(ConstantValue::Constant(2)));
    assert_eq!(fact(func, &result, "c0"), Some(ConstantValue::Constant(1)));
    assert_eq!(fact(func, &result, "c1"), Some(ConstantValue::Bottom));
    assert_eq!(fact(func, &result, "l"), Some(ConstantValue::Constant(6)));
    assert_eq!(fact(func, &result, "r"), Some(ConstantValue::Constant(6)));
    assert_eq!(fact(func, &result, "m"), Some(ConstantValue::Constant(6)));
    assert_eq!(fact(func, &result, "n"), Some(ConstantValue::Constant(7)));
    assert_eq!(fact(func, &result, "d"), None);

    let (module, changes) = optimize(nested_branches(), &Default::default());
    assert_eq!(changes, Changes::all() - Changes::PHIS_REPAIRED);
    assert_eq!(
        write_string(&module),
        indoc! {"
            func @e (i32 %a) i32 {
            %entry:
                br %outer
            %outer:
                %c1 = slt i32 %a, 0
                br %c1, %left, %right
            %left:
                br %merge
            %right:
                br %merge
            %merge:
                ret i32 7
            }
        "}
    );
    only_function(&module).verify().unwrap();
}

#[test]
fn unknown_inputs_are_not_constant() {
    let module = parse(indoc! {"
        declare @ext (i32) i32

        func @f (i32 %a) i32 {
        %entry:
            %x = add i32 %a, 1
            %r = call i32 @ext (5)
            %y = add i32 %r, 1
            %z = neg i32 3
            ret i32 %y
        }
    "});
    let func = only_function(&module);
    let result = analyze(func, &Default::default());
    assert_eq!(result.value_fact(func, func.find_value("a").unwrap()), ConstantValue::Bottom);
    assert_eq!(fact(func, &result, "x"), Some(ConstantValue::Bottom));
    assert_eq!(fact(func, &result, "r"), Some(ConstantValue::Bottom));
    assert_eq!(fact(func, &result, "y"), Some(ConstantValue::Bottom));
    assert_eq!(fact(func, &result, "z"), Some(ConstantValue::Bottom));
}

#[test]
fn unfoldable_operations_are_not_constant() {
    let module = parse(indoc! {"
        func @f () i32 {
        %entry:
            %q0 = sdiv i32 7, 0
            %q1 = udiv i32 7, 0
            %q2 = sdiv i32 7, 2
            %s = shl i32 1, 2
            %t = shr i32 8, 1
            %u = srem i32 7, 2
            %v = urem i32 7, 2
            %w = add i8 127, 1
            %e = eq i32 3, 3
            %f = ugt i32 3, 4
            ret i32 %q2
        }
    "});
    let func = only_function(&module);
    let result = analyze(func, &Default::default());
    for &name in &["q0", "q1", "s", "t", "u", "v"] {
        assert_eq!(fact(func, &result, name), Some(ConstantValue::Bottom), "%{}", name);
    }
    assert_eq!(fact(func, &result, "q2"), Some(ConstantValue::Constant(3)));
    assert_eq!(fact(func, &result, "w"), Some(ConstantValue::Constant(-128)));
    assert_eq!(fact(func, &result, "e"), Some(ConstantValue::Constant(1)));
    assert_eq!(fact(func, &result, "f"), Some(ConstantValue::Constant(0)));
}

#[test]
fn legacy_phi_repair_empties_surviving_phis() {
    let opts = SccpOptions {
        phi_repair: PhiRepair::Legacy,
        ..Default::default()
    };
    let (module, changes) = optimize(constant_branch(), &opts);
    assert!(changes.contains(Changes::PHIS_REPAIRED | Changes::BLOCKS_REMOVED));
    let func = only_function(&module);
    let phi = func.value_inst(func.find_value("p").unwrap());
    assert!(func[phi].args().is_empty());
    assert!(func[phi].blocks().is_empty());
    assert!(func.verify().is_err());
}

#[test]
fn precise_phi_repair_keeps_live_entries() {
    let (module, _) = optimize(
        indoc! {"
            func @f (i32 %a, i32 %b) i32 {
            %entry:
                %c0 = slt i32 %a, %b
                br %c0, %left, %mid
            %mid:
                %c1 = eq i32 0, 1
                br %c1, %right, %join
            %left:
                br %join
            %right:
                br %join
            %join:
                %p = phi i32 [%a, %left], [%b, %mid], [9, %right]
                ret i32 %p
            }
        "},
        &Default::default(),
    );
    assert_eq!(
        write_string(&module),
        indoc! {"
            func @f (i32 %a, i32 %b) i32 {
            %entry:
                %c0 = slt i32 %a, %b
                br %c0, %left, %mid
            %mid:
                br %join
            %left:
                br %join
            %join:
                %p = phi i32 [%a, %left], [%b, %mid]
                ret i32 %p
            }
        "}
    );
}

#[test]
fn pass_runs_on_every_function() {
    let mut module = parse(&format!("{}\n{}", straight_line(), counting_loop()));
    assert!(SparseCondConstProp::run_on_module(
        &PassContext::default(),
        &mut module
    ));
    assert!(!SparseCondConstProp::run_on_module(
        &PassContext::default(),
        &mut module
    ));
    let a = module.function_by_name("a").unwrap();
    assert_eq!(a.insts(a.entry()).count(), 1);
    assert_eq!(
        module.function_by_name("d").unwrap().to_string() + "\n",
        counting_loop()
    );
}

#[test]
fn printer_lists_facts_and_edges() {
    let module = parse(constant_branch());
    let func = only_function(&module);
    let result = analyze(func, &Default::default());
    assert_eq!(
        result.dump(func).to_string(),
        indoc! {"
            SCCP facts of @b:
              %c : { 1 }
              %p : { BOTTOM }
            Executable edges of @b:
              NULL -> %entry
              %entry -> %then
              %then -> %join
        "}
    );
}
