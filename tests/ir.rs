// Copyright (c) 2017-2021 Fabian Schuiki

use sccp::{analysis::PredecessorTable, int_ty, ir::prelude::*, void_ty};

/// Create a `func @test (i32 %a) <ty>` function with an `%entry` block and
/// populate it through a callback.
fn within_func(return_type: sccp::Type, f: impl FnOnce(&mut FunctionBuilder)) -> Function {
    let mut sig = Signature::new();
    sig.add_input(int_ty(32));
    sig.set_return_type(return_type);
    let mut func = Function::new("test", sig);
    let mut builder = FunctionBuilder::new(&mut func);
    let arg = builder.input_arg(0);
    builder.set_name(arg, "a".to_owned());
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    f(&mut builder);
    func
}

#[test]
fn call_with_void() {
    within_func(void_ty(), |builder| {
        let mut sig = Signature::new();
        sig.set_return_type(void_ty());
        let ext = builder.add_extern("foo", sig);
        let inst = builder.ins().name("x").call(ext, vec![]);
        assert!(!builder.has_result(inst));
        builder.ins().ret();
        assert_eq!(builder.verify().map_err(|e| e.to_string()), Ok(()));
    });
}

#[test]
fn call_with_return_value() {
    let func = within_func(int_ty(32), |builder| {
        let mut sig = Signature::new();
        sig.add_input(int_ty(1));
        sig.add_input(int_ty(32));
        sig.set_return_type(int_ty(32));
        let ext = builder.add_extern("foo", sig);
        let v1 = builder.const_int(int_ty(1), 1);
        let v2 = builder.input_arg(0);
        let inst = builder.ins().name("called").call(ext, vec![v1, v2]);
        let v3 = builder.inst_result(inst);
        builder.ins().ret_value(v3);
    });
    assert_eq!(
        func.to_string(),
        "func @test (i32 %a) i32 {\n%entry:\n    %called = call i32 @foo (1, %a)\n    ret i32 %called\n}"
    );
    assert!(func.verify().is_ok());
}

#[test]
fn literals_are_interned() {
    within_func(void_ty(), |builder| {
        let a = builder.const_int(int_ty(32), 42);
        let b = builder.const_int(int_ty(32), 42);
        let c = builder.const_int(int_ty(8), 42);
        let d = builder.const_int(int_ty(1), 3);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(builder.get_const_int(c), Some(42));
        assert_eq!(builder.get_const_int(d), Some(1));
        assert_eq!(builder.value_type(c), int_ty(8));
    });
}

#[test]
fn uses_track_mutations() {
    within_func(int_ty(32), |builder| {
        let a = builder.input_arg(0);
        let one = builder.const_int(int_ty(32), 1);
        let x = builder.ins().name("x").add(a, one);
        let y = builder.ins().name("y").mul(x, x);
        let ret = builder.ins().ret_value(y);
        let x_inst = builder.value_inst(x);
        let y_inst = builder.value_inst(y);

        assert_eq!(builder.uses(a).collect::<Vec<_>>(), vec![x_inst]);
        assert_eq!(builder.uses(x).collect::<Vec<_>>(), vec![y_inst]);
        assert_eq!(builder.uses(y).collect::<Vec<_>>(), vec![ret]);

        // Both operands of the multiplication are rewritten.
        let two = builder.const_int(int_ty(32), 2);
        assert_eq!(builder.replace_use(x, two), 2);
        assert!(!builder.has_uses(x));
        assert_eq!(builder.uses(two).collect::<Vec<_>>(), vec![y_inst]);

        assert!(builder.prune_if_unused(x_inst));
        assert!(!builder.has_uses(a));
        assert!(!builder.prune_if_unused(y_inst));
        assert_eq!(builder.find_value("x"), None);
    });
}

#[test]
#[should_panic(expected = "still in use")]
fn removing_used_instructions_panics() {
    within_func(int_ty(32), |builder| {
        let a = builder.input_arg(0);
        let x = builder.ins().add(a, a);
        builder.ins().ret_value(x);
        let inst = builder.value_inst(x);
        builder.remove_inst(inst);
    });
}

#[test]
fn phi_incoming_values_can_be_removed() {
    let func = within_func(int_ty(32), |builder| {
        let entry = builder.entry();
        let other = builder.named_block("other");
        let join = builder.named_block("join");
        let a = builder.input_arg(0);
        let c = builder.ins().name("c").eq(a, a);
        builder.ins().br_cond(c, other, join);
        builder.append_to(other);
        builder.ins().br(join);
        builder.append_to(join);
        let five = builder.const_int(int_ty(32), 5);
        let p = builder
            .ins()
            .name("p")
            .phi(vec![a, five], vec![entry, other]);
        builder.ins().ret_value(p);

        let phi = builder.value_inst(p);
        assert_eq!(builder.remove_phi_incoming(phi, 0), (a, entry));
        assert_eq!(builder.uses(a).count(), 1);
        assert!(builder.uses(five).any(|inst| inst == phi));
    });
    assert_eq!(
        func.to_string(),
        "func @test (i32 %a) i32 {\n\
         %entry:\n    %c = eq i32 %a, %a\n    br %c, %other, %join\n\
         %other:\n    br %join\n\
         %join:\n    %p = phi i32 [5, %other]\n    ret i32 %p\n}"
    );
}

#[test]
fn blocks_are_removed_with_their_instructions() {
    let func = within_func(int_ty(32), |builder| {
        let a = builder.input_arg(0);
        let exit = builder.named_block("exit");
        let dead0 = builder.named_block("dead0");
        let dead1 = builder.named_block("dead1");
        builder.ins().br(exit);
        builder.append_to(exit);
        builder.ins().ret_value(a);

        // Two unreachable blocks referring to each other's values.
        builder.append_to(dead0);
        let x = builder.ins().name("x").add(a, a);
        builder.ins().br(dead1);
        builder.append_to(dead1);
        let y = builder.ins().name("y").phi(vec![x], vec![dead0]);
        let _ = builder.ins().sub(y, x);
        builder.ins().br(dead0);

        builder.remove_blocks(&[dead0, dead1]);
        assert_eq!(builder.uses(a).count(), 1);
        assert_eq!(builder.find_value("x"), None);
        assert_eq!(builder.find_block("dead0"), None);
    });
    assert_eq!(func.blocks().count(), 2);
    assert_eq!(func.all_insts().count(), 2);
    assert!(func.verify().is_ok());
}

#[test]
fn verifier_reports_malformed_functions() {
    let func = within_func(int_ty(32), |builder| {
        let a = builder.input_arg(0);
        let next = builder.named_block("next");
        let x = builder.ins().name("x").add(a, a);
        builder.ins().ret_value(x);
        builder.ins().br(next);
        builder.append_to(next);
        let b = builder.const_int(int_ty(8), 1);
        builder.ins().name("y").add(b, b);
    });
    let errs = func.verify().unwrap_err();
    let messages: Vec<_> = errs.iter().map(|e| e.message.clone()).collect();
    assert_eq!(
        messages,
        vec![
            "terminator must be at the end of block %entry".to_owned(),
            "last instruction `%y = add i8 1, 1` must be a terminator".to_owned(),
        ]
    );
}

#[test]
fn predecessors_skip_filtered_blocks() {
    within_func(int_ty(32), |builder| {
        let entry = builder.entry();
        let left = builder.named_block("left");
        let right = builder.named_block("right");
        let join = builder.named_block("join");
        let a = builder.input_arg(0);
        let c = builder.ins().name("c").eq(a, a);
        builder.ins().br_cond(c, left, right);
        builder.append_to(left);
        builder.ins().br(join);
        builder.append_to(right);
        builder.ins().br(join);
        builder.append_to(join);
        builder.ins().ret_value(a);

        let all = builder.predtbl();
        assert!(all.is_pred(entry, left));
        assert!(all.is_pred(left, join));
        assert!(all.is_pred(right, join));
        assert!(!all.is_pred(join, entry));

        let filtered = PredecessorTable::new_filtered(builder, |bb| bb != right);
        assert!(filtered.is_pred(left, join));
        assert!(!filtered.is_pred(right, join));
        assert!(filtered.is_pred(entry, right));
    });
}
