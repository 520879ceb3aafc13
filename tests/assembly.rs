// Copyright (c) 2017-2021 Fabian Schuiki

#[macro_use]
extern crate indoc;

use sccp::assembly::{parse_module, write_string};

fn loopback(input: &str) {
    let module = parse_module(input).unwrap();
    assert_eq!(write_string(&module), input);
}

#[test]
fn empty() {
    assert_eq!(write_string(&parse_module("").unwrap()), "");
}

#[test]
fn straight_line() {
    loopback(indoc! {"
        func @f (i32 %a, i32 %b) i32 {
        %entry:
            %x = add i32 %a, %b
            %y = mul i32 %x, 42
            %z = neg i32 %y
            ret i32 %z
        }
    "});
}

#[test]
fn branches_and_phis() {
    loopback(indoc! {"
        func @f (i32 %a) i32 {
        %entry:
            %c = slt i32 %a, 10
            br %c, %then, %else
        %then:
            br %join
        %else:
            br %join
        %join:
            %p = phi i32 [5, %then], [%a, %else]
            ret i32 %p
        }
    "});
}

#[test]
fn declarations_and_calls() {
    loopback(indoc! {"
        declare @ext (i32, i1) i32
        declare @sink (i32) void

        func @f (i32 %a) void {
        %entry:
            %r = call i32 @ext (%a, 1)
            call void @sink (%r)
            ret
        }

        func @g () i32 {
        %entry:
            %r = call i32 @g ()
            ret i32 %r
        }
    "});
}

#[test]
fn loops_with_forward_references() {
    loopback(indoc! {"
        func @count (i32 %n) i32 {
        %entry:
            br %loop
        %loop:
            %i = phi i32 [0, %entry], [%next, %body]
            %c = slt i32 %i, %n
            br %c, %body, %exit
        %body:
            %next = add i32 %i, 1
            br %loop
        %exit:
            ret i32 %i
        }
    "});
}

#[test]
fn dotted_names() {
    loopback(indoc! {"
        func @foo.bar (i8 %a.0) i8 {
        %entry.1:
            %x.y = xor i8 %a.0, -1
            ret i8 %x.y
        }
    "});
}

#[test]
fn comments_and_void_returns() {
    let module = parse_module(indoc! {"
        ; leading comment
        func @f () void { ; trailing comment
        %entry:
            ret void
        }
    "})
    .unwrap();
    assert_eq!(
        write_string(&module),
        indoc! {"
            func @f () void {
            %entry:
                ret
            }
        "}
    );
}

#[test]
fn literals_are_canonicalized() {
    let module = parse_module(indoc! {"
        func @f () i8 {
        %entry:
            %c = eq i1 3, 1
            %x = add i8 255, 1
            ret i8 %x
        }
    "})
    .unwrap();
    assert_eq!(
        write_string(&module),
        indoc! {"
            func @f () i8 {
            %entry:
                %c = eq i1 1, 1
                %x = add i8 -1, 1
                ret i8 %x
            }
        "}
    );
}

#[test]
fn parse_errors() {
    let cases = vec![
        ("func @f () i32 {\n%entry:\n    ret i32 %x\n}\n", 3),
        ("func @f () i32 {\n%entry:\n    %x = add i32 1, 2\n    %x = add i32 1, 2\n    ret i32 %x\n}\n", 4),
        ("func @f (i32 %a) i32 {\n%entry:\n    %x = add i64 %a, 1\n    ret i32 %x\n}\n", 3),
        ("func @f () void {\n%entry:\n    call void @missing ()\n    ret\n}\n", 3),
        ("declare @g () void\ndeclare @g () void\n", 2),
        ("func @f () void {\n    ret\n}\n", 2),
        ("func @f () void {\n%entry:\n    ret\n", 3),
        ("func @f () void {\n%entry:\n    %x = frob i32 1\n    ret\n}\n", 3),
        ("func @f () void {\n%entry:\n    br 1, %entry %entry\n}\n", 3),
        ("declare @f (i128) void\n", 1),
    ];
    for (input, line) in cases {
        let err = parse_module(input).unwrap_err();
        assert_eq!(err.line, line, "{}: {}", input, err);
    }
}

#[test]
fn debug_output_is_assembly() {
    let input = indoc! {"
        declare @ext (i32) i32

        func @f () i32 {
        %entry:
            %r = call i32 @ext (5)
            ret i32 %r
        }
    "};
    let module = parse_module(input).unwrap();
    assert_eq!(format!("{:?}", module), input);
}
