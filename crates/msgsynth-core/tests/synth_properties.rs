use msgsynth_core::builder::{BodyBuilder, BodyRecorder};
use msgsynth_core::config::GenerationConfig;
use msgsynth_core::construction::ConstructionStrategy;
use msgsynth_core::diagnostics::{find_diagnostic, DiagnosticCode};
use msgsynth_core::ir::{Expr, GeneratedBody, Stmt};
use msgsynth_core::message_id::IdFormat;
use msgsynth_core::model::{
    ConstructionParam, ConstructorShape, FormatKind, MessageDescriptor, MessageInterface,
    MethodDescriptor, ParamRole, ParameterDescriptor, ReturnDescriptor, ThrowableReturnDescriptor,
    TypeRef,
};
use msgsynth_core::synth::{synthesize_body, synthesize_interface, MethodBodySynthesizer};

use ConstructorShape::{
    String as S, StringThrowable as ST, Throwable as T, ThrowableString as TS,
};

fn method(
    name: &str,
    params: Vec<ParameterDescriptor>,
    ret: ReturnDescriptor,
    message: MessageDescriptor,
) -> MethodDescriptor {
    MethodDescriptor {
        name: name.to_string(),
        params,
        return_type: ret,
        message,
        thrown: Vec::new(),
    }
}

fn cause() -> ParameterDescriptor {
    ParameterDescriptor::format_arg("cause", "Throwable").with_role(ParamRole::Cause)
}

fn accessor(name: &str) -> Expr {
    Expr::InvokeInstance {
        target: Box::new(Expr::This),
        method: format!("{name}$str"),
        args: Vec::new(),
    }
}

fn format_call(args: Vec<Expr>) -> Expr {
    Expr::InvokeStatic {
        owner: TypeRef::new("java.text.MessageFormat"),
        method: "format".to_string(),
        args,
    }
}

fn declare(name: &str, ty: &str, init: Expr) -> Stmt {
    Stmt::DeclareLocal {
        name: name.to_string(),
        ty: TypeRef::new(ty),
        init,
    }
}

fn trim() -> Stmt {
    Stmt::TrimStackTrace {
        target: Expr::local("result"),
        drop_frames: 1,
        scratch: "st".to_string(),
    }
}

fn body(m: &MethodDescriptor) -> GeneratedBody {
    let accessor = format!("{}$str", m.name);
    synthesize_body(m, &accessor, &IdFormat::default(), "EX").expect("synthesize")
}

fn construct_stmt(b: &GeneratedBody) -> &Expr {
    b.stmts
        .iter()
        .find_map(|s| match s {
            Stmt::DeclareLocal { name, init, .. } if name == "result" => Some(init),
            _ => None,
        })
        .expect("result declaration")
}

#[test]
fn scenario_a_plain_string_method() {
    let m = method(
        "greet",
        vec![ParameterDescriptor::format_arg("name", "String")],
        ReturnDescriptor::value("String"),
        MessageDescriptor::new("Hello {0}"),
    );
    assert_eq!(
        body(&m).stmts,
        vec![
            declare(
                "result",
                "String",
                format_call(vec![accessor("greet"), Expr::local("name")])
            ),
            Stmt::Return(Expr::local("result")),
        ]
    );
}

#[test]
fn scenario_b_string_only_exception_with_id() {
    let m = method(
        "badField",
        vec![ParameterDescriptor::format_arg("field", "String")],
        ReturnDescriptor::throwable(
            "IllegalArgumentException",
            ThrowableReturnDescriptor::with_shapes([S]),
        ),
        MessageDescriptor::new("bad field {0}").with_id(7),
    );
    assert_eq!(
        body(&m).stmts,
        vec![
            declare(
                "msg",
                "String",
                format_call(vec![
                    Expr::Concat(vec![Expr::Str("EX000007: ".to_string()), accessor("badField")]),
                    Expr::local("field"),
                ])
            ),
            declare(
                "result",
                "IllegalArgumentException",
                Expr::Construct {
                    ty: TypeRef::new("IllegalArgumentException"),
                    args: vec![Expr::local("msg")],
                }
            ),
            trim(),
            Stmt::Return(Expr::local("result")),
        ]
    );
}

#[test]
fn scenario_c_cause_only_discards_message() {
    let m = method(
        "wrap",
        vec![cause()],
        ReturnDescriptor::throwable("RuntimeException", ThrowableReturnDescriptor::with_shapes([T])),
        MessageDescriptor::new("wrapped"),
    );
    assert_eq!(
        body(&m).stmts,
        vec![
            declare("msg", "String", format_call(vec![accessor("wrap")])),
            declare(
                "result",
                "RuntimeException",
                Expr::Construct {
                    ty: TypeRef::new("RuntimeException"),
                    args: vec![Expr::local("cause")],
                }
            ),
            trim(),
            Stmt::Return(Expr::local("result")),
        ]
    );
}

#[test]
fn scenario_d_construction_params_beat_string_throwable() {
    let m = method(
        "build",
        vec![ParameterDescriptor::format_arg("detail", "String"), cause()],
        ReturnDescriptor::throwable(
            "CustomException",
            ThrowableReturnDescriptor::with_shapes([S, ST]).with_construction_params(vec![
                ConstructionParam::message("detail"),
                ConstructionParam::param("cause"),
            ]),
        ),
        MessageDescriptor::new("build failed: {0}"),
    );
    assert_eq!(
        body(&m).stmts,
        vec![
            declare(
                "msg",
                "String",
                format_call(vec![accessor("build"), Expr::local("detail")])
            ),
            declare(
                "result",
                "CustomException",
                Expr::Construct {
                    ty: TypeRef::new("CustomException"),
                    args: vec![Expr::local("msg"), Expr::local("cause")],
                }
            ),
            trim(),
            Stmt::Return(Expr::local("result")),
        ]
    );
}

#[test]
fn synthesis_is_deterministic() {
    let m = method(
        "build",
        vec![
            ParameterDescriptor::format_arg("detail", "String"),
            ParameterDescriptor::format_arg("n", "long").with_formatter("com.acme.Hex"),
            cause(),
        ],
        ReturnDescriptor::throwable(
            "java.lang.IllegalStateException",
            ThrowableReturnDescriptor::with_shapes([S, ST, T]),
        ),
        MessageDescriptor::new("x {0} {1}").with_id(42),
    );
    let a = serde_json::to_vec(&body(&m)).expect("encode");
    let b = serde_json::to_vec(&body(&m)).expect("encode");
    assert_eq!(a, b);
}

#[test]
fn zero_argument_methods_never_format() {
    let value = method(
        "ready",
        Vec::new(),
        ReturnDescriptor::value("String"),
        MessageDescriptor::new("ready").with_id(1),
    );
    let exception = method(
        "broken",
        Vec::new(),
        ReturnDescriptor::throwable("IllegalStateException", ThrowableReturnDescriptor::with_shapes([S])),
        MessageDescriptor::new("broken {0}").with_id(2),
    );
    for m in [&value, &exception] {
        let b = body(m);
        assert_eq!(
            b.count_exprs(|e| matches!(e, Expr::InvokeStatic { .. })),
            0,
            "{}",
            m.name
        );
    }
    assert_eq!(
        body(&value).stmts[0],
        declare("result", "String", accessor("ready"))
    );
    assert_eq!(
        body(&exception).stmts[0],
        declare(
            "msg",
            "String",
            Expr::Concat(vec![Expr::Str("EX000002: ".to_string()), accessor("broken")])
        )
    );
}

/// Delegates to [`BodyRecorder`] and counts format-function invocations.
#[derive(Default)]
struct CountingBuilder {
    inner: BodyRecorder,
    format_calls: usize,
}

impl BodyBuilder for CountingBuilder {
    fn declare_local(&mut self, name: &str, ty: &TypeRef, init: Expr) -> Expr {
        self.inner.declare_local(name, ty, init)
    }

    fn invoke(&mut self, call: Expr) {
        self.inner.invoke(call)
    }

    fn assign(&mut self, target: Expr, value: Expr) {
        self.inner.assign(target, value)
    }

    fn trim_stack_trace(&mut self, target: Expr, drop_frames: usize, scratch: &str) {
        self.inner.trim_stack_trace(target, drop_frames, scratch)
    }

    fn return_value(&mut self, value: Expr) {
        self.inner.return_value(value)
    }

    fn invoke_static(&mut self, owner: &TypeRef, method: &str, args: Vec<Expr>) -> Expr {
        if method == "format" {
            self.format_calls += 1;
        }
        self.inner.invoke_static(owner, method, args)
    }
}

#[test]
fn two_argument_constructors_bind_message_cause_and_null_in_order() {
    let msg = Expr::local("msg");
    let cause_arg = Expr::local("cause");
    let cases = [
        (ST, true, vec![msg.clone(), cause_arg.clone()]),
        (TS, true, vec![cause_arg.clone(), msg.clone()]),
        (ST, false, vec![msg.clone(), Expr::Null]),
        (TS, false, vec![Expr::Null, msg.clone()]),
    ];
    for (shape, has_cause, expected) in cases {
        let mut params = vec![ParameterDescriptor::format_arg("v", "String")];
        if has_cause {
            params.push(cause());
        }
        let m = method(
            "fail",
            params,
            ReturnDescriptor::throwable(
                "com.acme.Odd",
                ThrowableReturnDescriptor::with_shapes([shape]),
            ),
            MessageDescriptor::new("odd {0}"),
        );
        let b = body(&m);
        assert_eq!(
            construct_stmt(&b),
            &Expr::Construct {
                ty: TypeRef::new("com.acme.Odd"),
                args: expected,
            },
            "{shape:?} cause={has_cause}"
        );
        assert_eq!(b.stmts[2], trim(), "{shape:?} cause={has_cause}");
    }
}

#[test]
fn discarded_message_is_built_once_and_never_passed() {
    let cases = [
        (vec![T], true, ConstructionStrategy::CauseOnly),
        (Vec::new(), true, ConstructionStrategy::NoArgThenInitCause),
        (Vec::new(), false, ConstructionStrategy::NoArg),
    ];
    for (shapes, has_cause, expected) in cases {
        let mut params = vec![ParameterDescriptor::format_arg("v", "String")];
        if has_cause {
            params.push(cause());
        }
        let m = method(
            "fail",
            params,
            ReturnDescriptor::throwable(
                "com.acme.Odd",
                ThrowableReturnDescriptor::with_shapes(shapes),
            ),
            MessageDescriptor::new("odd {0}"),
        );

        let ids = IdFormat::default();
        let mut b = CountingBuilder::default();
        let outcome = MethodBodySynthesizer::new(&ids, "EX")
            .synthesize(&mut b, &m, "fail$str")
            .expect("synthesize");
        assert_eq!(outcome.strategy, Some(expected));
        assert_eq!(b.format_calls, 1, "{expected:?}");

        let body = b.inner.finish();
        assert_eq!(body.count_exprs(|e| *e == Expr::local("msg")), 0, "{expected:?}");
        let Expr::Construct { args, .. } = construct_stmt(&body) else {
            panic!("expected construct");
        };
        assert!(!args.contains(&Expr::local("msg")));

        let init_cause = body.stmts.iter().any(|s| {
            matches!(s, Stmt::Invoke(Expr::InvokeInstance { method, .. }) if method == "initCause")
        });
        assert_eq!(init_cause, expected == ConstructionStrategy::NoArgThenInitCause);
    }
}

#[test]
fn message_only_with_cause_attaches_cause_after_construction() {
    let m = method(
        "npe",
        vec![cause()],
        ReturnDescriptor::throwable(
            "java.lang.NullPointerException",
            ThrowableReturnDescriptor::with_shapes([S]),
        ),
        MessageDescriptor::new("null"),
    );
    let b = body(&m);
    assert_eq!(
        b.stmts[2],
        Stmt::Invoke(Expr::InvokeInstance {
            target: Box::new(Expr::local("result")),
            method: "initCause".to_string(),
            args: vec![Expr::local("cause")],
        })
    );
    assert_eq!(b.stmts[3], trim());
}

#[test]
fn trimming_only_for_exception_methods_and_always_one_frame() {
    let value = method(
        "v",
        vec![ParameterDescriptor::format_arg("x", "int")],
        ReturnDescriptor::value("String"),
        MessageDescriptor::new("{0}"),
    );
    assert!(!body(&value)
        .stmts
        .iter()
        .any(|s| matches!(s, Stmt::TrimStackTrace { .. })));

    for mask in 0u8..16 {
        let shapes: Vec<ConstructorShape> = [S, ST, ConstructorShape::ThrowableString, T]
            .into_iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, s)| s)
            .collect();
        for with_cause in [false, true] {
            let mut params = vec![ParameterDescriptor::format_arg("x", "int")];
            if with_cause {
                params.push(cause());
            }
            let m = method(
                "e",
                params,
                ReturnDescriptor::throwable(
                    "com.acme.E",
                    ThrowableReturnDescriptor::with_shapes(shapes.clone()),
                ),
                MessageDescriptor::new("{0}"),
            );
            let b = body(&m);
            let trims: Vec<&Stmt> = b
                .stmts
                .iter()
                .filter(|s| matches!(s, Stmt::TrimStackTrace { .. }))
                .collect();
            assert_eq!(trims, vec![&trim()], "mask={mask:04b} cause={with_cause}");
            assert_eq!(b.stmts.last(), Some(&Stmt::Return(Expr::local("result"))));
            assert_eq!(b.stmts[b.stmts.len() - 2], trim());
        }
    }
}

#[test]
fn id_prefix_round_trip() {
    let interface = MessageInterface {
        name: "Messages".to_string(),
        package: None,
        project_code: Some("EX".to_string()),
        methods: vec![
            method(
                "withId",
                vec![ParameterDescriptor::format_arg("v", "String")],
                ReturnDescriptor::value("String"),
                MessageDescriptor::new("bad value").with_id(123),
            ),
            method(
                "withoutId",
                vec![ParameterDescriptor::format_arg("v", "String")],
                ReturnDescriptor::value("String"),
                MessageDescriptor::new("bad value"),
            ),
        ],
        source_path: None,
        source_sha256: None,
    };
    let t = synthesize_interface(&interface, &GenerationConfig::default()).expect("synthesize");

    assert_eq!(
        t.field("withId").map(|f| &f.init),
        Some(&Expr::Str("bad value".to_string()))
    );
    let with_id = &t.method("withId").expect("withId").body;
    assert_eq!(
        with_id.stmts[0],
        declare(
            "result",
            "String",
            format_call(vec![
                Expr::Concat(vec![Expr::Str("EX000123: ".to_string()), accessor("withId")]),
                Expr::local("v"),
            ])
        )
    );
    let without_id = &t.method("withoutId").expect("withoutId").body;
    assert_eq!(
        without_id.stmts[0],
        declare(
            "result",
            "String",
            format_call(vec![accessor("withoutId"), Expr::local("v")])
        )
    );
    assert_eq!(without_id.count_exprs(|e| matches!(e, Expr::Concat(_))), 0);
}

#[test]
fn printf_and_no_format_select_their_functions() {
    for (kind, owner, name) in [
        (FormatKind::Printf, "String", "format"),
        (FormatKind::NoFormat, "String", "valueOf"),
    ] {
        let m = method(
            "m",
            vec![ParameterDescriptor::format_arg("x", "int")],
            ReturnDescriptor::value("String"),
            MessageDescriptor::new("%d").with_format(kind),
        );
        let Stmt::DeclareLocal { init, .. } = &body(&m).stmts[0] else {
            panic!("expected declaration");
        };
        let Expr::InvokeStatic { owner: o, method, .. } = init else {
            panic!("expected static invocation");
        };
        assert_eq!((o.as_str(), method.as_str()), (owner, name));
    }
}

#[test]
fn targets_are_assigned_after_construction_before_trim() {
    let m = method(
        "status",
        vec![
            ParameterDescriptor::format_arg("c", "int").with_role(ParamRole::FieldTarget {
                name: Some("code".to_string()),
            }),
            ParameterDescriptor::format_arg("retry", "boolean")
                .with_role(ParamRole::PropertyTarget { name: None }),
        ],
        ReturnDescriptor::throwable("com.acme.S", ThrowableReturnDescriptor::with_shapes([S])),
        MessageDescriptor::new("status"),
    );
    let b = body(&m);
    assert_eq!(
        &b.stmts[2..4],
        &[
            Stmt::Assign {
                target: Expr::Field {
                    target: Box::new(Expr::local("result")),
                    name: "code".to_string(),
                },
                value: Expr::local("c"),
            },
            Stmt::Invoke(Expr::InvokeInstance {
                target: Box::new(Expr::local("result")),
                method: "setRetry".to_string(),
                args: vec![Expr::local("retry")],
            }),
        ]
    );
    assert_eq!(b.stmts[4], trim());
}

#[test]
fn locals_avoid_parameter_names() {
    let m = method(
        "clash",
        vec![
            ParameterDescriptor::format_arg("msg", "String"),
            ParameterDescriptor::format_arg("result", "String"),
            ParameterDescriptor::format_arg("st", "String"),
        ],
        ReturnDescriptor::throwable("com.acme.S", ThrowableReturnDescriptor::with_shapes([S])),
        MessageDescriptor::new("{0} {1} {2}"),
    );
    let b = body(&m);
    let declared: Vec<&str> = b
        .stmts
        .iter()
        .filter_map(|s| match s {
            Stmt::DeclareLocal { name, .. } => Some(name.as_str()),
            Stmt::TrimStackTrace { scratch, .. } => Some(scratch.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(declared, vec!["msg_", "result_", "st_"]);
}

#[test]
fn unknown_construction_param_is_an_error() {
    let m = method(
        "build",
        vec![ParameterDescriptor::format_arg("detail", "String")],
        ReturnDescriptor::throwable(
            "CustomException",
            ThrowableReturnDescriptor::default()
                .with_construction_params(vec![ConstructionParam::param("missing")]),
        ),
        MessageDescriptor::new("x"),
    );
    let interface = MessageInterface {
        name: "Messages".to_string(),
        package: Some("com.acme".to_string()),
        project_code: None,
        methods: vec![m],
        source_path: None,
        source_sha256: None,
    };
    let err = synthesize_interface(&interface, &GenerationConfig::default()).expect_err("error");
    let d = find_diagnostic(&err).expect("diagnostic");
    assert_eq!(d.code, DiagnosticCode::MSG0400UnknownConstructionParam);
    assert_eq!(d.subject.as_deref(), Some("Messages.build"));
}

#[test]
fn duplicate_params_and_multiple_causes_are_rejected() {
    let dup = method(
        "m",
        vec![
            ParameterDescriptor::format_arg("a", "int"),
            ParameterDescriptor::format_arg("a", "int"),
        ],
        ReturnDescriptor::value("String"),
        MessageDescriptor::new("x"),
    );
    let err = synthesize_body(&dup, "m$str", &IdFormat::default(), "").expect_err("dup");
    assert_eq!(
        find_diagnostic(&err).map(|d| d.code),
        Some(DiagnosticCode::MSG0401DuplicateParamName)
    );

    let two_causes = method(
        "m",
        vec![
            cause(),
            ParameterDescriptor::format_arg("other", "Throwable").with_role(ParamRole::Cause),
        ],
        ReturnDescriptor::throwable("com.acme.E", ThrowableReturnDescriptor::with_shapes([S])),
        MessageDescriptor::new("x"),
    );
    let err = synthesize_body(&two_causes, "m$str", &IdFormat::default(), "").expect_err("causes");
    assert_eq!(
        find_diagnostic(&err).map(|d| d.code),
        Some(DiagnosticCode::MSG0202MultipleCauses)
    );
}

#[test]
fn overloads_share_one_constant_and_accessor() {
    let interface = MessageInterface {
        name: "Messages".to_string(),
        package: Some("com.acme".to_string()),
        project_code: Some("EX".to_string()),
        methods: vec![
            method(
                "hello",
                Vec::new(),
                ReturnDescriptor::value("String"),
                MessageDescriptor::new("Hello"),
            ),
            method(
                "hello",
                vec![ParameterDescriptor::format_arg("name", "String")],
                ReturnDescriptor::value("String"),
                MessageDescriptor::new("Hello"),
            ),
        ],
        source_path: None,
        source_sha256: None,
    };
    let mut config = GenerationConfig::default();
    config.serial_version_uid = 7;
    let t = synthesize_interface(&interface, &config).expect("synthesize");

    assert_eq!(t.name, "Messages_$bundle");
    assert_eq!(
        t.implements,
        vec![
            TypeRef::new("com.acme.Messages"),
            TypeRef::new("java.io.Serializable")
        ]
    );
    let names: Vec<&str> = t.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["serialVersionUID", "hello"]);
    assert_eq!(t.fields[0].init, Expr::Long(7));
    let methods: Vec<&str> = t.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, vec!["hello$str", "hello", "hello"]);
}

#[test]
fn overloads_with_different_text_are_rejected() {
    let interface = MessageInterface {
        name: "Messages".to_string(),
        package: Some("com.acme".to_string()),
        project_code: None,
        methods: vec![
            method(
                "hello",
                Vec::new(),
                ReturnDescriptor::value("String"),
                MessageDescriptor::new("Hello"),
            ),
            method(
                "hello",
                vec![ParameterDescriptor::format_arg("n", "String")],
                ReturnDescriptor::value("String"),
                MessageDescriptor::new("Goodbye {0}"),
            ),
        ],
        source_path: None,
        source_sha256: None,
    };
    let err = synthesize_interface(&interface, &GenerationConfig::default()).expect_err("conflict");
    let d = find_diagnostic(&err).expect("diagnostic");
    assert_eq!(d.code, DiagnosticCode::MSG0402ConflictingOverloadText);
    assert_eq!(d.subject.as_deref(), Some("Messages.hello"));
    assert!(d.message.contains("Goodbye {0}"), "{}", d.message);
}

fn bound(name: &str) -> ParameterDescriptor {
    ParameterDescriptor::format_arg(name, "String").with_role(ParamRole::MessageBound)
}

#[test]
fn message_bound_params_feed_construction_slots() {
    let m = method(
        "build",
        vec![bound("code"), ParameterDescriptor::format_arg("v", "int")],
        ReturnDescriptor::throwable(
            "com.acme.CustomException",
            ThrowableReturnDescriptor::with_shapes([S]).with_construction_params(vec![
                ConstructionParam::message("detail"),
                ConstructionParam::param("code"),
            ]),
        ),
        MessageDescriptor::new("build {0}"),
    );
    let b = body(&m);
    assert_eq!(
        b.stmts[0],
        declare("msg", "String", format_call(vec![accessor("build"), Expr::local("v")]))
    );
    assert_eq!(
        construct_stmt(&b),
        &Expr::Construct {
            ty: TypeRef::new("com.acme.CustomException"),
            args: vec![Expr::local("msg"), Expr::local("code")],
        }
    );
}

#[test]
fn unbound_message_params_are_rejected() {
    let no_slots = method(
        "wrap",
        vec![bound("detail"), cause()],
        ReturnDescriptor::throwable(
            "java.lang.RuntimeException",
            ThrowableReturnDescriptor::with_shapes([S, ST, T]),
        ),
        MessageDescriptor::new("wrapped"),
    );
    let unnamed = method(
        "build",
        vec![bound("detail"), bound("code")],
        ReturnDescriptor::throwable(
            "com.acme.CustomException",
            ThrowableReturnDescriptor::default().with_construction_params(vec![
                ConstructionParam::message("detail"),
                ConstructionParam::param("code"),
            ]),
        ),
        MessageDescriptor::new("x"),
    );
    let value = method(
        "text",
        vec![bound("detail")],
        ReturnDescriptor::value("String"),
        MessageDescriptor::new("x"),
    );
    for m in [&no_slots, &unnamed, &value] {
        let accessor = format!("{}$str", m.name);
        let err = synthesize_body(m, &accessor, &IdFormat::default(), "EX").expect_err(&m.name);
        let d = find_diagnostic(&err).expect("diagnostic");
        assert_eq!(d.code, DiagnosticCode::MSG0403UnboundMessageParam, "{}", m.name);
        assert!(d.message.contains("\"detail\""), "{}", d.message);
    }
}
