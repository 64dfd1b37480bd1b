//! Invocation pipeline behaviour: overload fallback, variadics, gates and
//! error routing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use cmdtree_engine::{
    BasicSender, CommandNode, ConfigError, DispatchError, Dispatcher, ErrorKind, HandlerError,
    InMemoryCooldowns, InvocationError, InvocationOutcome, MetadataPermissionGate, ParameterSpec,
    Sender, SubcommandDefinition, Value, ValueType,
};

fn sender(id: &str) -> Arc<dyn Sender> {
    Arc::new(BasicSender::new(id, ValueType::SENDER))
}

// ============================================================================
// OVERLOAD AND BINDING TESTS
// ============================================================================

mod binding_tests {
    use super::*;

    fn echo() -> Dispatcher {
        Dispatcher::builder()
            .command(
                CommandNode::builder("echo").default_overload(
                    SubcommandDefinition::builder()
                        .param(ParameterSpec::new("first", ValueType::TEXT))
                        .sender(ValueType::SENDER)
                        .param(ParameterSpec::new("rest", ValueType::INTEGER).variadic())
                        .handler(|args| {
                            let count = args.list(2)?.len() as i64;
                            Ok(Some(Value::Integer(count)))
                        }),
                ),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_variadic_element_count() {
        let dispatcher = echo();
        let console = sender("console");
        for (input, expected) in [("/echo a", 0), ("/echo a 1", 1), ("/echo a 1 2 3 4", 4)] {
            let outcome = dispatcher.invoke(&console, input).unwrap();
            assert_eq!(outcome.value(), Some(&Value::Integer(expected)), "{input}");
        }
        assert!(matches!(
            dispatcher.invoke(&console, "/echo"),
            Err(DispatchError::Invocation(InvocationError::IncorrectArgumentCount { .. }))
        ));
        assert!(matches!(
            dispatcher.invoke(&console, "/echo a 1 two"),
            Err(DispatchError::Invocation(InvocationError::ArgumentParse { .. }))
        ));
    }

    #[test]
    fn test_stable_order_routes_to_first_binding_candidate() {
        let dispatcher = Dispatcher::builder()
            .command(
                CommandNode::builder("cmd")
                    .default_overload(
                        SubcommandDefinition::builder()
                            .param(ParameterSpec::new("n", ValueType::INTEGER))
                            .handler(|_| Ok(Some(Value::from("A")))),
                    )
                    .default_overload(
                        SubcommandDefinition::builder()
                            .param(ParameterSpec::new("s", ValueType::TEXT))
                            .handler(|_| Ok(Some(Value::from("B")))),
                    ),
            )
            .build()
            .unwrap();
        let console = sender("console");

        let outcome = dispatcher.invoke(&console, "/cmd hello").unwrap();
        assert_eq!(outcome.value(), Some(&Value::from("B")));

        let outcome = dispatcher.invoke(&console, "/cmd 7").unwrap();
        assert_eq!(outcome.value(), Some(&Value::from("A")));
    }

    #[test]
    fn test_last_candidate_error_is_surfaced() {
        let dispatcher = Dispatcher::builder()
            .command(
                CommandNode::builder("set")
                    .default_overload(
                        SubcommandDefinition::builder()
                            .param(ParameterSpec::new("number", ValueType::INTEGER)),
                    )
                    .default_overload(
                        SubcommandDefinition::builder()
                            .param(ParameterSpec::new("flag", ValueType::BOOLEAN)),
                    ),
            )
            .build()
            .unwrap();

        match dispatcher.invoke(&sender("console"), "/set maybe") {
            Err(DispatchError::Invocation(InvocationError::ArgumentParse { parameter, .. })) => {
                assert_eq!(parameter, "flag");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_validation_failure_tries_next_candidate() {
        let dispatcher = Dispatcher::builder()
            .command(
                CommandNode::builder("volume")
                    .default_overload(
                        SubcommandDefinition::builder()
                            .param(ParameterSpec::new("level", ValueType::INTEGER).constraint("range", Some("0..10")))
                            .handler(|args| Ok(Some(Value::Integer(args.integer(0)?)))),
                    )
                    .default_overload(
                        SubcommandDefinition::builder()
                            .param(ParameterSpec::new("preset", ValueType::TEXT).constraint("pattern", Some("[a-z]+")))
                            .handler(|args| Ok(Some(Value::from(args.text(0)?)))),
                    ),
            )
            .build()
            .unwrap();
        let console = sender("console");

        let outcome = dispatcher.invoke(&console, "/volume 5").unwrap();
        assert_eq!(outcome.value(), Some(&Value::Integer(5)));

        let outcome = dispatcher.invoke(&console, "/volume loud").unwrap();
        assert_eq!(outcome.value(), Some(&Value::from("loud")));

        assert!(matches!(
            dispatcher.invoke(&console, "/volume 11"),
            Err(DispatchError::Invocation(InvocationError::ArgumentValidation { .. }))
        ));
    }

    #[test]
    fn test_named_subcommand_and_child_descent() {
        let dispatcher = Dispatcher::builder()
            .command(
                CommandNode::builder("math")
                    .subcommand(
                        SubcommandDefinition::named("add")
                            .alias("plus")
                            .param(ParameterSpec::new("a", ValueType::INTEGER))
                            .param(ParameterSpec::new("b", ValueType::INTEGER))
                            .handler(|args| Ok(Some(Value::Integer(args.integer(0)? + args.integer(1)?)))),
                    )
                    .child(
                        CommandNode::builder("float").subcommand(
                            SubcommandDefinition::named("half")
                                .param(ParameterSpec::new("x", ValueType::FLOAT))
                                .handler(|args| Ok(Some(Value::Float(args.float(0)? / 2.0)))),
                        ),
                    ),
            )
            .build()
            .unwrap();
        let console = sender("console");

        let outcome = dispatcher.invoke(&console, "/MATH Plus 2 3").unwrap();
        assert_eq!(outcome.value(), Some(&Value::Integer(5)));

        let outcome = dispatcher.invoke(&console, "/math float half 3").unwrap();
        assert_eq!(outcome.value(), Some(&Value::Float(1.5)));

        assert!(matches!(
            dispatcher.invoke(&console, "/math 1 2"),
            Err(DispatchError::Invocation(InvocationError::SubcommandNotFound { .. }))
        ));
    }
}

// ============================================================================
// GATE TESTS
// ============================================================================

mod gate_tests {
    use super::*;

    #[test]
    fn test_node_permission_veto() {
        let dispatcher = Dispatcher::builder()
            .permission_gate(MetadataPermissionGate)
            .command(
                CommandNode::builder("ban")
                    .permission("admin")
                    .default_overload(SubcommandDefinition::builder()),
            )
            .command(CommandNode::builder("help").default_overload(SubcommandDefinition::builder()))
            .build()
            .unwrap();

        let guest = sender("guest");
        let admin: Arc<dyn Sender> =
            Arc::new(BasicSender::new("root", ValueType::SENDER).with_permission("admin"));

        match dispatcher.invoke(&guest, "/ban") {
            Err(DispatchError::Invocation(InvocationError::NotEnoughPermission { target })) => {
                assert_eq!(target, "ban");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(dispatcher.invoke(&admin, "/ban").unwrap().is_completed());

        assert_eq!(dispatcher.suggest(guest.as_ref(), "/").unwrap(), vec!["help"]);
        assert_eq!(dispatcher.suggest(admin.as_ref(), "/").unwrap().len(), 2);
    }

    #[test]
    fn test_node_veto_precedes_arity() {
        let dispatcher = Dispatcher::builder()
            .permission_gate(MetadataPermissionGate)
            .command(
                CommandNode::builder("ban")
                    .permission("admin")
                    .default_overload(
                        SubcommandDefinition::builder()
                            .param(ParameterSpec::new("who", ValueType::TEXT)),
                    )
                    .subcommand(SubcommandDefinition::named("list")),
            )
            .command(CommandNode::builder("help"))
            .build()
            .unwrap();

        let guest = sender("guest");
        for input in ["/ban", "/ban a b", "/ban list extra"] {
            match dispatcher.invoke(&guest, input) {
                Err(DispatchError::Invocation(InvocationError::NotEnoughPermission { target })) => {
                    assert_eq!(target, "ban", "{input}");
                }
                other => panic!("unexpected for {input}: {other:?}"),
            }
        }

        // No groups at all still reports the veto, not a missing subcommand.
        let restricted = Dispatcher::builder()
            .permission_gate(MetadataPermissionGate)
            .command(CommandNode::builder("vault").permission("admin"))
            .build()
            .unwrap();
        assert!(matches!(
            restricted.invoke(&guest, "/vault"),
            Err(DispatchError::Invocation(InvocationError::NotEnoughPermission { .. }))
        ));
    }

    #[test]
    fn test_vetoed_candidate_leaves_others() {
        let dispatcher = Dispatcher::builder()
            .permission_gate(MetadataPermissionGate)
            .command(
                CommandNode::builder("kick")
                    .default_overload(
                        SubcommandDefinition::builder()
                            .param(ParameterSpec::new("who", ValueType::TEXT))
                            .permission("mod")
                            .handler(|_| Ok(Some(Value::from("kicked")))),
                    )
                    .default_overload(
                        SubcommandDefinition::builder()
                            .param(ParameterSpec::new("who", ValueType::TEXT))
                            .handler(|_| Ok(Some(Value::from("requested")))),
                    ),
            )
            .build()
            .unwrap();

        let outcome = dispatcher.invoke(&sender("guest"), "/kick bob").unwrap();
        assert_eq!(outcome.value(), Some(&Value::from("requested")));

        let moderator: Arc<dyn Sender> =
            Arc::new(BasicSender::new("m", ValueType::SENDER).with_permission("mod"));
        let outcome = dispatcher.invoke(&moderator, "/kick bob").unwrap();
        assert_eq!(outcome.value(), Some(&Value::from("kicked")));
    }

    #[test]
    fn test_preconditions_short_circuit() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let dispatcher = Dispatcher::builder()
            .command(
                CommandNode::builder("stop")
                    .before(|sender: &dyn Sender, _: &CommandNode| sender.id() == "op")
                    .before(move |_: &dyn Sender, _: &CommandNode| {
                        *counter.lock().unwrap() += 1;
                        true
                    })
                    .default_overload(SubcommandDefinition::builder()),
            )
            .build()
            .unwrap();

        match dispatcher.invoke(&sender("guest"), "/stop") {
            Err(DispatchError::Invocation(InvocationError::BeforeCommandFailed { command })) => {
                assert_eq!(command, "stop");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(*calls.lock().unwrap(), 0);

        assert!(dispatcher.invoke(&sender("op"), "/stop").unwrap().is_completed());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_cooldown_recorded_after_success() {
        let cooldowns = Arc::new(InMemoryCooldowns::new());
        let dispatcher = Dispatcher::builder()
            .shared_cooldown_gate(cooldowns.clone())
            .command(
                CommandNode::builder("roll")
                    .cooldown(Duration::from_secs(60))
                    .default_overload(
                        SubcommandDefinition::builder()
                            .param(ParameterSpec::new("sides", ValueType::INTEGER)),
                    ),
            )
            .command(CommandNode::builder("free").default_overload(SubcommandDefinition::builder()))
            .build()
            .unwrap();

        let alice = sender("alice");
        assert!(matches!(
            dispatcher.invoke(&alice, "/roll six"),
            Err(DispatchError::Invocation(InvocationError::ArgumentParse { .. }))
        ));
        assert!(cooldowns.is_empty());

        assert!(dispatcher.invoke(&alice, "/roll 6").unwrap().is_completed());
        match dispatcher.invoke(&alice, "/roll 6") {
            Err(DispatchError::Invocation(InvocationError::OnCooldown { remaining, .. })) => {
                assert!(remaining > Duration::from_secs(50));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(dispatcher.invoke(&sender("bob"), "/roll 6").unwrap().is_completed());

        dispatcher.invoke(&alice, "/free").unwrap();
        dispatcher.invoke(&alice, "/free").unwrap();
        assert_eq!(cooldowns.len(), 2);

        cooldowns.clear_sender("alice");
        assert!(dispatcher.invoke(&alice, "/roll 6").unwrap().is_completed());
    }
}

// ============================================================================
// ERROR ROUTING TESTS
// ============================================================================

mod error_routing_tests {
    use super::*;

    #[test]
    fn test_registered_kind_is_handled() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let dispatcher = Dispatcher::builder()
            .on_error(ErrorKind::CommandNotFound, move |err, sender| {
                sink.lock().unwrap().push(format!("{}: {err}", sender.id()));
            })
            .command(CommandNode::builder("known").default_overload(SubcommandDefinition::builder()))
            .build()
            .unwrap();

        let outcome = dispatcher.invoke(&sender("eve"), "/unknown").unwrap();
        assert_eq!(outcome, InvocationOutcome::Handled(ErrorKind::CommandNotFound));
        assert_eq!(*seen.lock().unwrap(), vec!["eve: unknown command 'unknown'"]);

        assert!(matches!(
            dispatcher.invoke(&sender("eve"), "known"),
            Err(DispatchError::Invocation(InvocationError::PlainText { .. }))
        ));
    }

    #[test]
    fn test_handler_engine_errors_are_dispatched() {
        let dispatcher = Dispatcher::builder()
            .on_error(ErrorKind::NotEnoughPermission, |_, _| {})
            .command(
                CommandNode::builder("secret").default_overload(
                    SubcommandDefinition::builder().handler(|_| {
                        Err(HandlerError::from(InvocationError::not_enough_permission("secret")))
                    }),
                ),
            )
            .build()
            .unwrap();

        let outcome = dispatcher.invoke(&sender("eve"), "/secret").unwrap();
        assert_eq!(outcome, InvocationOutcome::Handled(ErrorKind::NotEnoughPermission));
    }

    #[test]
    fn test_foreign_handler_errors_propagate() {
        let mut builder = Dispatcher::builder();
        for &kind in ErrorKind::all() {
            builder = builder.on_error(kind, |_, _| {});
        }
        let dispatcher = builder
            .command(
                CommandNode::builder("explode").default_overload(
                    SubcommandDefinition::builder().handler(|_| Err(anyhow!("boom").into())),
                ),
            )
            .build()
            .unwrap();

        match dispatcher.invoke(&sender("eve"), "/explode") {
            Err(DispatchError::Handler(err)) => assert_eq!(err.to_string(), "boom"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_config_errors_abort_build() {
        let result = Dispatcher::builder()
            .command(CommandNode::builder("dup"))
            .command(CommandNode::builder("DUP"))
            .build();
        assert!(matches!(result, Err(ConfigError::DuplicateAlias { .. })));

        let result = Dispatcher::builder()
            .command(CommandNode::builder("bad").default_overload(
                SubcommandDefinition::builder()
                    .param(ParameterSpec::new("rest", ValueType::TEXT).variadic())
                    .param(ParameterSpec::new("tail", ValueType::TEXT)),
            ))
            .build();
        assert!(matches!(result, Err(ConfigError::VariadicNotLast { .. })));
    }
}
