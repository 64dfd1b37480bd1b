//! The demo command tree served by the CLI.

use std::time::Duration;

use cmdtree_engine::{
    Arguments, CommandNode, CommandNodeBuilder, ConfigError, Dispatcher, EngineConfig, ErrorKind,
    HandlerError, InMemoryCooldowns, MetadataPermissionGate, ParameterSpec, SubcommandBuilder,
    SubcommandDefinition, Value, ValueType,
};

/// Permission needed for `message urgent`.
pub const URGENT_PERMISSION: &str = "message.urgent";

const FRUITS: [&str; 4] = ["APPLE", "BANANA", "ORANGE", "STRAWBERRY"];

fn fruit_type() -> ValueType {
    ValueType::from_static("fruit")
}

/// Builds a dispatcher over the demo tree.
pub fn dispatcher(config: EngineConfig) -> Result<Dispatcher, ConfigError> {
    let prefix = config.prefix.clone();
    Dispatcher::builder()
        .config(config)
        .permission_gate(MetadataPermissionGate)
        .cooldown_gate(InMemoryCooldowns::new())
        .choice_type(fruit_type(), FRUITS)
        .on_error(ErrorKind::PlainText, move |_, sender| {
            eprintln!("{}: commands start with '{prefix}'", sender.id());
        })
        .commands([echo(), math(), fruit(), message(), roll()])
        .build()
}

fn echo() -> CommandNodeBuilder {
    CommandNode::builder("echo")
        .alias("say")
        .description("Print the arguments back")
        .default_overload(
            SubcommandDefinition::builder()
                .param(ParameterSpec::new("words", ValueType::TEXT).variadic())
                .handler(|args| {
                    let words: Vec<&str> = args.list(0)?.iter().filter_map(Value::as_str).collect();
                    Ok(Some(Value::Text(words.join(" "))))
                }),
        )
}

fn math() -> CommandNodeBuilder {
    let operands = |definition: SubcommandBuilder| {
        definition
            .param(ParameterSpec::new("a", ValueType::INTEGER))
            .param(ParameterSpec::new("b", ValueType::INTEGER))
    };

    CommandNode::builder("math")
        .description("Integer arithmetic")
        .subcommand(
            operands(SubcommandDefinition::named("add").alias("plus"))
                .handler(|args| Ok(Some(Value::Integer(args.integer(0)?.saturating_add(args.integer(1)?))))),
        )
        .subcommand(
            operands(SubcommandDefinition::named("sub").alias("minus"))
                .handler(|args| Ok(Some(Value::Integer(args.integer(0)?.saturating_sub(args.integer(1)?))))),
        )
        .subcommand(
            SubcommandDefinition::named("sum")
                .param(ParameterSpec::new("values", ValueType::INTEGER).variadic())
                .handler(|args| {
                    let total = args
                        .list(0)?
                        .iter()
                        .filter_map(Value::as_integer)
                        .fold(0i64, i64::saturating_add);
                    Ok(Some(Value::Integer(total)))
                }),
        )
}

fn fruit() -> CommandNodeBuilder {
    CommandNode::builder("fruit")
        .description("Pick a fruit")
        .subcommand(
            SubcommandDefinition::named("list")
                .handler(|_| Ok(Some(Value::Text(FRUITS.join(", "))))),
        )
        .default_overload(
            SubcommandDefinition::builder()
                .param(ParameterSpec::new("kind", fruit_type()))
                .handler(|args| {
                    let kind = args.get(0).and_then(Value::as_str).unwrap_or_default();
                    Ok(Some(Value::Text(format!("you picked {kind}"))))
                }),
        )
}

fn message() -> CommandNodeBuilder {
    let body = || ParameterSpec::new("body", ValueType::TEXT).variadic();
    let render = |label: &'static str| {
        move |args: Arguments| -> Result<Option<Value>, HandlerError> {
            let words: Vec<&str> = args.list(1)?.iter().filter_map(Value::as_str).collect();
            let from = args.sender(0)?.id().to_string();
            Ok(Some(Value::Text(format!("[{label}] {from}: {}", words.join(" ")))))
        }
    };

    CommandNode::builder("message")
        .alias("msg")
        .description("Post a message")
        .subcommand(
            SubcommandDefinition::named("urgent")
                .alias("u")
                .alias("urg")
                .permission(URGENT_PERMISSION)
                .sender(ValueType::SENDER)
                .param(body().constraint("not_blank", None))
                .handler(render("urgent")),
        )
        .subcommand(
            SubcommandDefinition::named("note")
                .alias("n")
                .sender(ValueType::SENDER)
                .param(body())
                .handler(render("note")),
        )
}

fn roll() -> CommandNodeBuilder {
    CommandNode::builder("roll")
        .description("Roll a die")
        .cooldown(Duration::from_secs(3))
        .default_overload(SubcommandDefinition::builder().handler(|_| Ok(Some(Value::Integer(die(6))))))
        .default_overload(
            SubcommandDefinition::builder()
                .param(ParameterSpec::new("sides", ValueType::INTEGER).constraint("range", Some("2..1000")))
                .handler(|args| Ok(Some(Value::Integer(die(args.integer(0)?))))),
        )
}

/// Pseudo-random roll in `1..=sides` seeded from the clock.
fn die(sides: i64) -> i64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or_default();
    i64::from(nanos) % sides.max(1) + 1
}
