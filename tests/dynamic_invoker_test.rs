//! Integration tests for heterogeneous invocation over a shared context

use fanout_core::constants::status;
use fanout_core::validation::assert;
use fanout_core::{
    invoke_concurrent, promisify, DynamicInvoker, FanOutConfig, FanOutError, HandlerRegistry,
    Promise, Resolved, TaskContext, TaskError,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
enum Lookup {
    User { id: u64, name: String },
    Balance(i64),
    Tags(Vec<String>),
}

type Delays = HashMap<&'static str, u64>;

fn delays() -> TaskContext<Delays> {
    let mut delays = HashMap::new();
    delays.insert("user", 200);
    delays.insert("balance", 100);
    delays.insert("tags", 150);
    TaskContext::new(delays)
}

fn pause(ctx: &TaskContext<Delays>, key: &str) {
    std::thread::sleep(Duration::from_millis(ctx.values()[key]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_shapes_resolve_to_plain_values_in_order() {
    let promises = vec![
        promisify(
            |ctx: &TaskContext<Delays>, id: u64| {
                pause(ctx, "user");
                Ok(Resolved::Boxed(Box::new(Lookup::User {
                    id,
                    name: "grace".to_string(),
                })))
            },
            7,
        ),
        Promise::new(|ctx: &TaskContext<Delays>| {
            pause(ctx, "balance");
            Ok(Resolved::Value(Lookup::Balance(-12)))
        }),
        promisify(
            |ctx: &TaskContext<Delays>, tags: Vec<String>| {
                pause(ctx, "tags");
                Ok(Resolved::Shared(Arc::new(Lookup::Tags(tags))))
            },
            vec!["admin".to_string(), "ops".to_string()],
        ),
    ];

    let started = Instant::now();
    let out = invoke_concurrent(delays(), promises).await.unwrap();

    assert_eq!(
        out,
        vec![
            Lookup::User {
                id: 7,
                name: "grace".to_string()
            },
            Lookup::Balance(-12),
            Lookup::Tags(vec!["admin".to_string(), "ops".to_string()]),
        ]
    );
    assert!(started.elapsed() < Duration::from_millis(420));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_promise_fails_the_invocation() {
    let promises: Vec<Promise<Delays, Lookup>> = vec![
        Promise::new(|ctx: &TaskContext<Delays>| {
            pause(ctx, "user");
            Ok(Resolved::Value(Lookup::Balance(1)))
        }),
        promisify(
            |_: &TaskContext<Delays>, amount: i64| {
                assert(
                    amount >= 0,
                    "NEGATIVE_BALANCE",
                    status::CONFLICT,
                    "Balance went negative",
                )?;
                Ok(Resolved::Value(Lookup::Balance(amount)))
            },
            -5,
        ),
    ];

    let result = invoke_concurrent(delays(), promises).await;
    assert_eq!(
        result,
        Err(FanOutError::TaskFailed(
            "409:NEGATIVE_BALANCE:Balance went negative".to_string()
        ))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn registry_handlers_mix_with_bound_promises() {
    let mut registry: HandlerRegistry<Delays, Lookup> = HandlerRegistry::new();
    registry
        .register("balance", |_, args| {
            let amount: i64 = serde_json::from_value(args["amount"].clone())?;
            Ok(Resolved::Value(Lookup::Balance(amount)))
        })
        .register("tags", |_, args| {
            let tags: Vec<String> = serde_json::from_value(args)?;
            Ok(Resolved::Boxed(Box::new(Lookup::Tags(tags))))
        });

    let invoker = DynamicInvoker::new().with_registry(registry);
    let out = invoker
        .invoke(
            delays(),
            vec![
                Promise::named("tags", json!(["x"])),
                Promise::new(|_: &TaskContext<Delays>| Ok(Resolved::Value(Lookup::Balance(0)))),
                Promise::named("balance", json!({"amount": 250})),
            ],
        )
        .await
        .unwrap();

    assert_eq!(
        out,
        vec![
            Lookup::Tags(vec!["x".to_string()]),
            Lookup::Balance(0),
            Lookup::Balance(250),
        ]
    );
}

#[tokio::test]
async fn malformed_handler_args_are_invalid_arguments() {
    let mut registry: HandlerRegistry<(), i64> = HandlerRegistry::new();
    registry.register("double", |_, args| {
        let n: i64 = serde_json::from_value(args)?;
        Ok(Resolved::Value(n * 2))
    });

    let result = DynamicInvoker::new()
        .with_registry(registry)
        .invoke(TaskContext::new(()), vec![Promise::named("double", json!("two"))])
        .await;

    let message = result.unwrap_err().message().to_string();
    assert!(
        message.starts_with("Invalid argument: Malformed arguments:"),
        "{message}"
    );
}

#[tokio::test]
async fn unregistered_name_is_reported() {
    let result = invoke_concurrent::<(), i64>(
        TaskContext::new(()),
        vec![Promise::named("fetch_profile", json!({}))],
    )
    .await;

    assert_eq!(
        result,
        Err(FanOutError::TaskFailed(
            "Invalid argument: fetch_profile is not a registered function".to_string()
        ))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_context_sees_sibling_failure() {
    let observed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&observed);
    let invoker = DynamicInvoker::new().with_config(FanOutConfig {
        drain_on_failure: true,
        ..FanOutConfig::default()
    });

    let promises: Vec<Promise<(), u8>> = vec![
        Promise::new(move |ctx: &TaskContext<()>| {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !ctx.is_cancelled() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(5));
            }
            flag.store(ctx.is_cancelled(), Ordering::SeqCst);
            Ok(Resolved::Value(0))
        }),
        Promise::new(|_: &TaskContext<()>| Err(TaskError::unexpected("quota exhausted"))),
    ];

    let result = invoker
        .invoke(TaskContext::new(()).with_timeout(Duration::from_secs(5)), promises)
        .await;

    assert_eq!(
        result,
        Err(FanOutError::TaskFailed("quota exhausted".to_string()))
    );
    assert!(observed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn empty_promise_list_yields_empty_output() {
    let out = invoke_concurrent::<(), u8>(TaskContext::new(()), Vec::new())
        .await
        .unwrap();
    assert!(out.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_promise_gets_its_own_worker() {
    let promises: Vec<Promise<(), usize>> = (0..600)
        .map(|index| {
            promisify(
                |_: &TaskContext<()>, index: usize| {
                    std::thread::sleep(Duration::from_millis(400));
                    Ok(Resolved::Value(index))
                },
                index,
            )
        })
        .collect();

    let started = Instant::now();
    let out = invoke_concurrent(TaskContext::new(()), promises).await.unwrap();

    assert_eq!(out, (0..600).collect::<Vec<_>>());
    assert!(started.elapsed() < Duration::from_millis(750));
}
