#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use anyhow::bail;
use blockwire_engine::{CapabilityRegistry, Param, Shape, TypeBuilder};

pub type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sum {
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Pool {
    pub size: i32,
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub pool_size: i32,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hostname(pub String);

#[derive(Debug, Clone)]
pub struct Failing;

pub struct Fixture {
    pub registry: Arc<CapabilityRegistry>,
    pub journal: Journal,
    counter_calls: Arc<AtomicUsize>,
}

impl Fixture {
    /// Number of times `demo.Counter.of` has run.
    pub fn counter_calls(&self) -> usize {
        self.counter_calls.load(Ordering::SeqCst)
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

fn record(journal: &Journal, entry: String) {
    journal.lock().unwrap().push(entry);
}

pub fn fixture() -> Fixture {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let counter_calls = Arc::new(AtomicUsize::new(0));

    let calls = Arc::clone(&counter_calls);
    let counter = TypeBuilder::<Counter>::new("demo.Counter")
        .factory("of", [Param::new("value", Shape::Int)], move |args| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Counter { count: args.get(0)? })
        })
        .factory("fresh", [], |_| Ok(Counter { count: 0 }))
        .output("count", |counter: &Counter| counter.count)
        .input("add", Shape::Int, |counter: &mut Counter, step: i32| {
            counter.count += step;
            Ok(())
        });

    let sum = TypeBuilder::<Sum>::new("demo.Sum")
        .factory("of", [Param::variadic("values", Shape::Str)], |args| Ok(Sum { values: args.list(0)? }))
        .output("joined", |sum: &Sum| sum.values.join(","))
        .input_list("extra", Shape::Str, |sum: &mut Sum, extra: Vec<String>| {
            sum.values.extend(extra);
            Ok(())
        });

    let (start_journal, close_journal) = (Arc::clone(&journal), Arc::clone(&journal));
    let resource = TypeBuilder::<Resource>::new("demo.Resource")
        .factory("named", [Param::new("name", Shape::Str)], |args| Ok(Resource { name: args.get(0)? }))
        .output("name", |resource: &Resource| resource.name.clone())
        .on_start(move |resource: &mut Resource| {
            record(&start_journal, format!("start {}", resource.name));
            if resource.name == "bad-start" {
                bail!("{} refused to start", resource.name);
            }
            Ok(())
        })
        .on_close(move |resource: &mut Resource| {
            record(&close_journal, format!("close {}", resource.name));
            if resource.name.starts_with("bad") {
                bail!("{} refused to close", resource.name);
            }
            Ok(())
        });

    let pool_journal = Arc::clone(&journal);
    let pool = TypeBuilder::<Pool>::new("demo.Pool")
        .factory("open", [Param::new("size", Shape::Int)], |args| Ok(Pool { size: args.get(0)? }))
        .instance_factory("connect", [Param::new("label", Shape::Str)], |pool: &Pool, args| {
            Ok(Connection {
                pool_size: pool.size,
                label: args.optional(0)?,
            })
        })
        .on_close(move |pool: &mut Pool| {
            record(&pool_journal, format!("close pool {}", pool.size));
            Ok(())
        });

    let connection_journal = Arc::clone(&journal);
    let connection = TypeBuilder::<Connection>::new("demo.Connection")
        .instance_factory("reconnect", [], |connection: &Connection, _| Ok(connection.clone()))
        .on_close(move |connection: &mut Connection| {
            record(&connection_journal, format!("close connection {}", connection.label.as_deref().unwrap_or("-")));
            Ok(())
        });

    let hostname = TypeBuilder::<Hostname>::new("demo.Hostname").factory("parse", [Param::new("text", Shape::Str)], |args| {
        let text: String = args.get(0)?;
        if text.contains(' ') {
            bail!("hostnames cannot contain spaces");
        }
        Ok(Hostname(text.to_ascii_lowercase()))
    });

    let failing = TypeBuilder::<Failing>::new("demo.Failing")
        .factory("boom", [], |_| -> anyhow::Result<Failing> { bail!("detonated") });

    let registry = CapabilityRegistry::builder()
        .register(counter)
        .register(sum)
        .register(resource)
        .register(pool)
        .register(connection)
        .register(hostname)
        .register(failing)
        .build();

    Fixture {
        registry: Arc::new(registry),
        journal,
        counter_calls,
    }
}
