//! Built-in demo producer types available to `blockwire run`.

use anyhow::{Result, bail};
use blockwire_engine::{CapabilityRegistry, Param, Shape, TypeBuilder};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joiner {
    pub parts: Vec<String>,
}

/// A named service that must be started before use and released afterwards.
#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub running: bool,
}

#[derive(Debug, Clone)]
pub struct Client {
    pub service: String,
    pub label: Option<String>,
}

pub fn demo_registry() -> CapabilityRegistry {
    CapabilityRegistry::builder()
        .register(counter())
        .register(joiner())
        .register(service())
        .register(client())
        .build()
}

fn counter() -> TypeBuilder<Counter> {
    TypeBuilder::new("demo.Counter")
        .factory("of", [Param::new("value", Shape::Int)], |args| Ok(Counter { count: args.get(0)? }))
        .factory("zero", [], |_| Ok(Counter { count: 0 }))
        .output("count", |counter: &Counter| counter.count)
        .input("add", Shape::Int, |counter: &mut Counter, step: i32| {
            counter.count = counter
                .count
                .checked_add(step)
                .ok_or_else(|| anyhow::anyhow!("counter overflow adding {step}"))?;
            Ok(())
        })
}

fn joiner() -> TypeBuilder<Joiner> {
    TypeBuilder::new("demo.Joiner")
        .factory("of", [Param::variadic("parts", Shape::Str)], |args| Ok(Joiner { parts: args.list(0)? }))
        .output("joined", |joiner: &Joiner| joiner.parts.join(" "))
        .output("len", |joiner: &Joiner| joiner.parts.len() as i32)
}

fn service() -> TypeBuilder<Service> {
    TypeBuilder::new("demo.Service")
        .factory("named", [Param::new("name", Shape::Str)], |args| {
            let name: Option<String> = args.optional(0)?;
            let Some(name) = name.filter(|name| !name.trim().is_empty()) else {
                bail!("a service needs a non-empty name");
            };
            Ok(Service { name, running: false })
        })
        .output("name", |service: &Service| service.name.clone())
        .output("running", |service: &Service| service.running)
        .instance_factory("client", [Param::new("label", Shape::Str)], |service: &Service, args| {
            Ok(Client {
                service: service.name.clone(),
                label: args.optional(0)?,
            })
        })
        .on_start(|service: &mut Service| {
            info!(service = %service.name, "service started");
            service.running = true;
            Ok(())
        })
        .on_close(|service: &mut Service| {
            info!(service = %service.name, was_running = service.running, "service stopped");
            service.running = false;
            Ok(())
        })
}

fn client() -> TypeBuilder<Client> {
    TypeBuilder::new("demo.Client")
        .output("service", |client: &Client| client.service.clone())
        .on_close(|client: &mut Client| {
            info!(service = %client.service, label = ?client.label, "client disconnected");
            Ok(())
        })
}
