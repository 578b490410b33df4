use std::process::ExitCode;
use std::sync::Arc;

use tether_core::{
    DelegateError, Multicast, WorkerConfig, WorkerThread, bind, bind_async,
};
use tracing_subscriber::EnvFilter;

/// Prints on every clone, so an extra copy on the way to the worker would show.
#[derive(Debug)]
struct Tracked;

impl Clone for Tracked {
    fn clone(&self) -> Self {
        println!("Tracked::clone");
        Tracked
    }
}

struct First {
    data: i32,
}

impl First {
    fn call0(&self) {
        println!("First::call0 {}", self.data);
    }

    fn call1(&self, p1: i32) {
        println!("First::call1 {} {p1}", self.data);
    }

    fn call2(&self, p1: i32, p2: f32) {
        let thread = std::thread::current();
        println!(
            "First::call2 {} {p1} {p2} on {}",
            self.data,
            thread.name().unwrap_or("?")
        );
    }

    fn take(&self, tracked: Tracked) {
        println!("First::take {tracked:?}");
    }
}

struct Second {
    data: i32,
}

impl Second {
    fn call1(&self, p1: i32) {
        println!("Second::call1 {} {p1}", self.data);
    }

    fn call2(&self, p1: i32, p2: f32) {
        println!("Second::call2 {} {p1} {p2}", self.data);
    }

    fn message(&self, msg: String) {
        println!("Second::message {msg}");
    }
}

fn load_config() -> Result<WorkerConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            Ok(WorkerConfig::from_json(&raw)?)
        }
        None => Ok(WorkerConfig {
            name: "tether-demo".to_string(),
            ..WorkerConfig::default()
        }),
    }
}

fn run(config: WorkerConfig) -> Result<(), DelegateError> {
    let first = Arc::new(First { data: 7 });
    let second = Arc::new(Second { data: 6 });

    // (A) 同期 delegate
    bind::<_, ()>(&first, First::call0).invoke(())?;
    let direct = bind::<_, (i32,)>(&first, First::call1);
    direct.invoke((1,))?;

    // (B) multicast: 登録して一部を外す
    let mut multi1: Multicast<(i32,)> = Multicast::new();
    let mut multi2: Multicast<(i32, f32)> = Multicast::new();
    multi1 += &direct;
    multi2 += &bind::<_, (i32, f32)>(&first, First::call2);
    multi1 += &bind::<_, (i32,)>(&second, Second::call1);
    multi2 += &bind::<_, (i32, f32)>(&second, Second::call2);

    multi1 -= &bind::<_, (i32,)>(&first, First::call1);
    tracing::info!(remaining = multi1.len(), "multi1 after remove");

    multi1.invoke((5,))?;
    multi2.invoke((2, 0.5))?;

    // (C) ワーカースレッドへ非同期 dispatch
    let worker = WorkerThread::builder().config(config).spawn()?;
    bind_async::<_, (i32, f32)>(&first, First::call2, worker.clone()).invoke((255, 1.0))?;
    bind_async::<_, (String,)>(&second, Second::message, worker.clone())
        .invoke(("I come from the main thread.".to_string(),))?;
    bind_async::<_, (Tracked,)>(&first, First::take, worker.clone()).invoke((Tracked,))?;

    worker.shutdown()?;
    match serde_json::to_string(&worker.stats()) {
        Ok(stats) => tracing::info!(%stats, "worker finished"),
        Err(err) => tracing::warn!(error = %err, "could not encode worker stats"),
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TETHER_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load worker config");
            return ExitCode::FAILURE;
        }
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "demo failed");
            ExitCode::FAILURE
        }
    }
}
