//! Example: replicas counting from their own threads over slow mailboxes.
//!
//! Each replica increments a random number of times with random pauses.
//! Values are printed while deliveries are still in flight and again once
//! every mailbox has drained.

use std::io;
use std::thread;
use std::time::Duration;

use crdt_relay::prelude::*;
use log::LevelFilter;
use rand::Rng;

fn setup_logger(level: LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:?}][{}] {}",
                thread::current().id(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stdout())
        .apply()?;
    Ok(())
}

fn print_values(replicas: &[ReplicaHandle]) {
    for r in replicas {
        println!("Replica {} says {}", r.id(), r.value());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logger(LevelFilter::Info)?;

    println!("=== G-Counter relay with mailbox delivery ===\n");

    let registry = Registry::builder().delivery(DeliveryMode::Mailbox).build();
    let replicas: Vec<_> = (0..4).map(|_| registry.register()).collect();

    let workers: Vec<_> = replicas
        .iter()
        .cloned()
        .map(|replica| {
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                let times = rng.gen_range(1..=5);
                for _ in 0..times {
                    thread::sleep(Duration::from_millis(rng.gen_range(0..50)));
                    replica.increment();
                }
                times
            })
        })
        .collect();

    let mut issued = 0;
    for worker in workers {
        issued += worker.join().map_err(|_| "replica thread panicked")?;
    }

    println!("--- Before flush ---");
    print_values(&replicas);

    registry.flush()?;

    println!("\n--- After flush ({issued} increments issued) ---");
    print_values(&replicas);

    println!("\n=== A late joiner only converges going forward ===\n");

    let late = registry.register();
    println!("Replica {} joins with {}", late.id(), late.value());
    replicas[0].increment();
    registry.flush()?;
    print_values(&[replicas[0].clone(), late]);

    Ok(())
}
