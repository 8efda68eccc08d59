use std::{cell::RefCell, rc::Rc};

use anyhow::Context;
use aplus::{task::Executor, Error, Future, Outcome, Resolution};
use clap::Parser;
use log::info;

/// Build a chain of futures, settle its root and watch it unwind.
#[derive(Parser)]
struct Args {
    /// How many futures the root is nested inside.
    #[arg(short, long, default_value_t = 3)]
    depth: usize,

    /// How many sibling observers subscribe to the outermost future.
    #[arg(short, long, default_value_t = 2)]
    observers: usize,

    /// Reject the root instead of fulfilling it.
    #[arg(long)]
    reject: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let root = Future::<u64>::deferred();

    let mut outer = root.promise.clone();
    for level in 0..args.depth {
        info!("nesting level {level}");
        outer = Future::<u64>::resolve(Resolution::thenable(outer));
    }

    let order = Rc::new(RefCell::new(Vec::new()));
    let links: Vec<_> = (0..args.observers)
        .map(|n| {
            let order = order.clone();
            outer.then(
                Some(Box::new(move |v: u64| -> Outcome<u64> {
                    order.borrow_mut().push(n);
                    Ok((v + n as u64).into())
                })),
                Some(Box::new(move |reason: Error| -> Outcome<u64> {
                    println!("observer {n} saw rejection: {reason}");
                    Err(reason)
                })),
            )
        })
        .collect();

    if args.reject {
        root.reject.call("rejected on request");
    } else {
        root.resolve.call(40u64);
    }

    for (n, link) in links.iter().enumerate() {
        match Executor::block_on(link) {
            Ok(v) => println!("observer {n} -> {v}"),
            Err(Error::Reason(reason)) => println!("observer {n} rejected: {reason}"),
            Err(e) => return Err(e).context("chain did not settle"),
        }
    }

    Executor::run();
    info!("notification order: {:?}", order.borrow());

    Ok(())
}
