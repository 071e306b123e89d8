/**
 * This `Observable` emits values from a `Tokio` task and returns teardown logic that
 * stops the task when the subscription is closed. Values pushed after unsubscribing
 * never reach the `Subscriber`, but stopping the task avoids producing them at all.
 *
 * To run this example, execute `cargo run --example unsubscribe_observable`.
 */
use rxr_lifecycle::{
    subscribe::{Subscriber, UnsubscribeLogic, Unsubscribeable},
    Observable, Observer, Subscribeable,
};

use tokio::{sync::oneshot, task, time};

#[tokio::main()]
async fn main() {
    // Create a custom observable that emits values in a separate task.
    let mut observable = Observable::new(|mut o| {
        let (tx, mut rx) = oneshot::channel::<()>();

        // Launch a new Tokio task for the Observable's processing.
        task::spawn(async move {
            for i in 0..=10000 {
                tokio::select! {
                    // Stop as soon as the unsubscribe signal arrives.
                    _ = &mut rx => break,
                    _ = time::sleep(time::Duration::from_millis(100)) => o.next(i),
                }
            }
            o.complete();
        });

        // Sending on the channel needs no `.await`, but `Future` teardowns are
        // spawned on the runtime, which suits signals that do.
        UnsubscribeLogic::Future(Box::pin(async move {
            if tx.send(()).is_err() {
                println!("Receiver dropped.");
            }
        }))
    });

    let mut observer = Subscriber::on_next(|v| println!("Emitted {}", v));
    observer.on_complete(|| println!("Completed"));

    // Observables are cold so if you comment out the statement bellow nothing
    // will be emitted.
    let subscription = observable.subscribe(observer);

    // Do something else here.
    println!("Do something while Observable is emitting.");
    time::sleep(time::Duration::from_millis(550)).await;

    // Unsubscribe from the observable to stop emissions.
    subscription.unsubscribe();

    // Allow some time for the main function to confirm that the observable indeed
    // isn't emitting.
    time::sleep(time::Duration::from_millis(1000)).await;
    println!("`main` function done")
}
