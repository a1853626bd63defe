// One process-wide timer services every delayed retry in the process. It
// is a single worker thread over a deadline-ordered queue; worker threads
// never block process exit, so there is nothing to shut down.

use std::collections::BTreeMap;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Condvar, LazyLock, Mutex};
use std::time::{Duration, Instant};

struct Timer {
    queue: Mutex<Queue>,
    tick: Condvar,
}

#[derive(Default)]
struct Queue {
    seq: u64,
    pending: BTreeMap<(Instant, u64), SyncSender<()>>,
}

static TIMER: LazyLock<Timer> = LazyLock::new(|| {
    let _ = std::thread::Builder::new()
        .name("eddy-timer".into())
        .spawn(run);
    Timer {
        queue: Mutex::new(Queue::default()),
        tick: Condvar::new(),
    }
});

// Block the calling thread for the given delay on the shared timer. The
// receive timeout is a backstop: if the timer thread could not be
// spawned, this degrades to a plain sleep.
pub(crate) fn sleep(d: Duration) {
    let rx = schedule(d);
    let _ = rx.recv_timeout(d + Duration::from_millis(50));
}

fn schedule(d: Duration) -> Receiver<()> {
    let (tx, rx) = sync_channel(1);
    let deadline = Instant::now() + d;
    {
        let mut q = match TIMER.queue.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };
        q.seq += 1;
        let seq = q.seq;
        q.pending.insert((deadline, seq), tx);
    }
    TIMER.tick.notify_one();
    rx
}

fn run() {
    let mut q = match TIMER.queue.lock() {
        Ok(g) => g,
        Err(p) => p.into_inner(),
    };
    loop {
        let now = Instant::now();
        while let Some((&(at, seq), _)) = q.pending.first_key_value() {
            if at > now {
                break;
            }
            if let Some(tx) = q.pending.remove(&(at, seq)) {
                let _ = tx.try_send(());
            }
        }
        let wait = q
            .pending
            .keys()
            .next()
            .map(|(at, _)| at.saturating_duration_since(now));
        q = match wait {
            Some(w) => match TIMER.tick.wait_timeout(q, w) {
                Ok((g, _)) => g,
                Err(p) => p.into_inner().0,
            },
            None => match TIMER.tick.wait(q) {
                Ok(g) => g,
                Err(p) => p.into_inner(),
            },
        };
    }
}
