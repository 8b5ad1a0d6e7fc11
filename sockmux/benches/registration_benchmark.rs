/*!
 * Registration Benchmark
 * Add/remove cycle cost, including the poll vector rebuild
 */

use criterion::{criterion_group, criterion_main, Criterion};
use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};
use sockmux::SocketManager;
use std::os::fd::AsRawFd;

fn benchmark_register_remove(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let manager = SocketManager::new();

    c.bench_function("register_remove", |b| {
        b.iter(|| {
            let (alpha, beta) = socketpair(
                AddressFamily::Unix,
                SockType::Stream,
                None,
                SockFlag::SOCK_NONBLOCK,
            )
            .expect("socketpair");
            let fd = alpha.as_raw_fd();
            runtime.block_on(async {
                let _events = manager.add(alpha);
            });
            manager.remove(fd, None);
            drop(beta);
        })
    });
}

criterion_group!(benches, benchmark_register_remove);
criterion_main!(benches);
