//! Workload aggregation benchmarks
//!
//! Queue ordering and dispatch suggestion over growing desks.

use chrono::{Duration, Utc};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use service_desk::core::{Priority, Technician, TechnicianBuilder, Ticket, TicketBuilder};
use service_desk::engine::{order_queue, suggest_dispatch, technician_workloads};

const PRIORITIES: [Priority; 4] = [
    Priority::Low,
    Priority::Medium,
    Priority::High,
    Priority::Urgent,
];

fn desk(technicians: usize, tickets: usize) -> (Vec<Technician>, Vec<Ticket>) {
    let now = Utc::now();
    let roster = (0..technicians)
        .map(|i| {
            let mut technician = TechnicianBuilder::new()
                .name(format!("tech-{i:04}"))
                .max_capacity(5)
                .build();
            technician.current_tickets = u32::try_from(i % 5).unwrap_or_default();
            technician
        })
        .collect();
    let queue = (0..tickets)
        .map(|i| {
            TicketBuilder::new()
                .subject(format!("ticket-{i}"))
                .priority(PRIORITIES[i % PRIORITIES.len()])
                .created_at(now - Duration::seconds(i64::try_from(i).unwrap_or_default()))
                .build()
        })
        .collect();
    (roster, queue)
}

fn queue_ordering_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_queue");

    for size in [100, 1_000, 10_000] {
        let (_, tickets) = desk(0, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &tickets, |b, tickets| {
            b.iter(|| black_box(order_queue(black_box(tickets))));
        });
    }

    group.finish();
}

fn dispatch_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("suggest_dispatch");

    for (technicians, tickets) in [(10, 100), (50, 1_000), (200, 5_000)] {
        let (roster, tickets) = desk(technicians, tickets);
        let queue = order_queue(&tickets);
        group.bench_with_input(
            BenchmarkId::new("technicians", technicians),
            &(roster, queue),
            |b, (roster, queue)| {
                b.iter(|| black_box(suggest_dispatch(black_box(roster), black_box(queue))));
            },
        );
    }

    group.finish();
}

fn workload_snapshot_benchmark(c: &mut Criterion) {
    let (roster, _) = desk(500, 0);
    c.bench_function("technician_workloads/500", |b| {
        b.iter(|| black_box(technician_workloads(black_box(&roster))));
    });
}

criterion_group!(
    benches,
    queue_ordering_benchmark,
    dispatch_benchmark,
    workload_snapshot_benchmark
);
criterion_main!(benches);
