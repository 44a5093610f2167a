//! Performance benchmarks for compatibility scoring and pair finding

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use killer_matchmaking::config::{AppConfig, ScoringConfig};
use killer_matchmaking::engine::GreedyMatcher;
use killer_matchmaking::metrics::MetricsCollector;
use killer_matchmaking::notify::LogOnlyNotifier;
use killer_matchmaking::queue::{InMemoryQueueStore, QueueStore};
use killer_matchmaking::scoring::CompatibilityScorer;
use killer_matchmaking::service::MatchmakingService;
use killer_matchmaking::types::{PlayerData, PlayerType, QueueEntry, QueueKind};
use std::sync::Arc;

const TYPES: [PlayerType; 4] = [
    PlayerType::Bachelor,
    PlayerType::Master,
    PlayerType::Specialist,
    PlayerType::Other,
];
const GROUPS: [&str; 3] = ["ИИ", "ПИ", "БИ"];

fn player(id: u64) -> QueueEntry {
    let data = PlayerData::new(
        ((id * 37) % 2000) as f64,
        TYPES[(id % 4) as usize],
        Some((id % 6 + 1) as u8),
        Some(GROUPS[(id % 3) as usize].to_string()),
    )
    .unwrap();
    QueueEntry::new(id, data, Utc::now() - Duration::seconds((id % 300) as i64))
}

fn queue(first_id: u64, count: u64) -> Vec<QueueEntry> {
    (first_id..first_id + count).map(player).collect()
}

fn bench_single_score(c: &mut Criterion) {
    let scorer = CompatibilityScorer::new(ScoringConfig::default());
    let killer = player(1);
    let victim = player(2);
    let now = Utc::now();

    c.bench_function("score_single_pair", |b| {
        b.iter(|| scorer.score(black_box(&killer), black_box(&victim), now))
    });
}

fn bench_find_pairs(c: &mut Criterion) {
    let scorer = Arc::new(CompatibilityScorer::new(ScoringConfig::default()));
    let matcher = GreedyMatcher::new(scorer, 0.6);
    let now = Utc::now();

    let mut group = c.benchmark_group("find_pairs");
    for size in [10u64, 100, 500] {
        let killers = queue(1, size);
        let victims = queue(10_000, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| matcher.find_pairs(black_box(&killers), black_box(&victims), now))
        });
    }
    group.finish();
}

fn bench_full_cycle(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let config = AppConfig::default();

    c.bench_function("run_cycle_200_players", |b| {
        b.iter_batched(
            || {
                let store = Arc::new(InMemoryQueueStore::default());
                for entry in queue(1, 100) {
                    store.add(QueueKind::Killers, entry).unwrap();
                }
                for entry in queue(10_000, 100) {
                    store.add(QueueKind::Victims, entry).unwrap();
                }
                MatchmakingService::from_parts(
                    config.clone(),
                    store,
                    Arc::new(CompatibilityScorer::new(config.scoring.clone())),
                    Arc::new(LogOnlyNotifier),
                    Arc::new(MetricsCollector::new().unwrap()),
                )
            },
            |service| runtime.block_on(service.engine().run_cycle()).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_single_score,
    bench_find_pairs,
    bench_full_cycle
);
criterion_main!(benches);
