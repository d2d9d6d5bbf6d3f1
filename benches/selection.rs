use std::hint::black_box;

use chrono::{Duration, TimeZone, Utc};
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use geodrill::{
    Card, CardStore, ContentGraph, ExerciseData, Fsrs, GoalCard, Grade, LearningGoalData,
    MemoryStore, ProgressCard, SelectionEngine, seeded_rng,
};
use itertools::Itertools;
use serde_json::json;

const REGIONS: usize = 20;
const COUNTRIES_PER_REGION: usize = 10;

fn graph() -> ContentGraph {
    let mut goals = vec![LearningGoalData {
        name: "world".into(),
        ..Default::default()
    }];
    let mut exercises = vec![];
    for r in 0..REGIONS {
        let countries = (0..COUNTRIES_PER_REGION)
            .map(|c| format!("country-{r}-{c}"))
            .collect_vec();
        goals.push(LearningGoalData {
            name: format!("region-{r}"),
            parents: vec!["world".into()],
            blocked_by: if r > 0 {
                vec![format!("region-{}", r - 1)]
            } else {
                vec![]
            },
            exercises: countries.clone(),
            inherent_interest: Some((r % 3) as f32),
            ..Default::default()
        });
        exercises.extend(countries.into_iter().map(|id| ExerciseData {
            instruction: format!("Click on {id}"),
            data: Some(json!({ "zoom": 120, "country": id })),
            id,
        }));
    }
    ContentGraph::new(goals, exercises)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let graph = graph();
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let scope = graph.all_exercises().iter().collect_vec();

    // half of everything already learned, a quarter of it due
    let mut exercises: MemoryStore<ProgressCard> = MemoryStore::new();
    for (i, e) in scope.iter().enumerate().filter(|(i, _)| i % 2 == 0) {
        let mut card = ProgressCard::new(e.id.as_str(), now);
        card.card.due = if i % 4 == 0 {
            now - Duration::hours(1)
        } else {
            now + Duration::days(3)
        };
        exercises.put(card).unwrap();
    }
    let goals: MemoryStore<GoalCard> = MemoryStore::new();

    c.bench_function("next_exercise", |b| {
        let mut engine = SelectionEngine::new(&graph, seeded_rng(42));
        let mut store = exercises.clone();
        b.iter(|| black_box(engine.next_exercise(&scope, &mut store, now).unwrap()))
    });
    c.bench_function("next_goal", |b| {
        let mut engine = SelectionEngine::new(&graph, seeded_rng(42));
        b.iter(|| black_box(engine.next_goal(&exercises, &goals, now).unwrap()))
    });
    c.bench_function("fsrs_next", |b| {
        let fsrs = Fsrs::default();
        let card = fsrs.next(&Card::new(now), now, Grade::Good);
        b.iter(|| black_box(fsrs.next(&card, now + Duration::days(2), Grade::Good)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
