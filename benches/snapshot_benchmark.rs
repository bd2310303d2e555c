use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Map};
use std::hint::black_box;
use sustainable_cut::models::{RemoteRecord, Snapshot};

/// A full 16-week program: one record per day plus a review per week.
fn sixteen_week_snapshot() -> Snapshot {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();

    let mut logs = Map::new();
    for i in 0..16 * 7 {
        let date = (start + Duration::days(i)).format("%Y-%m-%d").to_string();
        logs.insert(
            date.clone(),
            json!({
                "date": date,
                "weight": 92.5 - i as f64 * 0.07,
                "calories": 2200 + (i % 5) * 50,
                "protein": 180,
                "carbs": 210,
                "fat": 70,
                "steps": 8000 + (i % 7) * 500,
                "sleep": 7.5,
                "trained": i % 7 != 6,
                "notes": "felt good, hit all sets"
            }),
        );
    }

    let mut weekly = Map::new();
    for w in 1..=16 {
        weekly.insert(
            format!("w{}", w),
            json!({"rating": 4, "adherence": 0.9, "notes": "steady progress", "waist": 88.0 - w as f64 * 0.3}),
        );
    }

    Snapshot {
        profile: Some(json!({
            "name": "Ann",
            "startWeight": 92.5,
            "goalWeight": 84.0,
            "startDate": "2024-01-01",
            "heightCm": 178
        })),
        logs,
        weekly,
    }
}

fn benchmark_fingerprint(c: &mut Criterion) {
    let snapshot = sixteen_week_snapshot();
    let marker = snapshot.fingerprint();

    let row = serde_json::to_string(&RemoteRecord {
        snapshot: snapshot.clone(),
        updated_at: Some("2024-04-21T10:00:00.000Z".to_string()),
    })
    .unwrap_or_default();

    let mut group = c.benchmark_group("snapshot_16_weeks");

    group.bench_function("fingerprint", |b| {
        b.iter(|| black_box(&snapshot).fingerprint())
    });

    // The dirty check run on every local change.
    group.bench_function("dirty_check", |b| {
        b.iter(|| black_box(&snapshot).fingerprint() != marker)
    });

    group.bench_function("decode_remote_row", |b| {
        b.iter(|| serde_json::from_str::<RemoteRecord>(black_box(&row)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_fingerprint);
criterion_main!(benches);
