// Criterion benchmarks for Lume Social

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lume_social::core::{MessageScope, PageRequest, PagedList, SliceSource, UserQuery};
use lume_social::models::{Gender, Message, MessageContainer, User};
use std::collections::HashSet;

fn create_user(id: i32) -> User {
    let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    User {
        id,
        username: format!("user{}", id),
        known_as: format!("User {}", id),
        gender: if id % 2 == 0 { "female" } else { "male" }.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1980 + id % 25, 1 + (id % 12) as u32, 1).unwrap(),
        created: epoch - Duration::hours(i64::from(id % 500)),
        last_active: epoch - Duration::minutes(i64::from(id % 997)),
        introduction: None,
        looking_for: None,
        interests: None,
        city: None,
        country: None,
        photos: vec![],
    }
}

fn create_message(id: i32) -> Message {
    Message {
        id,
        sender_id: id % 50,
        recipient_id: (id + 1) % 50,
        content: "hello".to_string(),
        is_read: id % 3 == 0,
        date_read: None,
        message_sent: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(i64::from(id)),
        sender_deleted: id % 7 == 0,
        recipient_deleted: id % 5 == 0,
    }
}

fn bench_discovery_query(c: &mut Criterion) {
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let likers: HashSet<i32> = (0..5000).step_by(3).collect();
    let mut group = c.benchmark_group("discovery_query");

    for size in [100usize, 1000, 10000].iter() {
        let users: Vec<User> = (0..*size as i32).map(create_user).collect();
        let query = UserQuery::new(1, Gender::Female)
            .with_likers(likers.clone())
            .with_age_range(25, 35, today)
            .ordered_by(Some("created"));

        group.bench_with_input(BenchmarkId::from_parameter(size), &users, |b, users| {
            b.iter(|| query.apply(black_box(users.clone())));
        });
    }

    group.finish();
}

fn bench_paging(c: &mut Criterion) {
    let items: Vec<User> = (0..10000).map(create_user).collect();

    c.bench_function("paged_list_create", |b| {
        b.iter(|| {
            tokio_test::block_on(PagedList::create(
                &SliceSource::new(black_box(&items)),
                PageRequest::new(black_box(42), 50),
            ))
        });
    });
}

fn bench_message_scopes(c: &mut Criterion) {
    let messages: Vec<Message> = (0..10000).map(create_message).collect();
    let inbox = MessageScope::container(10, MessageContainer::Inbox);
    let thread = MessageScope::thread(10, 11);

    c.bench_function("inbox_scope", |b| {
        b.iter(|| inbox.apply(black_box(&messages)));
    });

    c.bench_function("thread_scope", |b| {
        b.iter(|| thread.apply(black_box(&messages)));
    });
}

criterion_group!(benches, bench_discovery_query, bench_paging, bench_message_scopes);
criterion_main!(benches);
