use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tutorbot_core::model::AnswerValue;
use tutorbot_core::normalize::{normalize_quiz, normalize_study_plan};
use tutorbot_core::practice::{PracticeSession, Strategy, TickEvent};

fn synthetic_quiz_response(count: usize) -> String {
    let records: Vec<String> = (0..count)
        .map(|i| {
            format!(
                r#"{{"id": "{i}", "question": "Question number {i}?", "options": ["a", "b", "c", "d"], "correctAnswer": {}, "type": "multiple-choice", "difficulty": "hard"}},"#,
                i % 4
            )
        })
        .collect();
    format!(
        "Here is your quiz:\n```json\n[{}]\n```\nGood luck!",
        records.join("\n")
    )
}

fn synthetic_plan_response(days: usize) -> String {
    let records: Vec<String> = (1..=days)
        .map(|d| {
            format!(
                r#"{{"day": {d}, "date": "2024-01-15", "topics": ["Topic {d}"], "duration": {}, "activities": ["Read", "Review"]}}"#,
                20 + d * 7
            )
        })
        .collect();
    format!("[{}]", records.join(","))
}

fn bench_normalize(c: &mut Criterion) {
    let quiz = synthetic_quiz_response(200);
    c.bench_function("normalize_quiz_200", |b| {
        b.iter(|| {
            let out = normalize_quiz(black_box(&quiz), 200).expect("quiz should normalize");
            black_box(out.records.len());
        });
    });

    let plan = synthetic_plan_response(20);
    let today = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date");
    c.bench_function("normalize_plan_30", |b| {
        b.iter(|| {
            let out = normalize_study_plan(black_box(&plan), 30, today).expect("plan");
            black_box(out.records.len());
        });
    });
}

fn bench_practice_run(c: &mut Criterion) {
    let quiz = normalize_quiz(&synthetic_quiz_response(100), 100).expect("quiz should normalize");
    let questions: Vec<_> = quiz.records.iter().map(|q| q.to_question()).collect();

    c.bench_function("practice_run_100_questions", |b| {
        b.iter(|| {
            let mut session = PracticeSession::new();
            session
                .start(Strategy::MultipleChoice, questions.clone())
                .expect("start");
            for i in 0..questions.len() {
                if i % 3 == 0 {
                    while !matches!(session.tick().expect("tick"), TickEvent::Moved(_)) {}
                } else {
                    session
                        .submit_answer(AnswerValue::Choice(i % 4))
                        .expect("submit");
                }
            }
            black_box(session.outcome());
        });
    });
}

criterion_group!(perf_core, bench_normalize, bench_practice_run);
criterion_main!(perf_core);
