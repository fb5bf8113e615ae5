use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chrono::Utc;
use evalua_core::model::{Answer, AnswerOption, AnswerSheet, OptionId, Question, QuestionId, QuestionKind};
use evalua_core::scoring::{check_answers, grade, MultipleChoicePolicy, ScoringPolicy};

fn make_question(kind: QuestionKind, options: usize) -> Question {
    let id = QuestionId::new();
    Question {
        id,
        text: "bench".into(),
        kind,
        options: (0..options)
            .map(|i| AnswerOption {
                id: OptionId::new(),
                question_id: id,
                text: format!("option {i}"),
                is_correct: i % 2 == 0,
            })
            .collect(),
        created_at: Utc::now(),
    }
}

fn make_exam(questions: usize) -> (Vec<Question>, AnswerSheet) {
    let questions: Vec<Question> = (0..questions)
        .map(|i| match i % 3 {
            0 => make_question(QuestionKind::MultipleChoice, 6),
            1 => {
                let mut q = make_question(QuestionKind::SingleChoice, 4);
                for (j, o) in q.options.iter_mut().enumerate() {
                    o.is_correct = j == 1;
                }
                q
            }
            _ => make_question(QuestionKind::OpenText, 0),
        })
        .collect();
    let answers = questions
        .iter()
        .map(|q| {
            let answer = match q.kind {
                QuestionKind::SingleChoice => Answer::Single {
                    option: q.options[1].id,
                },
                QuestionKind::MultipleChoice => Answer::Multiple {
                    options: q.options.iter().take(3).map(|o| o.id).collect(),
                },
                QuestionKind::OpenText => Answer::Text {
                    text: "a considered answer".into(),
                },
            };
            (q.id, answer)
        })
        .collect();
    (questions, answers)
}

fn bench_grade(c: &mut Criterion) {
    let mut group = c.benchmark_group("grade");

    for size in [10, 100, 1000] {
        let (questions, answers) = make_exam(size);
        group.bench_function(format!("all_or_nothing/{size}"), |b| {
            let policy = ScoringPolicy::default();
            b.iter(|| grade(black_box(&questions), black_box(&answers), &policy, None))
        });
    }

    let (questions, answers) = make_exam(100);
    group.bench_function("proportional/100", |b| {
        let policy = ScoringPolicy {
            multiple_choice: MultipleChoicePolicy::Proportional,
        };
        b.iter(|| grade(black_box(&questions), black_box(&answers), &policy, None))
    });

    group.finish();
}

fn bench_check_answers(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_answers");

    for size in [10, 100, 1000] {
        let (questions, answers) = make_exam(size);
        group.bench_function(format!("valid/{size}"), |b| {
            b.iter(|| check_answers(black_box(&questions), black_box(&answers)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_grade, bench_check_answers);
criterion_main!(benches);
