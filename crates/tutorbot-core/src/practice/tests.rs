use super::*;
use crate::model::{CorrectAnswer, Difficulty};

fn choice_question(id: usize, correct: usize, secs: u32) -> Question {
    Question {
        id: format!("q{}", id),
        prompt: format!("Question {}", id),
        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        correct_answer: CorrectAnswer::Index(correct),
        explanation: String::new(),
        difficulty: Difficulty::Medium,
        time_allowed_secs: secs,
    }
}

fn text_question(id: usize, answer: &str) -> Question {
    Question {
        id: format!("t{}", id),
        prompt: format!("Define {}", id),
        options: Vec::new(),
        correct_answer: CorrectAnswer::Text(answer.to_string()),
        explanation: String::new(),
        difficulty: Difficulty::Easy,
        time_allowed_secs: 30,
    }
}

fn five_choice_questions() -> Vec<Question> {
    (0..5).map(|i| choice_question(i, i % 4, 60)).collect()
}

fn tick_n(session: &mut PracticeSession, n: u32) -> Vec<TickEvent> {
    (0..n).map(|_| session.tick().unwrap()).collect()
}

#[test]
fn multiple_choice_run_of_five_completes_with_five_answers() {
    let questions = five_choice_questions();
    let mut session = PracticeSession::new();
    session.start(Strategy::MultipleChoice, questions.clone()).unwrap();

    for (i, q) in questions.iter().enumerate() {
        assert_eq!(session.current_index(), i);
        let CorrectAnswer::Index(correct) = q.correct_answer else {
            unreachable!()
        };
        let (answer, progress) = session.submit_answer(AnswerValue::Choice(correct)).unwrap();
        assert!(answer.is_correct);
        if i < 4 {
            assert_eq!(progress, Progress::Advanced { index: i + 1 });
        } else {
            assert!(matches!(progress, Progress::Completed(_)));
        }
    }

    assert_eq!(session.status(), SessionStatus::Complete);
    assert_eq!(session.answers().len(), 5);
    assert_eq!(session.outcome().unwrap().score, 100);
}

#[test]
fn three_of_five_scores_sixty_and_fails() {
    let mut session = PracticeSession::new();
    session.start(Strategy::MultipleChoice, five_choice_questions()).unwrap();

    // q0..q2 right, q3..q4 wrong
    for i in 0..5 {
        let pick = if i < 3 { i % 4 } else { (i + 1) % 4 };
        session.submit_answer(AnswerValue::Choice(pick)).unwrap();
    }

    let outcome = session.outcome().unwrap();
    assert_eq!(outcome.correct, 3);
    assert_eq!(outcome.score, 60);
    assert!(!outcome.passed);
}

#[test]
fn percent_rounds_half_up() {
    assert_eq!(percent(2, 3), 67);
    assert_eq!(percent(1, 8), 13);
    assert_eq!(percent(7, 10), 70);
    assert_eq!(percent(0, 0), 0);
    assert!(SessionOutcome::from_counts(7, 10).passed);
}

#[test]
fn start_requires_questions() {
    let mut session = PracticeSession::new();
    assert_eq!(
        session.start(Strategy::TypedAnswer, Vec::new()),
        Err(PracticeError::EmptyQuestionSet)
    );
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[test]
fn tick_while_idle_is_illegal() {
    let mut session = PracticeSession::new();
    assert_eq!(
        session.tick(),
        Err(PracticeError::IllegalTransition {
            operation: "tick",
            status: SessionStatus::Idle
        })
    );
}

#[test]
fn operations_after_completion_are_illegal() {
    let mut session = PracticeSession::new();
    session
        .start(Strategy::MultipleChoice, vec![choice_question(0, 0, 10)])
        .unwrap();
    session.submit_answer(AnswerValue::Choice(0)).unwrap();
    assert_eq!(session.status(), SessionStatus::Complete);
    assert!(session.tick().is_err());
    assert!(session.advance().is_err());
    assert!(session.start(Strategy::MultipleChoice, five_choice_questions()).is_err());
}

#[test]
fn flashcard_answer_is_revealed_once_before_advancing() {
    let questions = vec![text_question(0, "zero"), text_question(1, "one")];
    let mut session = PracticeSession::new();
    session.start(Strategy::Flashcards, questions).unwrap();
    assert_eq!(session.time_remaining(), FLASHCARD_PROMPT_WINDOW_SECS);

    let events = tick_n(&mut session, FLASHCARD_PROMPT_WINDOW_SECS);
    let reveals = events
        .iter()
        .filter(|e| matches!(e, TickEvent::AnswerRevealed { .. }))
        .count();
    assert_eq!(reveals, 1);
    assert_eq!(
        events.last(),
        Some(&TickEvent::AnswerRevealed {
            remaining: FLASHCARD_ANSWER_WINDOW_SECS
        })
    );
    assert!(session.answer_shown());
    assert_eq!(session.current_index(), 0);

    let events = tick_n(&mut session, FLASHCARD_ANSWER_WINDOW_SECS);
    assert_eq!(
        events.last(),
        Some(&TickEvent::Moved(Progress::Advanced { index: 1 }))
    );
    assert!(!session.answer_shown());
    assert_eq!(session.time_remaining(), FLASHCARD_PROMPT_WINDOW_SECS);
    assert_eq!(session.answers().len(), 1);
    assert!(!session.answers()[0].is_correct);
}

#[test]
fn flashcard_window_ignores_question_time_limit() {
    let mut long = text_question(0, "x");
    long.time_allowed_secs = 600;
    let mut session = PracticeSession::new();
    session.start(Strategy::Flashcards, vec![long]).unwrap();
    assert_eq!(session.time_remaining(), FLASHCARD_PROMPT_WINDOW_SECS);
}

#[test]
fn flashcards_record_mastery_self_report() {
    let mut session = PracticeSession::new();
    session
        .start(
            Strategy::Flashcards,
            vec![text_question(0, "a"), text_question(1, "b")],
        )
        .unwrap();
    session.reveal_answer().unwrap();
    assert_eq!(session.time_remaining(), FLASHCARD_ANSWER_WINDOW_SECS);

    let (first, _) = session.submit_answer(AnswerValue::Mastery(true)).unwrap();
    let (second, progress) = session.submit_answer(AnswerValue::Mastery(false)).unwrap();
    assert!(first.is_correct);
    assert!(!second.is_correct);
    assert_eq!(progress, Progress::Completed(SessionOutcome::from_counts(1, 2)));
}

#[test]
fn strategy_rejects_foreign_answer_kinds() {
    let mut session = PracticeSession::new();
    session.start(Strategy::Flashcards, vec![text_question(0, "a")]).unwrap();
    assert!(matches!(
        session.submit_answer(AnswerValue::Choice(0)),
        Err(PracticeError::NotApplicable { .. })
    ));

    let mut session = PracticeSession::new();
    session.start(Strategy::TypedAnswer, vec![text_question(0, "a")]).unwrap();
    assert!(matches!(
        session.reveal_answer(),
        Err(PracticeError::NotApplicable { .. })
    ));
    assert!(session.answers().is_empty());
}

#[test]
fn typed_answer_is_case_sensitive() {
    let mut session = PracticeSession::new();
    session
        .start(
            Strategy::TypedAnswer,
            vec![text_question(0, "Mitochondria"), text_question(1, "Ribosome")],
        )
        .unwrap();
    let (first, _) = session
        .submit_answer(AnswerValue::Text("mitochondria".into()))
        .unwrap();
    let (second, _) = session
        .submit_answer(AnswerValue::Text("Ribosome".into()))
        .unwrap();
    assert!(!first.is_correct);
    assert!(second.is_correct);
}

#[test]
fn timeout_records_unanswered_with_full_time() {
    let mut session = PracticeSession::new();
    session
        .start(
            Strategy::MultipleChoice,
            vec![choice_question(0, 0, 3), choice_question(1, 0, 3)],
        )
        .unwrap();

    let events = tick_n(&mut session, 3);
    assert_eq!(events[0], TickEvent::Ticked { remaining: 2 });
    assert_eq!(events[2], TickEvent::Moved(Progress::Advanced { index: 1 }));

    let answer = &session.answers()[0];
    assert_eq!(answer.value, AnswerValue::NoAnswer);
    assert!(!answer.is_correct);
    assert_eq!(answer.time_spent_secs, 3);
    assert_eq!(session.time_remaining(), 3);
}

#[test]
fn time_spent_tracks_elapsed_ticks() {
    let mut session = PracticeSession::new();
    session
        .start(Strategy::MultipleChoice, five_choice_questions())
        .unwrap();
    tick_n(&mut session, 4);
    let (answer, _) = session.submit_answer(AnswerValue::Choice(0)).unwrap();
    assert_eq!(answer.time_spent_secs, 4);
}

#[test]
fn paused_ticks_do_not_move_countdown() {
    let mut session = PracticeSession::new();
    session
        .start(Strategy::MultipleChoice, five_choice_questions())
        .unwrap();
    tick_n(&mut session, 5);
    let at_pause = session.time_remaining();

    session.pause().unwrap();
    for _ in 0..20 {
        assert_eq!(session.tick(), Ok(TickEvent::Paused));
    }
    assert_eq!(session.time_remaining(), at_pause);
    assert!(session.submit_answer(AnswerValue::Choice(0)).is_err());

    session.resume().unwrap();
    assert_eq!(
        session.tick(),
        Ok(TickEvent::Ticked {
            remaining: at_pause - 1
        })
    );
}

#[test]
fn pause_and_resume_require_matching_state() {
    let mut session = PracticeSession::new();
    assert!(session.pause().is_err());
    session
        .start(Strategy::MultipleChoice, five_choice_questions())
        .unwrap();
    assert!(session.resume().is_err());
    session.pause().unwrap();
    assert!(session.pause().is_err());
}

#[test]
fn skip_records_one_answer_per_advance() {
    let mut session = PracticeSession::new();
    session
        .start(Strategy::TypedAnswer, vec![text_question(0, "a"), text_question(1, "b")])
        .unwrap();
    assert_eq!(session.advance(), Ok(Progress::Advanced { index: 1 }));
    assert_eq!(session.answers().len(), 1);
    assert_eq!(session.answers()[0].value, AnswerValue::NoAnswer);
}

#[test]
fn reset_then_start_is_deterministic() {
    let questions = five_choice_questions();
    let mut session = PracticeSession::new();
    session.start(Strategy::MultipleChoice, questions.clone()).unwrap();
    session.submit_answer(AnswerValue::Choice(0)).unwrap();
    tick_n(&mut session, 7);

    let mut session = session.reset();
    assert_eq!(session.status(), SessionStatus::Idle);
    session.start(Strategy::MultipleChoice, questions).unwrap();
    assert_eq!(session.current_index(), 0);
    assert!(session.answers().is_empty());
    assert_eq!(session.time_remaining(), 60);
}

#[test]
fn strategy_parse_accepts_labels() {
    assert_eq!(Strategy::parse("Multiple-Choice"), Some(Strategy::MultipleChoice));
    assert_eq!(Strategy::parse("typed-answer"), Some(Strategy::TypedAnswer));
    assert_eq!(Strategy::parse("essay"), None);
}
