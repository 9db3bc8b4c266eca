//! Terminal front end for a timed practice run.

use anyhow::Result;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tutorbot_core::model::{Answer, AnswerValue, Question};
use tutorbot_core::practice::{
    PracticeSession, Progress, SessionOutcome, Strategy, TickEvent,
};
use tutorbot_engine::timer::{PracticeTimer, SharedSession, TICK_PERIOD};

/// How long multiple-choice feedback stays up before the next question.
pub const MULTIPLE_CHOICE_REVEAL_HOLD: Duration = Duration::from_secs(3);

/// Countdown values worth printing.
const COUNTDOWN_MARKS: [u32; 3] = [30, 10, 5];

/// A finished run.
pub struct PracticeReport {
    pub outcome: SessionOutcome,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Answer(AnswerValue),
    Reveal,
    Skip,
    Pause,
    Resume,
    Quit,
    Invalid(String),
}

/// Interpret one line typed during a run.
pub fn parse_input(strategy: Strategy, line: &str, option_count: usize) -> Input {
    let line = line.trim();
    match line {
        "/quit" | "/q" => return Input::Quit,
        "/skip" | "/s" => return Input::Skip,
        "/pause" | "/p" => return Input::Pause,
        "/resume" | "/r" => return Input::Resume,
        _ => {}
    }

    match strategy {
        Strategy::Flashcards => match line.to_ascii_lowercase().as_str() {
            "" => Input::Reveal,
            "y" | "yes" => Input::Answer(AnswerValue::Mastery(true)),
            "n" | "no" => Input::Answer(AnswerValue::Mastery(false)),
            _ => Input::Invalid("press Enter to reveal, then y or n".to_string()),
        },
        Strategy::MultipleChoice => match line.parse::<usize>() {
            Ok(n) if (1..=option_count).contains(&n) => Input::Answer(AnswerValue::Choice(n - 1)),
            _ => Input::Invalid(format!("pick an option from 1 to {}", option_count)),
        },
        Strategy::TypedAnswer if line.is_empty() => {
            Input::Invalid("type an answer, or /skip".to_string())
        }
        Strategy::TypedAnswer => Input::Answer(AnswerValue::Text(line.to_string())),
    }
}

fn lock(session: &SharedSession) -> MutexGuard<'_, PracticeSession> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}

fn show_question(session: &SharedSession, strategy: Strategy) {
    let guard = lock(session);
    let Some(question) = guard.current_question() else {
        return;
    };
    println!();
    println!(
        "  [{}/{}] ({}, {}s)",
        guard.current_index() + 1,
        guard.questions().len(),
        question.difficulty,
        guard.time_remaining()
    );
    println!("  {}", question.prompt);
    if strategy == Strategy::MultipleChoice {
        for (i, option) in question.options.iter().enumerate() {
            println!("    {}) {}", i + 1, option);
        }
    }
    match strategy {
        Strategy::Flashcards => println!("  Enter to reveal, then y (got it) or n"),
        Strategy::MultipleChoice => println!("  Your choice:"),
        Strategy::TypedAnswer => println!("  Your answer:"),
    }
    let _ = std::io::stdout().flush();
}

fn show_feedback(answer: &Answer, question: &Question) {
    if answer.is_correct {
        println!("  + Correct");
    } else {
        println!("  - Not quite. Answer: {}", question.reference_text());
    }
    if !question.explanation.is_empty() {
        println!("    {}", question.explanation);
    }
}

fn show_outcome(outcome: &SessionOutcome) {
    println!();
    println!(
        "  Finished: {}/{} correct, score {}% ({})",
        outcome.correct,
        outcome.total,
        outcome.score,
        if outcome.passed { "pass" } else { "keep practicing" }
    );
}

/// Run `questions` until they are all answered or the user quits.
///
/// Returns `None` when the run was abandoned.
pub async fn run(strategy: Strategy, questions: Vec<Question>) -> Result<Option<PracticeReport>> {
    let mut session = PracticeSession::new();
    session.start(strategy, questions)?;
    let shared: SharedSession = Arc::new(Mutex::new(session));
    let (mut timer, mut events) = PracticeTimer::start(shared.clone(), TICK_PERIOD);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("  Commands: /pause /resume /skip /quit");
    show_question(&shared, strategy);

    let outcome = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(TickEvent::Moved(Progress::Completed(outcome))) => {
                    println!("  Time's up.");
                    break Some(outcome);
                }
                Some(TickEvent::Moved(Progress::Advanced { .. })) => {
                    println!("  Time's up.");
                    show_question(&shared, strategy);
                }
                Some(TickEvent::AnswerRevealed { remaining }) => {
                    if let Some(question) = lock(&shared).current_question() {
                        println!("  Answer: {} ({}s)", question.reference_text(), remaining);
                    }
                }
                Some(TickEvent::Ticked { remaining }) if COUNTDOWN_MARKS.contains(&remaining) => {
                    println!("  {}s left", remaining);
                }
                Some(_) => {}
                // Timer stops once the run leaves the active states.
                None => break lock(&shared).outcome(),
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break None;
                };
                let option_count = lock(&shared)
                    .current_question()
                    .map(|q| q.options.len())
                    .unwrap_or(0);
                match parse_input(strategy, &line, option_count) {
                    Input::Quit => break None,
                    Input::Invalid(hint) => println!("  ? {}", hint),
                    Input::Pause => match lock(&shared).pause() {
                        Ok(()) => println!("  Paused. /resume to continue."),
                        Err(err) => println!("  ? {}", err),
                    },
                    Input::Resume => match lock(&shared).resume() {
                        Ok(()) => println!("  Resumed."),
                        Err(err) => println!("  ? {}", err),
                    },
                    Input::Reveal => {
                        let revealed = {
                            let mut guard = lock(&shared);
                            guard.reveal_answer().map(|_| {
                                guard
                                    .current_question()
                                    .map(|q| q.reference_text())
                                    .unwrap_or_default()
                            })
                        };
                        match revealed {
                            Ok(text) => println!("  Answer: {}", text),
                            Err(err) => println!("  ? {}", err),
                        }
                    }
                    Input::Skip => {
                        let progress = lock(&shared).advance();
                        match progress {
                            Ok(Progress::Completed(outcome)) => break Some(outcome),
                            Ok(Progress::Advanced { .. }) => show_question(&shared, strategy),
                            Err(err) => println!("  ? {}", err),
                        }
                    }
                    Input::Answer(value) => {
                        let submitted = {
                            let mut guard = lock(&shared);
                            let question = guard.current_question().cloned();
                            guard.submit_answer(value).map(|(answer, progress)| (answer, progress, question))
                        };
                        match submitted {
                            Ok((answer, progress, Some(question))) => {
                                if strategy != Strategy::Flashcards {
                                    show_feedback(&answer, &question);
                                }
                                match progress {
                                    Progress::Completed(outcome) => break Some(outcome),
                                    Progress::Advanced { .. } => {
                                        if strategy == Strategy::MultipleChoice {
                                            hold_feedback(&shared).await;
                                        }
                                        show_question(&shared, strategy);
                                    }
                                }
                            }
                            Ok((_, Progress::Completed(outcome), None)) => break Some(outcome),
                            Ok((_, Progress::Advanced { .. }, None)) => show_question(&shared, strategy),
                            Err(err) => println!("  ? {}", err),
                        }
                    }
                }
            }
        }
    };

    timer.cancel();
    let answers = lock(&shared).answers().to_vec();
    Ok(outcome.map(|outcome| {
        show_outcome(&outcome);
        PracticeReport { outcome, answers }
    }))
}

/// Keep the next question's clock stopped while feedback is on screen.
async fn hold_feedback(session: &SharedSession) {
    let paused = lock(session).pause().is_ok();
    tokio::time::sleep(MULTIPLE_CHOICE_REVEAL_HOLD).await;
    if paused {
        let _ = lock(session).resume();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_work_in_every_strategy() {
        for strategy in Strategy::ALL {
            assert_eq!(parse_input(strategy, "/quit", 4), Input::Quit);
            assert_eq!(parse_input(strategy, " /s ", 4), Input::Skip);
            assert_eq!(parse_input(strategy, "/pause", 4), Input::Pause);
            assert_eq!(parse_input(strategy, "/r", 4), Input::Resume);
        }
    }

    #[test]
    fn multiple_choice_numbers_are_one_based() {
        assert_eq!(
            parse_input(Strategy::MultipleChoice, "1", 4),
            Input::Answer(AnswerValue::Choice(0))
        );
        assert_eq!(
            parse_input(Strategy::MultipleChoice, "5", 5),
            Input::Answer(AnswerValue::Choice(4))
        );
        assert!(matches!(
            parse_input(Strategy::MultipleChoice, "5", 4),
            Input::Invalid(_)
        ));
        assert!(matches!(
            parse_input(Strategy::MultipleChoice, "0", 4),
            Input::Invalid(_)
        ));
    }

    #[test]
    fn flashcard_keys() {
        assert_eq!(parse_input(Strategy::Flashcards, "", 0), Input::Reveal);
        assert_eq!(
            parse_input(Strategy::Flashcards, "Y", 0),
            Input::Answer(AnswerValue::Mastery(true))
        );
        assert_eq!(
            parse_input(Strategy::Flashcards, "n", 0),
            Input::Answer(AnswerValue::Mastery(false))
        );
    }

    #[test]
    fn typed_answers_keep_their_case() {
        assert_eq!(
            parse_input(Strategy::TypedAnswer, "  Mitochondria ", 0),
            Input::Answer(AnswerValue::Text("Mitochondria".to_string()))
        );
        assert!(matches!(
            parse_input(Strategy::TypedAnswer, "   ", 0),
            Input::Invalid(_)
        ));
    }
}
