//! Wall-clock driver for a practice session.
//!
//! The timer owns the only task that ticks the session. It stops by itself
//! once the run is complete, whether the last question timed out or was
//! answered, and is aborted by `cancel` or on drop, so a discarded session
//! never receives another tick.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tutorbot_core::practice::{PracticeSession, Progress, SessionStatus, TickEvent};

/// One countdown step per second.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

pub type SharedSession = Arc<Mutex<PracticeSession>>;

pub struct PracticeTimer {
    handle: Option<JoinHandle<()>>,
}

impl PracticeTimer {
    /// Start ticking `session` every `period`; events arrive on the returned channel.
    pub fn start(
        session: SharedSession,
        period: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TickEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let event = {
                    let mut guard = session.lock().unwrap_or_else(|e| e.into_inner());
                    // Answering the last question completes the run between ticks.
                    if guard.status() == SessionStatus::Complete {
                        break;
                    }
                    guard.tick()
                };
                match event {
                    Ok(event) => {
                        let finished = matches!(event, TickEvent::Moved(Progress::Completed(_)));
                        if tx.send(event).is_err() || finished {
                            break;
                        }
                    }
                    Err(err) => {
                        log::debug!("practice timer stopping: {}", err);
                        break;
                    }
                }
            }
        });

        (
            Self {
                handle: Some(handle),
            },
            rx,
        )
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop ticking. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for PracticeTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorbot_core::model::{AnswerValue, CorrectAnswer, Difficulty, Question};
    use tutorbot_core::practice::Strategy;

    fn shared_session(secs: u32, count: usize) -> SharedSession {
        let questions = (0..count)
            .map(|i| Question {
                id: format!("q{}", i),
                prompt: "?".to_string(),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: CorrectAnswer::Index(0),
                explanation: String::new(),
                difficulty: Difficulty::Easy,
                time_allowed_secs: secs,
            })
            .collect();
        let mut session = PracticeSession::new();
        session.start(Strategy::MultipleChoice, questions).unwrap();
        Arc::new(Mutex::new(session))
    }

    #[tokio::test(start_paused = true)]
    async fn timer_runs_session_to_completion_and_stops() {
        let session = shared_session(2, 2);
        let (timer, mut rx) = PracticeTimer::start(session.clone(), TICK_PERIOD);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 4);
        assert!(matches!(
            events.last(),
            Some(TickEvent::Moved(Progress::Completed(_)))
        ));
        assert_eq!(session.lock().unwrap().status(), SessionStatus::Complete);
        assert_eq!(session.lock().unwrap().answers().len(), 2);
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_ticks_again() {
        let session = shared_session(30, 1);
        let (mut timer, mut rx) = PracticeTimer::start(session.clone(), TICK_PERIOD);

        assert_eq!(rx.recv().await, Some(TickEvent::Ticked { remaining: 29 }));
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(session.lock().unwrap().time_remaining(), 29);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_timer_stops_ticks() {
        let session = shared_session(30, 1);
        let (timer, rx) = PracticeTimer::start(session.clone(), TICK_PERIOD);
        drop(timer);
        drop(rx);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.lock().unwrap().time_remaining(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn answering_between_ticks_is_seen_by_timer() {
        let session = shared_session(30, 2);
        let (_timer, mut rx) = PracticeTimer::start(session.clone(), TICK_PERIOD);

        assert_eq!(rx.recv().await, Some(TickEvent::Ticked { remaining: 29 }));
        session
            .lock()
            .unwrap()
            .submit_answer(AnswerValue::Choice(0))
            .unwrap();
        assert_eq!(rx.recv().await, Some(TickEvent::Ticked { remaining: 29 }));
        assert_eq!(session.lock().unwrap().current_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_session_reports_paused_ticks() {
        let session = shared_session(30, 1);
        session.lock().unwrap().pause().unwrap();
        let (_timer, mut rx) = PracticeTimer::start(session.clone(), TICK_PERIOD);
        assert_eq!(rx.recv().await, Some(TickEvent::Paused));
        assert_eq!(session.lock().unwrap().time_remaining(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn answering_last_question_stops_timer_cleanly() {
        let session = shared_session(30, 2);
        let (timer, mut rx) = PracticeTimer::start(session.clone(), TICK_PERIOD);

        assert_eq!(rx.recv().await, Some(TickEvent::Ticked { remaining: 29 }));
        for _ in 0..2 {
            session
                .lock()
                .unwrap()
                .submit_answer(AnswerValue::Choice(0))
                .unwrap();
        }
        assert_eq!(session.lock().unwrap().status(), SessionStatus::Complete);

        assert_eq!(rx.recv().await, None);
        assert!(!timer.is_running());
        let outcome = session.lock().unwrap().outcome().unwrap();
        assert_eq!((outcome.correct, outcome.total), (2, 2));
    }
}
