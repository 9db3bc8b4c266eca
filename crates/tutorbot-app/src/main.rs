//! TutorBot - a terminal study coach
//!
//! Turns study material into summaries, flashcards, quizzes and study plans,
//! tutors over chat, and runs timed practice sessions, including licensing
//! exam practice for a registered exam and state.

mod logging;
mod practice;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tutorbot_adapters::{config, keyring, Config, LocalStore};
use tutorbot_core::catalog::{self, ExamType, PROFESSIONAL_EXAMS};
use tutorbot_core::exam::{validate_registration, ExamOutcome, ExamRegistration, PaymentStatus};
use tutorbot_core::model::{AnswerValue, ChatMessage, ChatRole, Difficulty, Question};
use tutorbot_core::normalize::Normalized;
use tutorbot_core::practice::Strategy;
use tutorbot_core::session::StudySession;
use tutorbot_core::text::{check_material_file, sanitize_input};
use tutorbot_engine::llm::prompts::DEFAULT_EXAM_QUESTION_COUNT;
use tutorbot_engine::llm::HttpGateway;
use tutorbot_engine::{ExamQuestionRequest, GenerationError, GenerationService, Tracked};

const LOCAL_USER_ID: &str = "local";
const DEFAULT_PLAN_DAYS: usize = 7;

#[derive(Parser, Debug)]
#[command(
    name = "tutorbot",
    about = "Terminal study coach",
    long_about = "T U T O R B O T\n\n\
                  Generates summaries, flashcards, quizzes and study plans from\n\
                  your notes, and runs timed practice sessions.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store the Groq API key
    Setup,
    /// Verify the API key with a minimal request
    Check,
    /// Start a study session from a text or markdown file
    New {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// Summarize the current session's material
    Summarize,
    /// Generate flashcards for the current session
    Flashcards,
    /// Generate a quiz for the current session
    Quiz,
    /// Generate a day-by-day study plan
    Plan {
        #[arg(long, default_value_t = DEFAULT_PLAN_DAYS)]
        days: usize,
    },
    /// Mark a study-plan day done (or not done)
    ToggleDay { day: u32 },
    /// Ask the tutor; with no message, starts an interactive chat
    Chat { message: Vec<String> },
    /// List licensing exams, jurisdictions and your registrations
    Exams {
        /// Only exams in this category (medical, nursing, legal, ...)
        #[arg(long)]
        category: Option<String>,
    },
    /// Register for a licensing exam
    Register {
        #[arg(long)]
        exam: String,
        #[arg(long)]
        state: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_payment)]
        payment: Option<PaymentStatus>,
        #[arg(long)]
        reference: Option<String>,
    },
    /// Report the outcome of your latest registered exam
    #[command(name = "result")]
    ReportResult {
        #[arg(long, value_enum)]
        outcome: OutcomeArg,
        /// File of remembered questions to share, one per line
        #[arg(long)]
        share: Option<PathBuf>,
    },
    /// Run a timed practice session
    Practice {
        #[arg(long, value_parser = parse_strategy)]
        strategy: Strategy,
        #[arg(long, value_enum)]
        source: Option<Source>,
        #[arg(long, value_parser = parse_difficulty)]
        difficulty: Option<Difficulty>,
        #[arg(long)]
        count: Option<usize>,
    },
    /// Show recently recorded errors
    Errors,
    /// Delete all local sessions, registrations and logs
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

impl Command {
    fn label(&self) -> &'static str {
        match self {
            Command::Setup => "setup",
            Command::Check => "check",
            Command::New { .. } => "new",
            Command::Summarize => "summarize",
            Command::Flashcards => "flashcards",
            Command::Quiz => "quiz",
            Command::Plan { .. } => "plan",
            Command::ToggleDay { .. } => "toggle-day",
            Command::Chat { .. } => "chat",
            Command::Exams { .. } => "exams",
            Command::Register { .. } => "register",
            Command::ReportResult { .. } => "result",
            Command::Practice { .. } => "practice",
            Command::Errors => "errors",
            Command::Reset { .. } => "reset",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Quiz,
    Flashcards,
    Exam,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutcomeArg {
    Pass,
    Fail,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a YYYY-MM-DD date", value))
}

fn parse_payment(value: &str) -> Result<PaymentStatus, String> {
    PaymentStatus::parse(value).ok_or_else(|| "expected pending, completed or failed".to_string())
}

fn parse_strategy(value: &str) -> Result<Strategy, String> {
    Strategy::parse(value)
        .ok_or_else(|| "expected flashcards, multiple-choice or typed-answer".to_string())
}

fn parse_difficulty(value: &str) -> Result<Difficulty, String> {
    Difficulty::parse(value).ok_or_else(|| "expected easy, medium or hard".to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load();

    let data_dir = match config.data_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("  ! {:#}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = logging::init(&data_dir) {
        eprintln!("  ! File logging disabled: {:#}", err);
    }
    let store = LocalStore::new(data_dir);

    let label = cli.command.label();
    match run(cli.command, &config, &store).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = format!("{:#}", err);
            if let Err(log_err) = store.log_error(&message, label) {
                log::debug!("couldn't record error: {:#}", log_err);
            }
            eprintln!();
            eprintln!("  ! {}", message);
            eprintln!("  You can try again, or run `tutorbot reset` to clear local data.");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &Config, store: &LocalStore) -> Result<()> {
    match command {
        Command::Setup => setup_api_key(),
        Command::Check => check(config).await,
        Command::New { file, title } => new_session(store, file, title),
        Command::Summarize => summarize(config, store).await,
        Command::Flashcards => flashcards(config, store).await,
        Command::Quiz => quiz(config, store).await,
        Command::Plan { days } => plan(config, store, days).await,
        Command::ToggleDay { day } => toggle_day(store, day),
        Command::Chat { message } => chat(config, store, message.join(" ")).await,
        Command::Exams { category } => list_exams(store, category.as_deref()),
        Command::Register {
            exam,
            state,
            date,
            payment,
            reference,
        } => register(store, &exam, &state, date, payment, reference),
        Command::ReportResult { outcome, share } => report_result(store, outcome, share),
        Command::Practice {
            strategy,
            source,
            difficulty,
            count,
        } => run_practice(config, store, strategy, source, difficulty, count).await,
        Command::Errors => show_errors(store),
        Command::Reset { yes } => reset(store, yes),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CREDENTIALS
// ═══════════════════════════════════════════════════════════════════════════════

fn setup_api_key() -> Result<()> {
    config::setup_api_key_interactive()?;

    if Config::load().get_api_key().is_none() {
        eprintln!();
        eprintln!("  ! Warning: API key was saved but cannot be read back.");
        eprintln!(
            "  ! This may be due to {} access issues.",
            keyring::credentials_store_label()
        );
        eprintln!();
        eprintln!("  Workaround: Set the TUTORBOT_API_KEY environment variable:");
        eprintln!("    export TUTORBOT_API_KEY=\"your-key-here\"");
        eprintln!();
        bail!("API key verification failed");
    }
    println!("  + API key verified and ready to use!");
    Ok(())
}

fn build_service(config: &Config) -> Result<GenerationService> {
    let gateway = HttpGateway::new(config.model_settings(), config.get_api_key())?;
    Ok(GenerationService::new(Arc::new(gateway)))
}

/// The startup gate: no generation without a working credential.
async fn ready_service(config: &Config) -> Result<GenerationService> {
    if !config.has_api_key() {
        bail!(
            "No API key configured. Run `tutorbot setup` or set TUTORBOT_API_KEY"
        );
    }
    let service = build_service(config)?;
    if !service.check_credential().await {
        bail!(
            "The API key was rejected or the service could not be reached. \
             Check your connection, or run `tutorbot setup` to replace the key"
        );
    }
    Ok(service)
}

async fn check(config: &Config) -> Result<()> {
    ready_service(config).await?;
    println!("  + API key works ({})", config.model);
    Ok(())
}

fn explain(err: GenerationError) -> anyhow::Error {
    if err.is_auth_failure() {
        anyhow!("{}. Run `tutorbot setup` to configure a valid API key", err)
    } else {
        anyhow::Error::new(err)
    }
}

fn accept<T>(service: &GenerationService, tracked: Tracked<T>) -> Result<T> {
    service
        .tracker()
        .accept(tracked)
        .ok_or_else(|| anyhow!("A newer request replaced this one"))
}

fn track(store: &LocalStore, action: &str, data: serde_json::Value) {
    if let Err(err) = store.track(action, data) {
        log::warn!("couldn't record {} event: {:#}", action, err);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STUDY SESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn current_session(store: &LocalStore) -> Result<StudySession> {
    store
        .latest_session()
        .ok_or_else(|| anyhow!("No study session yet. Start one with `tutorbot new <file>`"))
}

fn save(store: &LocalStore, session: &mut StudySession) -> Result<()> {
    session.touch();
    store.save_session(session)
}

fn new_session(store: &LocalStore, file: PathBuf, title: Option<String>) -> Result<()> {
    let metadata = std::fs::metadata(&file)
        .with_context(|| format!("Couldn't open '{}'", file.display()))?;
    check_material_file(&file, metadata.len())?;
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Couldn't read '{}' as UTF-8 text", file.display()))?;
    if content.trim().is_empty() {
        bail!("'{}' is empty", file.display());
    }

    let raw_title = title.unwrap_or_else(|| {
        file.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Study session")
            .to_string()
    });
    let title = match sanitize_input(&raw_title) {
        t if t.is_empty() => "Study session".to_string(),
        t => t,
    };

    let mut session = StudySession::new(title, content);
    save(store, &mut session)?;
    track(
        store,
        "session_created",
        serde_json::json!({ "chars": session.content.chars().count() }),
    );
    println!("  + Started \"{}\"", session.title);
    println!("  Next: `tutorbot summarize`, `tutorbot flashcards`, `tutorbot quiz`");
    Ok(())
}

fn print_issues<T>(normalized: &Normalized<T>) {
    if !normalized.issues.is_empty() {
        println!(
            "  ({} generated items needed repair or were dropped)",
            normalized.issues.len()
        );
    }
}

async fn summarize(config: &Config, store: &LocalStore) -> Result<()> {
    let mut session = current_session(store)?;
    let service = ready_service(config).await?;
    let tracked = service.summarize(&session.content).await.map_err(explain)?;
    let summary = accept(&service, tracked)?;

    println!();
    println!("{}", summary);
    session.set_summary(summary);
    save(store, &mut session)?;
    track(store, "summary_generated", serde_json::json!({}));
    Ok(())
}

async fn flashcards(config: &Config, store: &LocalStore) -> Result<()> {
    let mut session = current_session(store)?;
    let service = ready_service(config).await?;
    let tracked = service
        .make_flashcards(&session.content)
        .await
        .map_err(explain)?;
    let cards = accept(&service, tracked)?;

    println!();
    for (i, card) in cards.records.iter().enumerate() {
        println!("  {:>2}. [{}] {}", i + 1, card.difficulty, card.question);
        println!("      {}", card.answer);
    }
    print_issues(&cards);
    let count = cards.records.len();
    session.replace_flashcards(cards.records);
    save(store, &mut session)?;
    track(store, "flashcards_generated", serde_json::json!({ "count": count }));
    println!("  Practice them with `tutorbot practice --strategy flashcards`");
    Ok(())
}

async fn quiz(config: &Config, store: &LocalStore) -> Result<()> {
    let mut session = current_session(store)?;
    let service = ready_service(config).await?;
    let tracked = service.make_quiz(&session.content).await.map_err(explain)?;
    let questions = accept(&service, tracked)?;

    print_issues(&questions);
    let count = questions.records.len();
    session.replace_quiz(questions.records);
    save(store, &mut session)?;
    track(store, "quiz_generated", serde_json::json!({ "count": count }));
    println!("  + {} quiz questions ready.", count);
    println!("  Take the quiz with `tutorbot practice --strategy multiple-choice`");
    Ok(())
}

async fn plan(config: &Config, store: &LocalStore, days: usize) -> Result<()> {
    let mut session = current_session(store)?;
    let service = ready_service(config).await?;
    let tracked = service
        .make_plan(&session.content, days)
        .await
        .map_err(explain)?;
    let plan = accept(&service, tracked)?;

    println!();
    for day in &plan.records {
        println!(
            "  Day {} ({}) - {} min",
            day.day,
            day.date.format("%a %b %-d"),
            day.duration_minutes
        );
        println!("    Topics: {}", day.topics.join(", "));
        for activity in &day.activities {
            println!("    - {}", activity);
        }
    }
    print_issues(&plan);
    let count = plan.records.len();
    session.replace_study_plan(plan.records);
    save(store, &mut session)?;
    track(store, "plan_generated", serde_json::json!({ "days": count }));
    Ok(())
}

fn toggle_day(store: &LocalStore, day: u32) -> Result<()> {
    let mut session = current_session(store)?;
    let completed = session.toggle_plan_day(day)?;
    save(store, &mut session)?;
    println!(
        "  Day {} marked {}. {}/{} days done.",
        day,
        if completed { "done" } else { "not done" },
        session.progress.study_days_completed,
        session.study_plan.len()
    );
    Ok(())
}

async fn chat(config: &Config, store: &LocalStore, message: String) -> Result<()> {
    let mut session = current_session(store)?;
    let service = ready_service(config).await?;

    if !message.trim().is_empty() {
        return chat_turn(&service, store, &mut session, &message).await;
    }

    println!("  Chatting about \"{}\". Empty line to finish.", session.title);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  you> ");
        std::io::Write::flush(&mut std::io::stdout())?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            break;
        }
        chat_turn(&service, store, &mut session, &line).await?;
    }
    Ok(())
}

async fn chat_turn(
    service: &GenerationService,
    store: &LocalStore,
    session: &mut StudySession,
    message: &str,
) -> Result<()> {
    let message = sanitize_input(message);
    if message.is_empty() {
        return Ok(());
    }
    let tracked = service
        .chat_reply(&session.content, &session.chat_history, &message)
        .await
        .map_err(explain)?;
    let reply = accept(service, tracked)?;

    println!("  tutor> {}", reply);
    session.push_chat(ChatMessage::new(ChatRole::User, message));
    session.push_chat(ChatMessage::new(ChatRole::Bot, reply));
    save(store, session)
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXAMS
// ═══════════════════════════════════════════════════════════════════════════════

fn exams_to_list(category: Option<&str>) -> Result<Vec<&'static ExamType>> {
    let Some(category) = category else {
        return Ok(PROFESSIONAL_EXAMS.iter().collect());
    };
    let category = category.trim().to_ascii_lowercase();
    let exams: Vec<_> = catalog::exams_in_category(&category).collect();
    if exams.is_empty() {
        let mut known: Vec<_> = PROFESSIONAL_EXAMS.iter().map(|e| e.category).collect();
        known.dedup();
        bail!("Unknown exam category '{}'. Try one of: {}", category, known.join(", "));
    }
    Ok(exams)
}

fn list_exams(store: &LocalStore, category: Option<&str>) -> Result<()> {
    let exams = exams_to_list(category)?;
    println!();
    let mut category = "";
    for exam in exams {
        if exam.category != category {
            category = exam.category;
            println!("  {}", category.to_uppercase());
        }
        println!(
            "    {:<14} {} ({} questions, {} min)",
            exam.id, exam.name, exam.question_count, exam.time_limit_minutes
        );
    }
    println!();
    println!(
        "  Jurisdictions: {}",
        catalog::US_JURISDICTIONS
            .iter()
            .map(|j| j.code)
            .collect::<Vec<_>>()
            .join(" ")
    );

    let registrations = store.registrations();
    if registrations.is_empty() {
        return Ok(());
    }
    println!();
    println!("  Your registrations:");
    for reg in &registrations {
        let progress = store.exam_progress(&reg.exam_type, &reg.state);
        println!(
            "    {} {} on {} - payment {:?}{}",
            reg.exam_type,
            reg.state,
            reg.exam_date,
            reg.payment_status,
            if reg.is_active { ", active" } else { "" }
        );
        if progress.sessions_completed > 0 {
            println!(
                "      {} practice sessions, best {}%",
                progress.sessions_completed, progress.best_score
            );
        }
    }
    Ok(())
}

fn register(
    store: &LocalStore,
    exam: &str,
    state: &str,
    date: NaiveDate,
    payment: Option<PaymentStatus>,
    reference: Option<String>,
) -> Result<()> {
    let exam = exam.trim().to_ascii_lowercase();
    let problems = validate_registration(&exam, state, date, Local::now().date_naive());
    if !problems.is_empty() {
        let list: Vec<String> = problems.iter().map(|p| p.to_string()).collect();
        bail!("Registration is invalid: {}", list.join("; "));
    }

    let mut registration = ExamRegistration::new(LOCAL_USER_ID, &exam, state, date);
    if let Some(status) = payment {
        registration.apply_payment(status, reference);
    }
    store.save_registration(&registration)?;
    track(
        store,
        "exam_registered",
        serde_json::json!({ "exam": registration.exam_type, "state": registration.state }),
    );

    println!(
        "  + Registered for {} in {} on {}",
        registration.exam_type, registration.state, registration.exam_date
    );
    if !registration.is_active {
        println!("  Registration activates once payment is completed (--payment completed).");
    }
    Ok(())
}

fn latest_registration(store: &LocalStore, active_only: bool) -> Option<ExamRegistration> {
    store
        .registrations()
        .into_iter()
        .filter(|r| !active_only || r.is_active)
        .max_by_key(|r| r.updated_at)
}

fn report_result(store: &LocalStore, outcome: OutcomeArg, share: Option<PathBuf>) -> Result<()> {
    let mut registration = latest_registration(store, false)
        .ok_or_else(|| anyhow!("No exam registration yet. Use `tutorbot register`"))?;
    let shared_text = match &share {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Couldn't read '{}'", path.display()))?,
        None => String::new(),
    };
    let outcome = match outcome {
        OutcomeArg::Pass => ExamOutcome::Pass,
        OutcomeArg::Fail => ExamOutcome::Fail,
    };

    let contributed = registration
        .submit_result(outcome, share.is_some(), &shared_text)
        .contributed_questions
        .len();
    store.save_registration(&registration)?;

    println!("  + Result recorded for {}.", registration.exam_type);
    if contributed > 0 {
        println!("  Thanks for sharing {} questions.", contributed);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRACTICE
// ═══════════════════════════════════════════════════════════════════════════════

/// Filter by difficulty, then keep the first `count`.
fn select_questions(
    questions: Vec<Question>,
    difficulty: Option<Difficulty>,
    count: Option<usize>,
) -> Vec<Question> {
    questions
        .into_iter()
        .filter(|q| difficulty.is_none_or(|d| q.difficulty == d))
        .take(count.unwrap_or(usize::MAX))
        .collect()
}

fn default_source(strategy: Strategy) -> Source {
    match strategy {
        Strategy::Flashcards => Source::Flashcards,
        Strategy::MultipleChoice | Strategy::TypedAnswer => Source::Quiz,
    }
}

async fn run_practice(
    config: &Config,
    store: &LocalStore,
    strategy: Strategy,
    source: Option<Source>,
    difficulty: Option<Difficulty>,
    count: Option<usize>,
) -> Result<()> {
    let source = source.unwrap_or_else(|| default_source(strategy));
    if source == Source::Flashcards && strategy == Strategy::MultipleChoice {
        bail!("Flashcards have no options; use --strategy flashcards or typed-answer");
    }

    match source {
        Source::Exam => {
            let registration = latest_registration(store, true).ok_or_else(|| {
                anyhow!("No active exam registration. Register with --payment completed first")
            })?;
            let service = ready_service(config).await?;
            let request = ExamQuestionRequest {
                exam_type: registration.exam_type.clone(),
                state: registration.state.clone(),
                difficulty: difficulty.unwrap_or_default(),
                count: count.unwrap_or(DEFAULT_EXAM_QUESTION_COUNT),
            };
            let tracked = service
                .make_exam_questions(&request)
                .await
                .map_err(explain)?;
            let batch = accept(&service, tracked)?;
            print_issues(&batch);
            let questions = batch.records.iter().filter_map(|q| q.to_question()).collect();

            let Some(report) = practice::run(strategy, questions).await? else {
                return Ok(());
            };
            let mut progress = store.exam_progress(&request.exam_type, &request.state);
            progress.record(&report.outcome);
            store.save_exam_progress(&request.exam_type, &request.state, &progress)?;
            track(
                store,
                "exam_practice_completed",
                serde_json::json!({ "exam": request.exam_type, "score": report.outcome.score }),
            );
        }
        Source::Quiz | Source::Flashcards => {
            let mut session = current_session(store)?;
            let questions: Vec<Question> = if source == Source::Quiz {
                session.quiz.iter().map(|q| q.to_question()).collect()
            } else {
                session.flashcards.iter().map(|c| c.to_question()).collect()
            };
            let questions = select_questions(questions, difficulty, count);
            if questions.is_empty() {
                bail!(
                    "Nothing to practice. Generate some with `tutorbot {}`",
                    if source == Source::Quiz { "quiz" } else { "flashcards" }
                );
            }

            let Some(report) = practice::run(strategy, questions).await? else {
                return Ok(());
            };
            for answer in &report.answers {
                let recorded = match &answer.value {
                    AnswerValue::Choice(choice) if source == Source::Quiz => session
                        .answer_quiz_question(&answer.question_id, *choice)
                        .map(|_| ()),
                    AnswerValue::Mastery(mastered) if source == Source::Flashcards => {
                        session.review_flashcard(&answer.question_id, *mastered)
                    }
                    _ => Ok(()),
                };
                if let Err(err) = recorded {
                    log::debug!("practice answer not recorded: {}", err);
                }
            }
            save(store, &mut session)?;
            track(
                store,
                "practice_completed",
                serde_json::json!({ "strategy": strategy.as_str(), "score": report.outcome.score }),
            );
        }
    }
    Ok(())
}

fn reset(store: &LocalStore, yes: bool) -> Result<()> {
    if !yes {
        print!("  This deletes every local session, registration and log. Type 'reset' to confirm: ");
        std::io::Write::flush(&mut std::io::stdout())?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if answer.trim() != "reset" {
            println!("  Nothing deleted.");
            return Ok(());
        }
    }
    let removed = store.clear()?;
    println!("  + Cleared {} stored items from {}", removed, store.dir().display());
    Ok(())
}

/// Newest first, at most `limit` lines.
fn error_lines(store: &LocalStore, limit: usize) -> Vec<String> {
    store
        .errors()
        .iter()
        .rev()
        .take(limit)
        .map(|record| {
            format!(
                "{} [{}] {}",
                record.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                record.context,
                record.message
            )
        })
        .collect()
}

fn show_errors(store: &LocalStore) -> Result<()> {
    let lines = error_lines(store, 20);
    if lines.is_empty() {
        println!("  No errors recorded.");
        return Ok(());
    }
    println!();
    for line in lines {
        println!("  {}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tutorbot_core::model::CorrectAnswer;

    fn question(id: &str, difficulty: Difficulty) -> Question {
        Question {
            id: id.to_string(),
            prompt: "?".to_string(),
            options: Vec::new(),
            correct_answer: CorrectAnswer::Text("a".to_string()),
            explanation: String::new(),
            difficulty,
            time_allowed_secs: 60,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_practice_arguments() {
        let cli = Cli::try_parse_from([
            "tutorbot",
            "practice",
            "--strategy",
            "multiple-choice",
            "--source",
            "exam",
            "--difficulty",
            "hard",
            "--count",
            "5",
        ])
        .unwrap();
        match cli.command {
            Command::Practice {
                strategy,
                source,
                difficulty,
                count,
            } => {
                assert_eq!(strategy, Strategy::MultipleChoice);
                assert_eq!(source, Some(Source::Exam));
                assert_eq!(difficulty, Some(Difficulty::Hard));
                assert_eq!(count, Some(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["tutorbot", "practice", "--strategy", "speed-round"]).is_err());
    }

    #[test]
    fn parses_register_arguments() {
        let cli = Cli::try_parse_from([
            "tutorbot", "register", "--exam", "mpre", "--state", "ca", "--date", "2027-03-15",
            "--payment", "completed",
        ])
        .unwrap();
        match cli.command {
            Command::Register { date, payment, .. } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2027, 3, 15).unwrap());
                assert_eq!(payment, Some(PaymentStatus::Completed));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from([
            "tutorbot", "register", "--exam", "mpre", "--state", "CA", "--date", "15/03/2027",
        ])
        .is_err());
    }

    #[test]
    fn plan_defaults_to_a_week() {
        let cli = Cli::try_parse_from(["tutorbot", "plan"]).unwrap();
        assert!(matches!(cli.command, Command::Plan { days: 7 }));
    }

    #[test]
    fn select_questions_filters_then_limits() {
        let questions = vec![
            question("1", Difficulty::Easy),
            question("2", Difficulty::Hard),
            question("3", Difficulty::Hard),
            question("4", Difficulty::Hard),
        ];
        let picked = select_questions(questions.clone(), Some(Difficulty::Hard), Some(2));
        let ids: Vec<_> = picked.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["2", "3"]);
        assert_eq!(select_questions(questions, None, None).len(), 4);
    }

    #[test]
    fn new_session_checks_the_file_and_sanitizes_the_title() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("data"));

        let pdf = dir.path().join("notes.pdf");
        std::fs::write(&pdf, "%PDF").unwrap();
        assert!(new_session(&store, pdf, None).is_err());
        assert!(store.sessions().is_empty());

        let notes = dir.path().join("cells.md");
        std::fs::write(&notes, "Cells are the basic unit of life.").unwrap();
        new_session(&store, notes, Some("<b>Biology</b>".to_string())).unwrap();
        let session = current_session(&store).unwrap();
        assert_eq!(session.title, "bBiology/b");
        assert_eq!(session.content, "Cells are the basic unit of life.");
        assert_eq!(store.analytics().len(), 1);
    }

    #[test]
    fn toggle_day_without_a_plan_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        assert!(toggle_day(&store, 1).is_err());
        store.save_session(&StudySession::new("t", "c")).unwrap();
        assert!(toggle_day(&store, 1).is_err());
    }

    #[test]
    fn default_source_follows_strategy() {
        assert_eq!(default_source(Strategy::Flashcards), Source::Flashcards);
        assert_eq!(default_source(Strategy::TypedAnswer), Source::Quiz);
    }

    #[test]
    fn exams_can_be_filtered_by_category() {
        assert_eq!(exams_to_list(None).unwrap().len(), PROFESSIONAL_EXAMS.len());
        let legal = exams_to_list(Some(" Legal ")).unwrap();
        assert!(!legal.is_empty());
        assert!(legal.iter().all(|e| e.category == "legal"));
        let err = exams_to_list(Some("astrology")).unwrap_err();
        assert!(err.to_string().contains("medical"));
    }

    #[test]
    fn error_lines_are_newest_first_and_redacted() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        assert!(error_lines(&store, 5).is_empty());

        store.log_error("first failure", "quiz").unwrap();
        store
            .log_error("bad key gsk_abcdefghijklmnopqrstuvwxyz123456", "check")
            .unwrap();
        let lines = error_lines(&store, 5);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[check]"));
        assert!(!lines[0].contains("gsk_abcdefghijklmnopqrstuvwxyz123456"));
        assert!(lines[1].ends_with("[quiz] first failure"));
        assert_eq!(error_lines(&store, 1).len(), 1);
    }
}
