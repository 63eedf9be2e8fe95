//! Interactive terminal front end for lessons, quizzes and the overview.

use std::io::Write;

use fsl_core::model::{TopicId, UserId};
use services::{
    AppServices, IdentityPublisher, LessonService, PendingSync, ProgressSource, QuizSession,
    ReconcileOutcome, RemoteSnapshot, TopicProgress, identity_channel,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Input = Lines<BufReader<Stdin>>;

fn stdin_lines() -> Input {
    BufReader::new(tokio::io::stdin()).lines()
}

fn prompt(label: &str) {
    print!("{label}> ");
    let _ = std::io::stdout().flush();
}

// ─── Topics ────────────────────────────────────────────────────────────────────

pub fn topics(services: &AppServices) {
    for topic in services.topics() {
        println!("{:<10} {:<14} {} items", topic.id().as_str(), topic.title(), topic.item_count());
    }
}

// ─── Lesson ────────────────────────────────────────────────────────────────────

fn render_lesson(lesson: &LessonService) {
    let item = lesson.current_item();
    let progress = lesson.progress();
    let mark = if lesson.learned().contains(item.key()) { "*" } else { " " };
    println!(
        "[{}/{}]{mark} {} - {} ({})",
        lesson.current_index() + 1,
        lesson.topic().item_count(),
        item.key(),
        item.description(),
        item.media()
    );
    println!(
        "learned {}/{} ({}%)",
        progress.learned, progress.total, progress.percentage
    );
}

fn print_lesson_help() {
    println!("commands: n(ext) p(rev) g <n> login <uid> logout q(uit)");
}

/// Waits on the in-flight fetch, or forever when there is none.
async fn settle(pending: &mut Option<JoinHandle<RemoteSnapshot>>) -> RemoteSnapshot {
    match pending.as_mut() {
        Some(handle) => match handle.await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "reconcile task failed");
                RemoteSnapshot::Unavailable
            }
        },
        None => std::future::pending().await,
    }
}

fn start_reconcile(lesson: &LessonService) -> Option<JoinHandle<RemoteSnapshot>> {
    let task = lesson.reconcile_task()?;
    debug!(topic = %lesson.topic().id(), "starting background reconcile");
    Some(tokio::spawn(task.run()))
}

fn handle_lesson_command(
    line: &str,
    lesson: &mut LessonService,
    identity: &IdentityPublisher,
    pushes: &mut Vec<PendingSync>,
) -> bool {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some("n" | "next"), _) => pushes.extend(lesson.next()),
        (Some("p" | "prev"), _) => {
            if !lesson.previous() {
                println!("already at the first item");
            }
        }
        (Some("g" | "go"), Some(raw)) => {
            let moved = raw
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .is_some_and(|index| lesson.go_to(index));
            if !moved {
                println!("no item {raw}");
            }
        }
        (Some("login"), Some(raw)) => match raw.parse::<UserId>() {
            Ok(user) => identity.publish(Some(user)),
            Err(err) => println!("{err}"),
        },
        (Some("logout"), _) => identity.publish(None),
        (Some("q" | "quit"), _) => return false,
        (None, _) => {}
        _ => print_lesson_help(),
    }
    true
}

/// Run one lesson page until the user quits or stdin closes.
///
/// # Errors
///
/// Returns an error if the topic is unknown or stdin fails.
pub async fn lesson(
    services: &AppServices,
    topic: &TopicId,
    user: Option<UserId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (publisher, mut identity) = identity_channel(user);
    let mut lesson = services.open_lesson(topic)?.with_user(identity.current());
    println!("{}", lesson.topic().title());
    render_lesson(&lesson);
    print_lesson_help();

    let mut pending = start_reconcile(&lesson);
    let mut pushes = Vec::new();
    let mut input = stdin_lines();

    loop {
        prompt(topic.as_str());
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else { break };
                if !handle_lesson_command(line.trim(), &mut lesson, &publisher, &mut pushes) {
                    break;
                }
                render_lesson(&lesson);
            }
            Some(user) = identity.changed() => {
                info!(signed_in = user.is_some(), "identity changed");
                lesson.set_user(user);
                pending = start_reconcile(&lesson);
            }
            snapshot = settle(&mut pending) => {
                pending = None;
                match lesson.apply_reconciliation(snapshot) {
                    ReconcileOutcome::Applied { relocated: Some(moved), .. } => {
                        println!();
                        println!("resumed where you left off on another device (item {})", moved.to + 1);
                        render_lesson(&lesson);
                    }
                    ReconcileOutcome::Applied { .. } | ReconcileOutcome::Bootstrapped => {
                        println!();
                        render_lesson(&lesson);
                    }
                    ReconcileOutcome::Unavailable | ReconcileOutcome::LocalOnly => {}
                }
            }
        }
    }

    for push in pushes {
        // Failures were already logged by the push task.
        let _ = push.wait().await;
    }
    Ok(())
}

// ─── Quiz ──────────────────────────────────────────────────────────────────────

/// Ask `questions` multiple-choice questions and record the attempt.
///
/// # Errors
///
/// Returns an error if the topic is unknown or stdin fails.
pub async fn quiz(
    services: &AppServices,
    topic: &TopicId,
    questions: usize,
    user: Option<UserId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let descriptor = services.topic(topic)?;
    let clock = services.clock();
    let mut session = QuizSession::generate(&descriptor, questions, &mut rand::rng(), clock.now())?;
    let mut input = stdin_lines();

    println!("{} quiz: {} questions", descriptor.title(), session.total());
    while let Some(question) = session.current_question().cloned() {
        println!();
        println!(
            "{}/{}: which sign is shown in {}?",
            session.answered() + 1,
            session.total(),
            question.prompt().media()
        );
        for (n, choice) in question.choices().iter().enumerate() {
            println!("  {}) {choice}", n + 1);
        }

        let choice = loop {
            prompt("answer");
            let Some(line) = input.next_line().await? else {
                println!();
                println!("quiz abandoned");
                return Ok(());
            };
            match line.trim().parse::<usize>() {
                Ok(n) if (1..=question.choices().len()).contains(&n) => {
                    break question.choices()[n - 1].clone();
                }
                _ => println!("pick 1-{}", question.choices().len()),
            }
        };

        let feedback = session.answer(&choice, clock.now())?;
        if feedback.correct {
            println!("correct");
        } else {
            println!("wrong, it was {}", feedback.expected);
        }
    }

    let outcome = session.outcome()?;
    println!();
    println!(
        "score {}/{} ({}%) in {}s",
        outcome.score,
        outcome.total,
        outcome.percentage(),
        outcome.duration_secs()
    );
    if let Some(record) = services.quiz_recorder().record_session(user.as_ref(), &session).await {
        println!(
            "attempt {} saved, best {}%",
            record.attempts, record.best_percentage
        );
    }
    Ok(())
}

// ─── Overview ──────────────────────────────────────────────────────────────────

fn render_overview(rows: &[TopicProgress]) {
    for row in rows {
        let source = match row.source {
            ProgressSource::TopicCache => "cached",
            ProgressSource::CombinedCache => "cached overview",
            ProgressSource::Remote => "synced",
            ProgressSource::Empty => "not started",
        };
        println!(
            "{:<14} {:>3}/{:<3} {:>3}%  {source}",
            row.title, row.learned, row.total, row.percentage
        );
    }
}

/// Print cached progress immediately, then the synced numbers when signed in.
pub async fn overview(services: &AppServices, user: Option<UserId>) {
    let overview = services.overview();
    let topics = services.topics();
    render_overview(&overview.cached(topics));

    let (_publisher, mut identity) = identity_channel(user);
    if identity.current().is_none() {
        info!("not signed in, showing cached progress only");
        return;
    }
    if let Some(user) = identity.wait_for_user().await {
        println!();
        render_overview(&overview.refresh(&user, topics).await);
    }
}
