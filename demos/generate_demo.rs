//! Demonstration of roster generation over a small pool.

use chrono::NaiveDate;
use fairrota::participant::Participant;
use fairrota::{Engine, GenerateOptions};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // A pool with two veterans and three newer members.
    let mut participants = vec![
        Participant::new("ada", "Ada", date("2024-06-01")),
        Participant::new("grace", "Grace", date("2024-08-01")),
        Participant::new("edsger", "Edsger", date("2025-02-01")),
        Participant::new("barbara", "Barbara", date("2025-03-01")),
        Participant::new("donald", "Donald", date("2025-03-15")),
    ];
    // Barbara left for a month and came back.
    participants[3].close_period(date("2025-05-01"), Some("travel".into()));
    participants[3].reopen(date("2025-06-01"));

    let mut engine = Engine::default();
    let mut options = GenerateOptions::new("2025-07-07", 12, &participants, &[]);
    options.require_mentor = true;
    options.seed = Some(2025);

    match engine.generate(&options) {
        Ok(outcome) => {
            println!("Roster {} ({} weeks)", outcome.roster.id, outcome.roster.weeks);
            println!();
            for a in &outcome.roster.assignments {
                println!(
                    "  {}  main: {:<20}  subs: {:<20}  mentor: {}",
                    a.week_start,
                    a.main.join(", "),
                    a.substitutes.join(", "),
                    if a.has_mentor { "yes" } else { "no" },
                );
            }
            println!();
            for warning in &outcome.warnings {
                println!("  warning: {warning}");
            }
            println!();
            println!("{}", outcome.metrics);
        }
        Err(err) => eprintln!("generation failed: {err}"),
    }
}
