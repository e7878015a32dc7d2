//! Demonstration of rate convergence across consecutive roster batches.
//!
//! Generates four 12-week batches back to back, adding a joiner between
//! batches, and prints the fairness report after each one.

use chrono::{Duration, NaiveDate};
use fairrota::participant::Participant;
use fairrota::roster::Roster;
use fairrota::{Engine, GenerateOptions};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let mut participants: Vec<Participant> = (0..6)
        .map(|i| {
            Participant::new(
                format!("member-{i}"),
                format!("Member {i}"),
                date("2025-01-01"),
            )
        })
        .collect();

    let mut engine = Engine::default();
    let mut rosters: Vec<Roster> = Vec::new();
    let mut start = date("2025-01-06");

    for batch in 1u32..=4 {
        let mut options = GenerateOptions::new(start.to_string(), 12, &participants, &rosters);
        options.seed = Some(900 + batch);

        let outcome = engine.generate(&options).expect("generation succeeds");
        println!("batch {batch}: {} weeks from {start}", outcome.roster.weeks);
        println!(
            "  gini {:.4}  cv {:.4}  entropy {:.4}",
            outcome.metrics.gini, outcome.metrics.cv, outcome.metrics.normalized_entropy
        );
        start += Duration::weeks(i64::from(outcome.roster.weeks));
        rosters.push(outcome.roster);

        if batch == 2 {
            // A joiner enters an established pool: rates must converge
            // without a catch-up burst.
            participants.push(Participant::new("joiner", "Joiner", start));
            println!("  -> joiner added starting {start}");
        }
    }

    let eval = start - Duration::days(1);
    let report = engine.fairness_report(&participants, &rosters, eval);
    println!();
    println!("final report as of {eval}:");
    println!("{report}");
    for p in &participants {
        let count: u32 = rosters.iter().map(|r| r.main_count(&p.id)).sum();
        if let Some(ci) = engine.confidence_interval(&p.id, 0.95) {
            println!(
                "  {:<10} selections: {count:>3}   rate 95% CI [{:.3}, {:.3}]",
                p.id, ci.lower, ci.upper
            );
        }
    }
}
