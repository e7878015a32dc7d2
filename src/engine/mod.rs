//! The roster generation engine.
//!
//! [`Engine`] is a long-lived instance with explicit lifecycle: hosts
//! that want singleton semantics build one at startup and pass it down.
//! A generation call runs to completion before another begins; all I/O
//! happens at the boundary, and the whole pipeline is a pure function
//! of `(snapshot, seed)`.
//!
//! Per-week draw order is fixed: candidate tie-break jitter (ascending
//! id), then main draws, then substitute draws, then the mentor-swap
//! check (which consumes no draws). Weeks are processed in strictly
//! ascending date order.

mod edits;
mod errors;
mod warnings;


pub use errors::GenerateError;
pub use warnings::Warning;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::algorithms::fairness::{
    score_candidates, AssignmentLedger, CandidateInput, ConfidenceInterval, RateTracker,
};
use crate::algorithms::selection::{
    adaptive_temperature, apply_diversity_penalty, normalized_entropy, select_k,
    SelectionStrategy,
};
use crate::config::{EngineConfig, FeatureFlags};
use crate::constraints::{
    self, ActionKind, ConstraintMonitor, FairnessMetrics, ParticipantSnapshot,
};
use crate::participant::{days_in_pool, is_experienced, Participant};
use crate::roster::{monday_of, mondays_from, Roster, WeekAssignment};
use crate::rng::Mulberry32;
use crate::Id;

/// Window (in snapshots) used for convergence trending.
const CONVERGENCE_WINDOW: usize = 5;

/// Pool size at which the no-consecutive rule also excludes the
/// previous week's substitutes.
const WIDE_EXCLUSION_THRESHOLD: usize = 10;

/// Priority multiplier standing in for a mandatory corrective action.
const MANDATORY_MULTIPLIER: f64 = 1e6;

/// One generation request.
///
/// `participants` and `existing_rosters` are read-only snapshots; the
/// engine never mutates them. `seed` falls back to the creation
/// timestamp when omitted, and `roster_id`/`created_at` are derived
/// when absent (provide all three for bit-reproducible output).
#[derive(Debug, Clone)]
pub struct GenerateOptions<'a> {
    pub start_date: String,
    pub weeks: u32,
    pub participants: &'a [Participant],
    pub existing_rosters: &'a [Roster],
    pub enforce_no_consecutive: bool,
    pub require_mentor: bool,
    pub team_size: usize,
    pub substitute_count: usize,
    pub seed: Option<u32>,
    pub roster_id: Option<Id>,
    pub created_at: Option<DateTime<Utc>>,
    pub flags: FeatureFlags,
}

impl<'a> GenerateOptions<'a> {
    pub fn new(
        start_date: impl Into<String>,
        weeks: u32,
        participants: &'a [Participant],
        existing_rosters: &'a [Roster],
    ) -> Self {
        Self {
            start_date: start_date.into(),
            weeks,
            participants,
            existing_rosters,
            enforce_no_consecutive: true,
            require_mentor: false,
            team_size: 2,
            substitute_count: 2,
            seed: None,
            roster_id: None,
            created_at: None,
            flags: FeatureFlags::default(),
        }
    }
}

/// Everything a successful generation call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub roster: Roster,
    pub warnings: Vec<Warning>,
    pub metrics: FairnessMetrics,
}

/// The fairness and selection engine.
///
/// Owns the rate tracker, the constraint monitor's variance history,
/// and a progress counter; everything else is rebuilt per call from
/// the input snapshot. Instances are independent of each other.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    tracker: RateTracker,
    monitor: ConstraintMonitor,
    weeks_completed: AtomicU32,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let tracker = RateTracker::new(&config);
        let monitor = ConstraintMonitor::new(&config);
        Self {
            config,
            tracker,
            monitor,
            weeks_completed: AtomicU32::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of weeks committed by the in-flight (or last) generation
    /// call. Hosts may poll this from another thread for progress.
    pub fn weeks_completed(&self) -> u32 {
        self.weeks_completed.load(Ordering::Relaxed)
    }

    /// Confidence interval of a tracked participant's selection rate.
    pub fn confidence_interval(&self, id: &str, level: f64) -> Option<ConfidenceInterval> {
        self.tracker.confidence_interval(id, level)
    }

    /// Generates a roster for the requested span of weeks.
    pub fn generate(
        &mut self,
        options: &GenerateOptions<'_>,
    ) -> Result<GenerationOutcome, GenerateError> {
        // Preflight.
        let requested_start = NaiveDate::parse_from_str(&options.start_date, "%Y-%m-%d")
            .map_err(|_| GenerateError::InvalidStartDate(options.start_date.clone()))?;
        if options.weeks < 1 || options.weeks > self.config.max_weeks {
            return Err(GenerateError::WeeksOutOfRange {
                requested: options.weeks,
                max: self.config.max_weeks,
            });
        }
        let start = monday_of(requested_start);

        let covered: HashSet<NaiveDate> = options
            .existing_rosters
            .iter()
            .flat_map(|r| r.covered_weeks())
            .collect();

        let mut warnings = Vec::new();
        let mut open_weeks = Vec::new();
        for week in mondays_from(start, options.weeks) {
            if covered.contains(&week) {
                warn!(%week, "week already covered, skipping");
                warnings.push(Warning::WeekAlreadyCovered(week));
            } else {
                open_weeks.push(week);
            }
        }
        if open_weeks.is_empty() {
            return Err(GenerateError::AllWeeksCovered);
        }

        if !options.participants.iter().any(|p| p.is_active(start)) {
            return Err(GenerateError::NoActiveParticipants(start));
        }

        let created_at = options.created_at.unwrap_or_else(Utc::now);
        let seed = options
            .seed
            .unwrap_or(created_at.timestamp().unsigned_abs() as u32);
        let mut rng = Mulberry32::new(seed);
        let mut ledger =
            AssignmentLedger::initialize(options.participants, options.existing_rosters);
        self.weeks_completed.store(0, Ordering::Relaxed);

        if options.flags.use_bayesian_updates {
            self.seed_tracker(options, &ledger, start);
        }

        // Week lookup across existing and in-flight assignments, for
        // the no-consecutive rule.
        let mut week_index: HashMap<NaiveDate, (Vec<Id>, Vec<Id>)> = options
            .existing_rosters
            .iter()
            .flat_map(|r| &r.assignments)
            .map(|a| (a.week_start, (a.main.clone(), a.substitutes.clone())))
            .collect();

        let mut assignments: Vec<WeekAssignment> = Vec::with_capacity(open_weeks.len());
        let mut recent_sets: VecDeque<Vec<Id>> = VecDeque::new();
        let mut active_actions: HashMap<Id, (f64, u32)> = HashMap::new();
        let mut last_entropy = 1.0;
        let mut non_finite_events = 0usize;

        for &week in &open_weeks {
            let eligible: Vec<&Participant> = options
                .participants
                .iter()
                .filter(|p| p.is_active(week))
                .collect();
            if eligible.is_empty() {
                warn!(%week, "no eligible participants, skipping week");
                warnings.push(Warning::NoEligibleParticipants(week));
                continue;
            }
            for p in &eligible {
                ledger.mark_eligible(&p.id, week);
            }

            // No-repeat exclusion against the previous calendar week.
            let mut excluded: HashSet<&str> = HashSet::new();
            if options.enforce_no_consecutive {
                if let Some((prev_main, prev_subs)) = week_index.get(&(week - Duration::weeks(1)))
                {
                    for id in prev_main {
                        excluded.insert(id.as_str());
                    }
                    if eligible.len() >= WIDE_EXCLUSION_THRESHOLD {
                        for id in prev_subs {
                            excluded.insert(id.as_str());
                        }
                    }
                }
            }

            let experienced: HashSet<&str> = eligible
                .iter()
                .filter(|p| {
                    is_experienced(p, week, ledger.total_count(&p.id), &self.config)
                })
                .map(|p| p.id.as_str())
                .collect();

            let mut candidates: Vec<&Participant> = eligible
                .iter()
                .copied()
                .filter(|p| !excluded.contains(p.id.as_str()))
                .collect();
            let mut relaxed = false;
            if candidates.len() < options.team_size {
                warnings.push(Warning::InsufficientCandidates {
                    week,
                    available: candidates.len(),
                });
                if candidates.len() < eligible.len() {
                    candidates = eligible.clone();
                    relaxed = true;
                }
            }
            // The mentor rule outranks the no-consecutive rule: when
            // exclusion removed every experienced member, re-admit just
            // those so the swap step has someone to reach for.
            if options.require_mentor
                && !experienced.is_empty()
                && !candidates.iter().any(|p| experienced.contains(p.id.as_str()))
            {
                candidates.extend(
                    eligible
                        .iter()
                        .copied()
                        .filter(|p| experienced.contains(p.id.as_str())),
                );
                relaxed = true;
            }

            let inputs: Vec<CandidateInput> = candidates
                .iter()
                .map(|p| CandidateInput {
                    id: p.id.clone(),
                    days_in_pool: days_in_pool(p, ledger.first_eligible(&p.id), week),
                    total_count: ledger.total_count(&p.id),
                })
                .collect();
            let mut scored = score_candidates(
                &inputs,
                &self.config,
                options.flags.use_penalized_priority,
                &mut rng,
            );
            if relaxed {
                // Re-admitted members lose exact ties so rotation holds.
                for c in &mut scored {
                    if excluded.contains(c.id.as_str()) {
                        c.sort_key -= 2.0 * self.config.tie_epsilon;
                    }
                }
            }
            if options.flags.use_constraint_checking {
                for c in &mut scored {
                    if let Some(&(multiplier, _)) = active_actions.get(&c.id) {
                        c.priority *= multiplier;
                        c.sort_key *= multiplier;
                    }
                }
            }

            let ids: Vec<Id> = scored.iter().map(|c| c.id.clone()).collect();
            let mut scores: Vec<f64> = scored.iter().map(|c| c.sort_key).collect();
            let rates: Vec<f64> = scored.iter().map(|c| c.rate).collect();

            let strategy = if options.flags.use_softmax_selection {
                let temperature = adaptive_temperature(
                    constraints::variance(&rates),
                    self.monitor.convergence_rate(CONVERGENCE_WINDOW),
                    last_entropy,
                    &self.config,
                );
                apply_diversity_penalty(&mut scores, &ids, &recent_sets, &self.config);
                SelectionStrategy::Softmax { temperature }
            } else {
                SelectionStrategy::Greedy
            };

            let main_selection = select_k(&scores, options.team_size, strategy, &mut rng);
            let mut main_indices = main_selection.picks.clone();
            if main_selection.degraded {
                non_finite_events += 1;
            }

            let remaining: Vec<usize> = (0..scored.len())
                .filter(|i| !main_indices.contains(i))
                .collect();
            let sub_scores: Vec<f64> = remaining.iter().map(|&i| scores[i]).collect();
            let sub_selection =
                select_k(&sub_scores, options.substitute_count, strategy, &mut rng);
            if sub_selection.degraded {
                non_finite_events += 1;
            }
            let mut substitute_indices: Vec<usize> =
                sub_selection.picks.iter().map(|&j| remaining[j]).collect();

            // Mentor coverage (soft): swap the best experienced outsider
            // for the weakest main member when the team has no mentor.
            if options.require_mentor
                && !main_indices
                    .iter()
                    .any(|&i| experienced.contains(scored[i].id.as_str()))
            {
                let incoming = (0..scored.len())
                    .filter(|i| {
                        !main_indices.contains(i) && experienced.contains(scored[*i].id.as_str())
                    })
                    .max_by(|&a, &b| f64::total_cmp(&scores[a], &scores[b]));
                match incoming {
                    Some(incoming) => {
                        let out_pos = main_indices
                            .iter()
                            .enumerate()
                            .min_by(|(_, &a), (_, &b)| f64::total_cmp(&scores[a], &scores[b]))
                            .map(|(pos, _)| pos);
                        if let Some(pos) = out_pos {
                            let outgoing = main_indices[pos];
                            main_indices[pos] = incoming;
                            if let Some(sub_pos) =
                                substitute_indices.iter().position(|&s| s == incoming)
                            {
                                substitute_indices[sub_pos] = outgoing;
                            }
                        }
                    }
                    None => {
                        warn!(%week, "no mentor available");
                        warnings.push(Warning::NoMentorAvailable(week));
                    }
                }
            }

            // Commit.
            let main_ids: Vec<Id> = main_indices.iter().map(|&i| scored[i].id.clone()).collect();
            let substitute_ids: Vec<Id> = substitute_indices
                .iter()
                .map(|&i| scored[i].id.clone())
                .collect();
            let priority_scores: Vec<f64> =
                main_indices.iter().map(|&i| scored[i].priority).collect();
            let has_mentor = main_ids.iter().any(|id| experienced.contains(id.as_str()));

            ledger.record_assignment(&main_ids);
            if options.flags.use_bayesian_updates {
                let ideal = constraints::mean(&rates);
                for p in &eligible {
                    let assigned = main_ids.iter().any(|id| id == &p.id);
                    let seeded = self.tracker.update(&p.id, assigned, 7, ideal, week);
                    if !seeded {
                        warnings.push(Warning::UnseededParticipant {
                            id: p.id.clone(),
                            week,
                        });
                    }
                }
            }
            // Age the actions applied this week before admitting new ones,
            // so a fresh action lives its full advertised duration.
            active_actions.retain(|_, entry| {
                if entry.1 <= 1 {
                    false
                } else {
                    entry.1 -= 1;
                    true
                }
            });
            if options.flags.use_constraint_checking {
                let snapshots: Vec<ParticipantSnapshot> = scored
                    .iter()
                    .map(|c| ParticipantSnapshot {
                        id: c.id.clone(),
                        rate: c.rate,
                        deficit: c.deficit,
                        days_in_pool: c.days_in_pool,
                    })
                    .collect();
                let (_, actions) = self.monitor.check(&snapshots, week);
                for action in actions {
                    let multiplier = match action.kind {
                        ActionKind::Boost => 1.0 + action.magnitude,
                        ActionKind::Penalty => 1.0 / (1.0 + action.magnitude),
                        ActionKind::Mandatory => MANDATORY_MULTIPLIER,
                    };
                    active_actions.insert(action.target, (multiplier, action.duration_weeks));
                }
            }

            debug!(%week, main = ?main_ids, substitutes = ?substitute_ids, "week committed");
            last_entropy = normalized_entropy(&main_selection.probabilities);
            week_index.insert(week, (main_ids.clone(), substitute_ids.clone()));
            recent_sets.push_front(main_ids.clone());
            recent_sets.truncate(self.config.diversity_window);
            assignments.push(WeekAssignment::new(
                week,
                main_ids,
                substitute_ids,
                priority_scores,
                has_mentor,
            ));
            self.weeks_completed.fetch_add(1, Ordering::Relaxed);
        }

        // Postflight: evaluate the pool at the last committed week.
        let eval_date = assignments.last().map(|a| a.week_start).unwrap_or(start);
        let snapshots = snapshot_pool(options.participants, &ledger, eval_date);
        let (violations, corrective_actions) = if options.flags.use_constraint_checking {
            self.monitor.check(&snapshots, eval_date)
        } else {
            (Vec::new(), Vec::new())
        };
        if !violations.is_empty() {
            warnings.push(Warning::ConstraintViolations {
                count: violations.len(),
            });
        }
        if non_finite_events > 0 {
            warnings.push(Warning::NonFiniteValues {
                count: non_finite_events,
            });
        }

        let metrics = pool_metrics(
            &snapshots,
            last_entropy,
            self.monitor.convergence_rate(CONVERGENCE_WINDOW),
            violations,
            corrective_actions,
        );

        let first_week = assignments.first().map(|a| a.week_start).unwrap_or(start);
        let roster_id = options
            .roster_id
            .clone()
            .unwrap_or_else(|| format!("roster-{first_week}-{seed:08x}"));
        let roster = Roster {
            id: roster_id,
            start_date: first_week,
            weeks: assignments.len() as u32,
            created_at,
            assignments,
        };
        info!(
            roster = %roster.id,
            weeks = roster.weeks,
            warnings = warnings.len(),
            gini = metrics.gini,
            "roster generated"
        );
        Ok(GenerationOutcome {
            roster,
            warnings,
            metrics,
        })
    }

    /// Computes the fairness picture of `(participants, rosters)` at
    /// `eval_date` without touching engine state.
    pub fn fairness_report(
        &self,
        participants: &[Participant],
        rosters: &[Roster],
        eval_date: NaiveDate,
    ) -> FairnessMetrics {
        let ledger = AssignmentLedger::initialize(participants, rosters);
        let snapshots = snapshot_pool(participants, &ledger, eval_date);
        let mut local_monitor = ConstraintMonitor::new(&self.config);
        let (violations, corrective_actions) = local_monitor.check(&snapshots, eval_date);

        let deficits: Vec<f64> = snapshots.iter().map(|s| s.deficit).collect();
        let (probabilities, _) = crate::algorithms::selection::softmax(&deficits, 1.0);
        pool_metrics(
            &snapshots,
            normalized_entropy(&probabilities),
            self.monitor.convergence_rate(CONVERGENCE_WINDOW),
            violations,
            corrective_actions,
        )
    }

    /// Seeds the rate tracker for every active participant the tracker
    /// has not seen yet: at their empirical rate when they have pool
    /// history, otherwise at the pool average (equilibrium) when
    /// rosters already exist, otherwise at zero.
    fn seed_tracker(
        &mut self,
        options: &GenerateOptions<'_>,
        ledger: &AssignmentLedger,
        start: NaiveDate,
    ) {
        let empirical: Vec<(Id, f64)> = options
            .participants
            .iter()
            .filter(|p| p.is_active(start))
            .filter_map(|p| {
                let days = days_in_pool(p, ledger.first_eligible(&p.id), start);
                if days > 0 {
                    Some((
                        p.id.clone(),
                        ledger.total_count(&p.id) as f64 / (days as f64 / 7.0),
                    ))
                } else {
                    None
                }
            })
            .collect();
        let pool_rate = if empirical.is_empty() {
            0.0
        } else {
            empirical.iter().map(|(_, r)| r).sum::<f64>() / empirical.len() as f64
        };
        let known: HashMap<&str, f64> = empirical
            .iter()
            .map(|(id, rate)| (id.as_str(), *rate))
            .collect();

        for p in options.participants.iter().filter(|p| p.is_active(start)) {
            if self.tracker.contains(&p.id) {
                continue;
            }
            match known.get(p.id.as_str()) {
                Some(&rate) => self.tracker.initialize(p.id.clone(), rate, start),
                None if !options.existing_rosters.is_empty() => {
                    self.tracker.initialize_joiner(p.id.clone(), pool_rate, start)
                }
                None => self.tracker.initialize(p.id.clone(), 0.0, start),
            }
        }
    }
}

/// Rates and deficits of every participant active on `date`.
fn snapshot_pool(
    participants: &[Participant],
    ledger: &AssignmentLedger,
    date: NaiveDate,
) -> Vec<ParticipantSnapshot> {
    let mut snapshots: Vec<ParticipantSnapshot> = participants
        .iter()
        .filter(|p| p.is_active(date))
        .map(|p| {
            let days = days_in_pool(p, ledger.first_eligible(&p.id), date);
            let weeks = days as f64 / 7.0;
            let rate = if weeks > 0.0 {
                ledger.total_count(&p.id) as f64 / weeks
            } else {
                0.0
            };
            ParticipantSnapshot {
                id: p.id.clone(),
                rate,
                deficit: 0.0,
                days_in_pool: days,
            }
        })
        .collect();
    snapshots.sort_by(|a, b| a.id.cmp(&b.id));
    let rates: Vec<f64> = snapshots.iter().map(|s| s.rate).collect();
    let avg = constraints::mean(&rates);
    for s in &mut snapshots {
        s.deficit = avg - s.rate;
    }
    snapshots
}

/// Folds a pool snapshot into the aggregate metrics record.
fn pool_metrics(
    snapshots: &[ParticipantSnapshot],
    normalized_entropy: f64,
    convergence_rate: f64,
    violations: Vec<constraints::Violation>,
    corrective_actions: Vec<constraints::CorrectiveAction>,
) -> FairnessMetrics {
    let rates: Vec<f64> = snapshots.iter().map(|s| s.rate).collect();
    let deficits: Vec<f64> = snapshots.iter().map(|s| s.deficit).collect();
    let variance = constraints::variance(&rates);
    let max_deficit = deficits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_deficit = deficits.iter().cloned().fold(f64::INFINITY, f64::min);
    FairnessMetrics {
        mean: constraints::mean(&rates),
        variance,
        std_dev: variance.sqrt(),
        cv: constraints::coefficient_of_variation(&rates),
        gini: constraints::gini(&rates),
        theil: constraints::theil(&rates),
        max_deficit: if max_deficit.is_finite() { max_deficit } else { 0.0 },
        min_deficit: if min_deficit.is_finite() { min_deficit } else { 0.0 },
        normalized_entropy,
        convergence_rate,
        violations,
        corrective_actions,
    }
}
