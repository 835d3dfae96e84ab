//! Right-censored, left-truncated event data and the non-parametric hazard
//! estimators built on top of it.

use crate::error::Error;
use crate::utils::{check_dimension, resolve_weights, safe_ln};
use log::trace;
use ndarray::prelude::*;
use ndarray::Data;
use serde_derive::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Offset separating outcomes recorded at the same time in the ranking.
pub const RANKING_EPSILON: f64 = 1e-5;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurvivalOutcome {
    /// The subject entered the risk set.
    Started,
    Failed,
    /// Observation stopped before a failure was seen.
    Censored,
}

impl SurvivalOutcome {
    pub fn sign(self) -> f64 {
        match self {
            SurvivalOutcome::Started => -1.,
            SurvivalOutcome::Failed => 1.,
            SurvivalOutcome::Censored => 0.,
        }
    }
}

impl Default for SurvivalOutcome {
    fn default() -> Self {
        SurvivalOutcome::Failed
    }
}

impl fmt::Display for SurvivalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SurvivalOutcome::Started => "started",
            SurvivalOutcome::Failed => "failed",
            SurvivalOutcome::Censored => "censored",
        };
        f.write_str(name)
    }
}

impl FromStr for SurvivalOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "started" => Ok(SurvivalOutcome::Started),
            "failed" => Ok(SurvivalOutcome::Failed),
            "censored" => Ok(SurvivalOutcome::Censored),
            _ => Err(Error::UnknownOption {
                option: "outcome",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardEstimator {
    BreslowNelsonAalen,
    KaplanMeier,
}

impl Default for HazardEstimator {
    fn default() -> Self {
        HazardEstimator::BreslowNelsonAalen
    }
}

impl fmt::Display for HazardEstimator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HazardEstimator::BreslowNelsonAalen => f.write_str("breslow-nelson-aalen"),
            HazardEstimator::KaplanMeier => f.write_str("kaplan-meier"),
        }
    }
}

impl FromStr for HazardEstimator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "breslow-nelson-aalen" | "bna" => Ok(HazardEstimator::BreslowNelsonAalen),
            "kaplan-meier" | "km" => Ok(HazardEstimator::KaplanMeier),
            _ => Err(Error::UnknownOption {
                option: "estimator",
                value: s.to_string(),
            }),
        }
    }
}

/// How failures sharing a time are handled by Breslow–Nelson–Aalen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardTiesMethod {
    /// Exact product-limit step for a lone failure. Larger tie groups use Breslow.
    Efron,
    Breslow,
}

impl Default for HazardTiesMethod {
    fn default() -> Self {
        HazardTiesMethod::Efron
    }
}

impl fmt::Display for HazardTiesMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HazardTiesMethod::Efron => f.write_str("efron"),
            HazardTiesMethod::Breslow => f.write_str("breslow"),
        }
    }
}

impl FromStr for HazardTiesMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "efron" => Ok(HazardTiesMethod::Efron),
            "breslow" => Ok(HazardTiesMethod::Breslow),
            _ => Err(Error::UnknownOption {
                option: "ties",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalRecord {
    pub time: f64,
    pub outcome: SurvivalOutcome,
    pub weight: f64,
}

impl SurvivalRecord {
    fn ranking_key(&self) -> f64 {
        self.time - RANKING_EPSILON * self.outcome.sign()
    }
}

/// Parallel `times` and `hazards`, ascending in time.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardTable {
    pub times: Array1<f64>,
    pub hazards: Array1<f64>,
}

/// Weighted survival records, held in descending ranking order.
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalSample {
    ranking: Vec<SurvivalRecord>,
}

impl SurvivalSample {
    /// Every observation is a failure unless `outcomes` says otherwise.
    pub fn new(
        times: ArrayView1<f64>,
        outcomes: Option<&[SurvivalOutcome]>,
        weights: Option<ArrayView1<f64>>,
    ) -> Result<Self, Error> {
        if let Some(outcomes) = outcomes {
            check_dimension("outcomes", times.len(), outcomes.len())?;
        }
        let weights = resolve_weights(times.len(), weights)?;
        if let Some(t) = times.iter().find(|t| !(**t >= 0.) || !t.is_finite()) {
            return Err(Error::invalid_parameter(
                "times",
                format!("{} is not a finite, non-negative time", t),
            ));
        }

        let records = times
            .iter()
            .zip(weights.iter())
            .enumerate()
            .map(|(i, (&time, &weight))| SurvivalRecord {
                time,
                outcome: outcomes.map_or(SurvivalOutcome::Failed, |o| o[i]),
                weight,
            })
            .collect();
        Ok(SurvivalSample::from_records(records))
    }

    /// Observed events are failures, the rest are censored.
    pub fn from_events<S, B>(
        events: &ArrayBase<S, Ix1>,
        event_observed: &ArrayBase<B, Ix1>,
    ) -> Result<Self, Error>
    where
        S: Data<Elem = f64>,
        B: Data<Elem = bool>,
    {
        check_dimension("event_observed", events.len(), event_observed.len())?;
        let outcomes: Vec<SurvivalOutcome> = event_observed
            .iter()
            .map(|&o| {
                if o {
                    SurvivalOutcome::Failed
                } else {
                    SurvivalOutcome::Censored
                }
            })
            .collect();
        SurvivalSample::new(events.view(), Some(&outcomes), None)
    }

    fn from_records(mut records: Vec<SurvivalRecord>) -> Self {
        // Stable, so equal keys keep their input order.
        records.sort_by(|a, b| b.ranking_key().total_cmp(&a.ranking_key()));
        SurvivalSample { ranking: records }
    }

    pub fn len(&self) -> usize {
        self.ranking.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }

    /// Records from the latest ranking key to the earliest.
    pub fn ranking(&self) -> &[SurvivalRecord] {
        &self.ranking
    }

    pub fn hazards(&self, estimator: HazardEstimator, ties: HazardTiesMethod) -> HazardTable {
        match estimator {
            HazardEstimator::BreslowNelsonAalen => self.breslow_nelson_aalen(ties),
            HazardEstimator::KaplanMeier => self.kaplan_meier(),
        }
    }

    /// Product-limit hazards, one per distinct time of a failure or censoring.
    pub fn kaplan_meier(&self) -> HazardTable {
        let mut events: Vec<&SurvivalRecord> = self
            .ranking
            .iter()
            .filter(|r| r.outcome != SurvivalOutcome::Started)
            .collect();
        events.sort_by(|a, b| a.time.total_cmp(&b.time));

        let mut at_risk: f64 = events.iter().map(|r| r.weight).sum();
        let mut times = Vec::new();
        let mut hazards = Vec::new();

        for group in events.chunk_by(|a, b| a.time == b.time) {
            let failures: f64 = group
                .iter()
                .filter(|r| r.outcome == SurvivalOutcome::Failed)
                .map(|r| r.weight)
                .sum();
            let leaving: f64 = group.iter().map(|r| r.weight).sum();

            let hazard = if at_risk > 0. { failures / at_risk } else { 0. };
            trace!("t = {}: {} failed of {} at risk", group[0].time, failures, at_risk);

            times.push(group[0].time);
            hazards.push(hazard);
            at_risk -= leaving;
        }

        HazardTable {
            times: Array1::from(times),
            hazards: Array1::from(hazards),
        }
    }

    /// Nelson–Aalen type hazards, one per observation.
    pub fn breslow_nelson_aalen(&self, ties: HazardTiesMethod) -> HazardTable {
        let n = self.ranking.len();
        let mut hazards = vec![0.; n];
        let mut at_risk = 0.;

        let mut i = 0;
        while i < n {
            let record = self.ranking[i];
            match record.outcome {
                SurvivalOutcome::Started => {
                    at_risk -= record.weight;
                    i += 1;
                }
                SurvivalOutcome::Censored => {
                    at_risk += record.weight;
                    i += 1;
                }
                SurvivalOutcome::Failed => {
                    let end = self.ranking[i..]
                        .iter()
                        .position(|r| r.outcome != SurvivalOutcome::Failed || r.time != record.time)
                        .map_or(n, |offset| i + offset);
                    let group = &self.ranking[i..end];

                    let deaths: f64 = group.iter().map(|r| r.weight).sum();
                    at_risk += deaths;

                    if deaths > 0. && at_risk > 0. {
                        let survival = match ties {
                            HazardTiesMethod::Efron if group.len() == 1 => 1. - deaths / at_risk,
                            _ => (-deaths / at_risk).exp(),
                        };
                        let group_hazard = -safe_ln(survival);
                        trace!(
                            "t = {}: {} tied failures, {} at risk, survival {}",
                            record.time,
                            group.len(),
                            at_risk,
                            survival
                        );

                        for (hazard, r) in hazards[i..end].iter_mut().zip(group) {
                            *hazard = group_hazard * r.weight / deaths;
                        }
                    }
                    i = end;
                }
            }
        }

        let times: Array1<f64> = self.ranking.iter().rev().map(|r| r.time).collect();
        hazards.reverse();
        HazardTable {
            times,
            hazards: Array1::from(hazards),
        }
    }
}

/// Ascending order of `keys`, ties resolved by the position in the input.
pub(crate) fn stable_ascending_order(keys: ArrayView1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].partial_cmp(&keys[b]).unwrap_or(Ordering::Equal));
    order
}
